use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::engine::catalog::assembler::FileComponent;
use crate::engine::errors::SidecarError;
use crate::engine::ring::RingEntry;

/// Control-plane endpoint of one storage node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SidecarInstance {
    pub hostname: String,
    pub port: u16,
}

impl SidecarInstance {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }

    /// Sidecar of the node behind a ring entry.
    pub fn for_entry(entry: &RingEntry, sidecar_port: u16) -> Self {
        Self::new(entry.fqdn.clone(), sidecar_port)
    }
}

impl fmt::Display for SidecarInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

/// Keyspace, table and snapshot name addressed by snapshot operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotRef {
    pub keyspace: String,
    pub table: String,
    pub snapshot_name: String,
}

impl SnapshotRef {
    pub fn new(
        keyspace: impl Into<String>,
        table: impl Into<String>,
        snapshot_name: impl Into<String>,
    ) -> Self {
        Self {
            keyspace: keyspace.into(),
            table: table.into(),
            snapshot_name: snapshot_name.into(),
        }
    }
}

impl fmt::Display for SnapshotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}@{}", self.keyspace, self.table, self.snapshot_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaResponse {
    /// Full CQL schema of the keyspace.
    pub schema: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSettings {
    pub release_version: String,
    pub partitioner: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSkewResponse {
    pub current_time_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_name: String,
    pub size: u64,
    pub data_dir_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSnapshotFilesResponse {
    pub snapshot_files_info: Option<Vec<FileInfo>>,
}

/// One component of an encoded storage table bound for one replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub keyspace: String,
    pub table: String,
    pub upload_id: String,
    pub component: FileComponent,
    pub path: PathBuf,
    pub file_name: String,
    /// Hex CRC32 of the file contents.
    pub digest: String,
    pub size: u64,
}

/// HTTP control-plane transport. Cluster-scoped calls (`ring`, `schema`,
/// `node_settings`) pick their own contact point.
#[async_trait]
pub trait SidecarClient: Send + Sync {
    async fn ring(&self, keyspace: &str) -> Result<Vec<RingEntry>, SidecarError>;

    async fn schema(&self, keyspace: &str) -> Result<SchemaResponse, SidecarError>;

    async fn node_settings(&self) -> Result<NodeSettings, SidecarError>;

    async fn time_skew(&self, instance: &SidecarInstance) -> Result<TimeSkewResponse, SidecarError>;

    async fn create_snapshot(
        &self,
        instance: &SidecarInstance,
        snapshot: &SnapshotRef,
    ) -> Result<(), SidecarError>;

    /// `None` when the node answered without a body.
    async fn list_snapshot_files(
        &self,
        instance: &SidecarInstance,
        snapshot: &SnapshotRef,
    ) -> Result<Option<ListSnapshotFilesResponse>, SidecarError>;

    async fn clear_snapshot(
        &self,
        instance: &SidecarInstance,
        snapshot: &SnapshotRef,
    ) -> Result<(), SidecarError>;

    async fn upload_component(
        &self,
        instance: &SidecarInstance,
        request: &UploadRequest,
    ) -> Result<(), SidecarError>;

    /// Commits every uploaded component of `upload_id` into the live table.
    async fn import_table(
        &self,
        instance: &SidecarInstance,
        keyspace: &str,
        table: &str,
        upload_id: &str,
    ) -> Result<(), SidecarError>;

    async fn close(&self) -> Result<(), SidecarError>;
}

#[async_trait]
impl<T: SidecarClient + ?Sized> SidecarClient for std::sync::Arc<T> {
    async fn ring(&self, keyspace: &str) -> Result<Vec<RingEntry>, SidecarError> {
        (**self).ring(keyspace).await
    }

    async fn schema(&self, keyspace: &str) -> Result<SchemaResponse, SidecarError> {
        (**self).schema(keyspace).await
    }

    async fn node_settings(&self) -> Result<NodeSettings, SidecarError> {
        (**self).node_settings().await
    }

    async fn time_skew(&self, instance: &SidecarInstance) -> Result<TimeSkewResponse, SidecarError> {
        (**self).time_skew(instance).await
    }

    async fn create_snapshot(
        &self,
        instance: &SidecarInstance,
        snapshot: &SnapshotRef,
    ) -> Result<(), SidecarError> {
        (**self).create_snapshot(instance, snapshot).await
    }

    async fn list_snapshot_files(
        &self,
        instance: &SidecarInstance,
        snapshot: &SnapshotRef,
    ) -> Result<Option<ListSnapshotFilesResponse>, SidecarError> {
        (**self).list_snapshot_files(instance, snapshot).await
    }

    async fn clear_snapshot(
        &self,
        instance: &SidecarInstance,
        snapshot: &SnapshotRef,
    ) -> Result<(), SidecarError> {
        (**self).clear_snapshot(instance, snapshot).await
    }

    async fn upload_component(
        &self,
        instance: &SidecarInstance,
        request: &UploadRequest,
    ) -> Result<(), SidecarError> {
        (**self).upload_component(instance, request).await
    }

    async fn import_table(
        &self,
        instance: &SidecarInstance,
        keyspace: &str,
        table: &str,
        upload_id: &str,
    ) -> Result<(), SidecarError> {
        (**self).import_table(instance, keyspace, table, upload_id).await
    }

    async fn close(&self) -> Result<(), SidecarError> {
        (**self).close().await
    }
}
