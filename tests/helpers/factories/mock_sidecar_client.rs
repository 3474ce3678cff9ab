use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::engine::errors::SidecarError;
use crate::engine::ring::RingEntry;
use crate::engine::sidecar::{
    FileInfo, ListSnapshotFilesResponse, NodeSettings, SchemaResponse, SidecarClient,
    SidecarInstance, SnapshotRef, TimeSkewResponse, UploadRequest,
};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub host: String,
}

struct Failure {
    operation: &'static str,
    host: Option<String>,
    error: SidecarError,
    remaining: Option<usize>,
}

/// In-memory control plane recording every call.
pub struct MockSidecarClient {
    ring: Vec<RingEntry>,
    schema: String,
    settings: NodeSettings,
    cluster_time_millis: Option<i64>,
    host_times: HashMap<String, i64>,
    listing: Option<ListSnapshotFilesResponse>,
    host_listings: HashMap<String, Option<ListSnapshotFilesResponse>>,
    delay: Option<Duration>,
    failures: Mutex<Vec<Failure>>,
    calls: Mutex<Vec<RecordedCall>>,
    uploads: Mutex<Vec<(String, UploadRequest)>>,
    closes: AtomicUsize,
}

impl MockSidecarClient {
    pub fn new() -> Self {
        Self {
            ring: Vec::new(),
            schema: String::new(),
            settings: NodeSettings {
                release_version: "4.0.11".to_string(),
                partitioner: "org.apache.cassandra.dht.Murmur3Partitioner".to_string(),
            },
            cluster_time_millis: None,
            host_times: HashMap::new(),
            listing: Some(ListSnapshotFilesResponse {
                snapshot_files_info: Some(Vec::new()),
            }),
            host_listings: HashMap::new(),
            delay: None,
            failures: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn with_ring(mut self, ring: Vec<RingEntry>) -> Self {
        self.ring = ring;
        self
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = schema.to_string();
        self
    }

    pub fn with_release_version(mut self, version: &str) -> Self {
        self.settings.release_version = version.to_string();
        self
    }

    pub fn with_cluster_time(mut self, millis: i64) -> Self {
        self.cluster_time_millis = Some(millis);
        self
    }

    pub fn with_host_time(mut self, host: &str, millis: i64) -> Self {
        self.host_times.insert(host.to_string(), millis);
        self
    }

    /// Files returned by every node's snapshot listing.
    pub fn with_listing(mut self, files: &[&str]) -> Self {
        self.listing = Some(listing_of(files));
        self
    }

    pub fn with_host_listing(
        mut self,
        host: &str,
        listing: Option<ListSnapshotFilesResponse>,
    ) -> Self {
        self.host_listings.insert(host.to_string(), listing);
        self
    }

    pub fn with_missing_listing(mut self) -> Self {
        self.listing = None;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fails `operation` (on `host`, or everywhere) with `error`, forever.
    pub fn failing(self, operation: &'static str, host: Option<&str>, error: SidecarError) -> Self {
        self.push_failure(operation, host, error, None);
        self
    }

    /// Fails `operation` for the next `times` calls, then succeeds.
    pub fn failing_times(
        self,
        operation: &'static str,
        host: Option<&str>,
        error: SidecarError,
        times: usize,
    ) -> Self {
        self.push_failure(operation, host, error, Some(times));
        self
    }

    fn push_failure(
        &self,
        operation: &'static str,
        host: Option<&str>,
        error: SidecarError,
        remaining: Option<usize>,
    ) {
        self.failures.lock().push(Failure {
            operation,
            host: host.map(str::to_string),
            error,
            remaining,
        });
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn calls_for(&self, operation: &str, host: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.operation == operation && c.host == host)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn uploads(&self) -> Vec<(String, UploadRequest)> {
        self.uploads.lock().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    async fn enter(&self, operation: &'static str, host: &str) -> Result<(), SidecarError> {
        self.calls.lock().push(RecordedCall {
            operation,
            host: host.to_string(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut failures = self.failures.lock();
        let hit = failures.iter_mut().find(|f| {
            f.operation == operation
                && f.host.as_deref().is_none_or(|h| h == host)
                && f.remaining != Some(0)
        });
        match hit {
            Some(failure) => {
                if let Some(n) = failure.remaining.as_mut() {
                    *n -= 1;
                }
                Err(failure.error.clone())
            }
            None => Ok(()),
        }
    }
}

pub fn listing_of(files: &[&str]) -> ListSnapshotFilesResponse {
    ListSnapshotFilesResponse {
        snapshot_files_info: Some(
            files
                .iter()
                .map(|name| FileInfo {
                    file_name: name.to_string(),
                    size: 1024,
                    data_dir_index: 0,
                })
                .collect(),
        ),
    }
}

pub fn transport_error(host: &str) -> SidecarError {
    SidecarError::Transport {
        instance: host.to_string(),
        message: "connection refused".to_string(),
    }
}

pub fn exhausted_error(host: &str) -> SidecarError {
    SidecarError::RetriesExhausted {
        instance: host.to_string(),
        attempts: 11,
        last: Box::new(transport_error(host)),
    }
}

#[async_trait]
impl SidecarClient for MockSidecarClient {
    async fn ring(&self, _keyspace: &str) -> Result<Vec<RingEntry>, SidecarError> {
        self.enter("ring", "cluster").await?;
        Ok(self.ring.clone())
    }

    async fn schema(&self, _keyspace: &str) -> Result<SchemaResponse, SidecarError> {
        self.enter("schema", "cluster").await?;
        Ok(SchemaResponse {
            schema: self.schema.clone(),
        })
    }

    async fn node_settings(&self) -> Result<NodeSettings, SidecarError> {
        self.enter("node_settings", "cluster").await?;
        Ok(self.settings.clone())
    }

    async fn time_skew(&self, instance: &SidecarInstance) -> Result<TimeSkewResponse, SidecarError> {
        self.enter("time_skew", &instance.hostname).await?;
        let millis = self
            .host_times
            .get(&instance.hostname)
            .copied()
            .or(self.cluster_time_millis)
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
        Ok(TimeSkewResponse {
            current_time_millis: millis,
        })
    }

    async fn create_snapshot(
        &self,
        instance: &SidecarInstance,
        _snapshot: &SnapshotRef,
    ) -> Result<(), SidecarError> {
        self.enter("create_snapshot", &instance.hostname).await
    }

    async fn list_snapshot_files(
        &self,
        instance: &SidecarInstance,
        _snapshot: &SnapshotRef,
    ) -> Result<Option<ListSnapshotFilesResponse>, SidecarError> {
        self.enter("list_snapshot_files", &instance.hostname).await?;
        Ok(self
            .host_listings
            .get(&instance.hostname)
            .cloned()
            .unwrap_or_else(|| self.listing.clone()))
    }

    async fn clear_snapshot(
        &self,
        instance: &SidecarInstance,
        _snapshot: &SnapshotRef,
    ) -> Result<(), SidecarError> {
        self.enter("clear_snapshot", &instance.hostname).await
    }

    async fn upload_component(
        &self,
        instance: &SidecarInstance,
        request: &UploadRequest,
    ) -> Result<(), SidecarError> {
        self.enter("upload_component", &instance.hostname).await?;
        self.uploads
            .lock()
            .push((instance.hostname.clone(), request.clone()));
        Ok(())
    }

    async fn import_table(
        &self,
        instance: &SidecarInstance,
        _keyspace: &str,
        _table: &str,
        _upload_id: &str,
    ) -> Result<(), SidecarError> {
        self.enter("import_table", &instance.hostname).await
    }

    async fn close(&self) -> Result<(), SidecarError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.enter("close", "cluster").await
    }
}
