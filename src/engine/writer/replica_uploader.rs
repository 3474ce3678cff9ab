use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::consistency::ConsistencyLevel;
use crate::engine::bridge::EncodedTable;
use crate::engine::errors::{SidecarError, WriteError};
use crate::engine::ring::{ReplicaSet, ReplicationFactor, RingEntry};
use crate::engine::sidecar::{SidecarClient, SidecarInstance, UploadRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub replica: String,
    pub datacenter: String,
    pub status: UploadStatus,
}

impl UploadOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == UploadStatus::Succeeded
    }
}

/// Per-replica outcomes of one storage table. `succeeded` counts the
/// acknowledgements of the weakest replica set the table was judged against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableUploadResult {
    pub table: String,
    pub outcomes: Vec<UploadOutcome>,
    pub replica_sets: usize,
    pub required: usize,
    pub succeeded: usize,
}

/// Ships encoded storage tables to every owning replica and judges the
/// outcome against the consistency level.
pub struct ReplicaUploader {
    client: Arc<dyn SidecarClient>,
    sidecar_port: u16,
    keyspace: String,
    table: String,
    replication: ReplicationFactor,
    consistency_level: ConsistencyLevel,
    local_dc: Option<String>,
}

impl ReplicaUploader {
    pub fn new(
        client: Arc<dyn SidecarClient>,
        sidecar_port: u16,
        keyspace: impl Into<String>,
        table: impl Into<String>,
        replication: ReplicationFactor,
        consistency_level: ConsistencyLevel,
        local_dc: Option<String>,
    ) -> Self {
        Self {
            client,
            sidecar_port,
            keyspace: keyspace.into(),
            table: table.into(),
            replication,
            consistency_level,
            local_dc,
        }
    }

    async fn requests(
        &self,
        encoded: &EncodedTable,
        upload_id: &str,
    ) -> Result<Vec<UploadRequest>, WriteError> {
        let mut requests = Vec::with_capacity(encoded.components.len());
        for (component, path) in &encoded.components {
            let contents = tokio::fs::read(path).await?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| component.file_name(&encoded.base_name));
            requests.push(UploadRequest {
                keyspace: self.keyspace.clone(),
                table: self.table.clone(),
                upload_id: upload_id.to_string(),
                component: *component,
                path: path.clone(),
                file_name,
                digest: format!("{:08x}", crc32fast::hash(&contents)),
                size: contents.len() as u64,
            });
        }
        Ok(requests)
    }

    async fn upload_to(
        &self,
        instance: &SidecarInstance,
        requests: &[UploadRequest],
        upload_id: &str,
    ) -> Result<(), SidecarError> {
        for request in requests {
            self.client.upload_component(instance, request).await?;
        }
        self.client
            .import_table(instance, &self.keyspace, &self.table, upload_id)
            .await
    }

    /// Uploads `encoded` once to every distinct replica of `replica_sets`,
    /// then commits it. Every replica is attempted even after failures; the
    /// consistency level must then hold within each replica set.
    pub async fn upload(
        &self,
        encoded: &EncodedTable,
        replica_sets: &[ReplicaSet<'_>],
        upload_id: &str,
    ) -> Result<TableUploadResult, WriteError> {
        let replicas = distinct_replicas(replica_sets);
        if replicas.is_empty() {
            return Err(WriteError::InvalidState(format!(
                "no replicas to receive {}",
                encoded.base_name
            )));
        }
        let requests = self.requests(encoded, upload_id).await?;

        let uploads = replicas.iter().map(|replica| {
            let instance = SidecarInstance::for_entry(replica, self.sidecar_port);
            let requests = &requests;
            async move {
                let status = match self.upload_to(&instance, requests, upload_id).await {
                    Ok(()) => UploadStatus::Succeeded,
                    Err(e) => {
                        warn!(
                            target: "cass_bulk::upload",
                            %instance,
                            table = %encoded.base_name,
                            error = %e,
                            "Upload to replica failed"
                        );
                        UploadStatus::Failed(e.to_string())
                    }
                };
                UploadOutcome {
                    replica: replica.fqdn.clone(),
                    datacenter: replica.datacenter.clone(),
                    status,
                }
            }
        });
        let outcomes = join_all(uploads).await;

        let required = self
            .consistency_level
            .required(&self.replication, self.local_dc.as_deref());
        let mut weakest = usize::MAX;
        for set in replica_sets {
            let succeeded_dcs: Vec<&str> = set
                .replicas
                .iter()
                .filter(|r| {
                    outcomes
                        .iter()
                        .any(|o| o.replica == r.fqdn && o.succeeded())
                })
                .map(|r| r.datacenter.as_str())
                .collect();
            let succeeded = succeeded_dcs.len();
            weakest = weakest.min(succeeded);

            if !self.consistency_level.is_satisfied(
                &self.replication,
                self.local_dc.as_deref(),
                &succeeded_dcs,
            ) {
                return Err(WriteError::QuorumNotMet {
                    table: encoded.base_name.clone(),
                    range: set.range,
                    consistency_level: self.consistency_level.to_string(),
                    required,
                    succeeded,
                });
            }
        }
        let succeeded = if weakest == usize::MAX { 0 } else { weakest };

        debug!(
            target: "cass_bulk::upload",
            table = %encoded.base_name,
            components = requests.len(),
            replicas = outcomes.len(),
            replica_sets = replica_sets.len(),
            "Storage table uploaded"
        );
        info!(
            target: "cass_bulk::upload",
            table = %encoded.base_name,
            succeeded,
            required,
            consistency_level = %self.consistency_level,
            "Consistency level satisfied"
        );

        Ok(TableUploadResult {
            table: encoded.base_name.clone(),
            outcomes,
            replica_sets: replica_sets.len(),
            required,
            succeeded,
        })
    }
}

/// Every replica of every set, once, in order of first appearance.
fn distinct_replicas<'a>(replica_sets: &[ReplicaSet<'a>]) -> Vec<&'a RingEntry> {
    let mut replicas: Vec<&'a RingEntry> = Vec::new();
    for r in replica_sets.iter().flat_map(|s| s.replicas.iter().copied()) {
        if !replicas.iter().any(|x| x.fqdn == r.fqdn) {
            replicas.push(r);
        }
    }
    replicas
}
