use futures::future::join_all;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::job_snapshot::JobSnapshot;
use super::options::JobOptions;
use crate::engine::bridge::CassandraVersion;
use crate::engine::catalog::{CatalogKey, SnapshotCatalog, StorageTables};
use crate::engine::cql::TableSchema;
use crate::engine::errors::{CatalogError, JobError};
use crate::engine::ring::{Partitioner, RingEntry, RingTopology, TokenPartitioner, TokenRange};
use crate::engine::sidecar::{
    AvailabilityHint, ClearSummary, SidecarClient, SidecarInstance, SidecarOrchestrator,
    order_by_availability,
};
use crate::shared::config::{CatalogConfig, SidecarConfig};

/// Storage tables one replica holds for the job's snapshot.
#[derive(Debug, Clone)]
pub struct ReplicaListing {
    pub instance: SidecarInstance,
    pub datacenter: String,
    pub tables: StorageTables,
}

#[derive(Debug, Clone)]
pub struct PartitionListing {
    pub partition_id: usize,
    pub range: TokenRange,
    pub replicas: Vec<ReplicaListing>,
}

/// Read side of a bulk job: plans partitions once on the driver, then serves
/// per-partition snapshot listings from the driver or from any worker that
/// received the encoded [`JobSnapshot`].
pub struct BulkReaderJob {
    snapshot: JobSnapshot,
    ring: RingTopology,
    partitioner: TokenPartitioner,
    hints: HashMap<String, AvailabilityHint>,
    orchestrator: SidecarOrchestrator,
    catalog: SnapshotCatalog,
}

impl BulkReaderJob {
    /// Discovers the cluster, splits the ring and, when requested, snapshots
    /// the table on every eligible node.
    pub async fn initialize(
        client: Arc<dyn SidecarClient>,
        options: JobOptions,
        sidecar: &SidecarConfig,
        catalog: &CatalogConfig,
    ) -> Result<Self, JobError> {
        Self::discover(client, options, sidecar, catalog)
            .await
            .inspect_err(JobError::log_error)
    }

    async fn discover(
        client: Arc<dyn SidecarClient>,
        options: JobOptions,
        sidecar: &SidecarConfig,
        catalog: &CatalogConfig,
    ) -> Result<Self, JobError> {
        let orchestrator = orchestrator_for(Arc::clone(&client), &options, sidecar);

        let settings = orchestrator.fetch_node_settings().await?;
        let version = CassandraVersion::from_release(&settings.release_version)
            .ok_or_else(|| JobError::UnsupportedVersion(settings.release_version.clone()))?;
        let partitioner = Partitioner::from_class_name(&settings.partitioner)?;

        let full_schema = orchestrator.fetch_schema(&options.keyspace).await?;
        let schema = TableSchema::from_full_schema(&full_schema.schema, &options.keyspace, &options.table)?;

        let entries = orchestrator.fetch_ring(&options.keyspace).await?;
        let ring = RingTopology::new(
            partitioner,
            schema.replication.clone(),
            entries,
            options.datacenter.as_deref(),
        )?;
        let token_partitioner =
            TokenPartitioner::new(&ring, options.default_parallelism, options.num_cores)?;

        let hints = if options.create_snapshot {
            orchestrator
                .create_snapshot_across_cluster(ring.entries(), &options.snapshot())
                .await
        } else {
            ring.instances()
                .into_iter()
                .map(|e| (e.fqdn.clone(), AvailabilityHint::from_entry(e)))
                .collect()
        };

        info!(
            target: "cass_bulk::job",
            keyspace = %options.keyspace,
            table = %options.table,
            snapshot = %options.snapshot_name,
            %version,
            partitions = token_partitioner.num_partitions(),
            nodes = hints.len(),
            "Bulk reader initialized"
        );

        let snapshot = JobSnapshot {
            version,
            partitioner,
            replication: ring.replication().clone(),
            ring: ring.entries().to_vec(),
            ranges: token_partitioner.ranges().to_vec(),
            hints: hints.iter().map(|(k, v)| (k.clone(), *v)).collect::<BTreeMap<_, _>>(),
            schema,
            options,
        };

        Ok(Self {
            snapshot,
            ring,
            partitioner: token_partitioner,
            hints,
            orchestrator,
            catalog: SnapshotCatalog::from_config(client, catalog),
        })
    }

    /// Rebuilds a job on a worker without any cluster round trip.
    pub fn from_snapshot(
        client: Arc<dyn SidecarClient>,
        snapshot: JobSnapshot,
        sidecar: &SidecarConfig,
        catalog: &CatalogConfig,
    ) -> Result<Self, JobError> {
        let ring = snapshot.topology()?;
        let partitioner = snapshot.partitioner()?;
        let orchestrator = orchestrator_for(Arc::clone(&client), &snapshot.options, sidecar);
        let hints = snapshot
            .hints
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        Ok(Self {
            snapshot,
            ring,
            partitioner,
            hints,
            orchestrator,
            catalog: SnapshotCatalog::from_config(client, catalog),
        })
    }

    pub fn snapshot(&self) -> &JobSnapshot {
        &self.snapshot
    }

    pub fn options(&self) -> &JobOptions {
        &self.snapshot.options
    }

    pub fn ring(&self) -> &RingTopology {
        &self.ring
    }

    pub fn partitioner(&self) -> &TokenPartitioner {
        &self.partitioner
    }

    pub fn hints(&self) -> &HashMap<String, AvailabilityHint> {
        &self.hints
    }

    pub fn catalog(&self) -> &SnapshotCatalog {
        &self.catalog
    }

    pub async fn list_instance(&self, entry: &RingEntry) -> Result<StorageTables, CatalogError> {
        let instance = self.orchestrator.instance(entry);
        let key = CatalogKey::new(
            self.options().datacenter.as_deref(),
            &instance,
            &self.options().snapshot(),
        );
        self.catalog.list(&key).await
    }

    /// Lists the partition's tables from enough replicas to satisfy the read
    /// consistency level within every replica set the partition spans.
    /// Replicas are tried in availability order; a failed replica is replaced
    /// by the next unused owner of the same piece. A node listed for one
    /// piece also counts for every other piece it owns.
    pub async fn list_partition(&self, partition_id: usize) -> Result<PartitionListing, JobError> {
        let range = self.partitioner.token_range(partition_id)?;
        let options = self.options();
        let required = options
            .consistency_level
            .required(self.ring.replication(), options.datacenter.as_deref());

        let mut listed: Vec<ReplicaListing> = Vec::new();
        let mut listed_nodes: HashSet<String> = HashSet::new();
        let mut failed_nodes: HashSet<String> = HashSet::new();

        for set in self.ring.replica_sets_for_range(&range) {
            let mut available = set
                .replicas
                .iter()
                .filter(|r| listed_nodes.contains(&r.fqdn))
                .count();
            let candidates: Vec<&RingEntry> = order_by_availability(&set.replicas, &self.hints)
                .into_iter()
                .filter(|r| !listed_nodes.contains(&r.fqdn) && !failed_nodes.contains(&r.fqdn))
                .collect();
            let mut candidates = candidates.into_iter();

            while available < required {
                let wave: Vec<&RingEntry> = candidates.by_ref().take(required - available).collect();
                if wave.is_empty() {
                    break;
                }
                let results = join_all(wave.into_iter().map(|entry| async move {
                    (entry, self.list_instance(entry).await)
                }))
                .await;
                for (entry, result) in results {
                    match result {
                        Ok(tables) => {
                            available += 1;
                            listed_nodes.insert(entry.fqdn.clone());
                            listed.push(ReplicaListing {
                                instance: self.orchestrator.instance(entry),
                                datacenter: entry.datacenter.clone(),
                                tables,
                            });
                        }
                        Err(e) => {
                            warn!(
                                target: "cass_bulk::job",
                                partition_id,
                                node = %entry.fqdn,
                                error = %e,
                                "Replica listing failed, trying next replica"
                            );
                            failed_nodes.insert(entry.fqdn.clone());
                        }
                    }
                }
            }

            if available < required {
                let err = JobError::NotEnoughReplicas {
                    partition_id,
                    range: set.range,
                    required,
                    available,
                };
                err.log_error();
                return Err(err);
            }
        }

        debug!(
            target: "cass_bulk::job",
            partition_id,
            %range,
            replicas = listed.len(),
            "Partition listed"
        );
        Ok(PartitionListing {
            partition_id,
            range,
            replicas: listed,
        })
    }

    /// Clears the snapshot if this job created it and closes the client.
    /// Safe to call more than once.
    pub async fn shutdown(&self) -> Option<ClearSummary> {
        let instances = self.orchestrator.instances(self.ring.entries());
        self.orchestrator
            .shutdown(
                self.options().lifecycle(),
                &instances,
                &self.options().snapshot(),
            )
            .await
    }
}

fn orchestrator_for(
    client: Arc<dyn SidecarClient>,
    options: &JobOptions,
    sidecar: &SidecarConfig,
) -> SidecarOrchestrator {
    SidecarOrchestrator::new(
        client,
        options.sidecar_port,
        options.datacenter.clone(),
        Duration::from_secs(sidecar.clear_deadline_secs),
    )
}
