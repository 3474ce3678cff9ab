use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::availability::{AvailabilityHint, is_eligible_for_snapshot};
use super::client::{
    NodeSettings, SchemaResponse, SidecarClient, SidecarInstance, SnapshotRef, TimeSkewResponse,
};
use crate::engine::errors::SidecarError;
use crate::engine::ring::RingEntry;
use crate::shared::config::SidecarConfig;

/// Whether the job creates its snapshot and whether it clears it on
/// shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotLifecycle {
    pub create_snapshot: bool,
    pub clear_snapshot: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearSummary {
    pub cleared: usize,
    pub failed: usize,
    /// The deadline passed before every node answered.
    pub abandoned: bool,
}

/// Fans control-plane operations out to many nodes. A failure on one node
/// never aborts the others.
pub struct SidecarOrchestrator {
    client: Arc<dyn SidecarClient>,
    sidecar_port: u16,
    datacenter: Option<String>,
    clear_deadline: Duration,
    snapshot_created: AtomicBool,
    shut_down: AtomicBool,
}

impl SidecarOrchestrator {
    pub fn new(
        client: Arc<dyn SidecarClient>,
        sidecar_port: u16,
        datacenter: Option<String>,
        clear_deadline: Duration,
    ) -> Self {
        Self {
            client,
            sidecar_port,
            datacenter,
            clear_deadline,
            snapshot_created: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn from_config(
        client: Arc<dyn SidecarClient>,
        cfg: &SidecarConfig,
        datacenter: Option<String>,
    ) -> Self {
        Self::new(
            client,
            cfg.port,
            datacenter,
            Duration::from_secs(cfg.clear_deadline_secs),
        )
    }

    pub fn client(&self) -> Arc<dyn SidecarClient> {
        Arc::clone(&self.client)
    }

    pub fn sidecar_port(&self) -> u16 {
        self.sidecar_port
    }

    pub fn datacenter(&self) -> Option<&str> {
        self.datacenter.as_deref()
    }

    pub fn snapshot_created(&self) -> bool {
        self.snapshot_created.load(Ordering::Acquire)
    }

    pub fn instance(&self, entry: &RingEntry) -> SidecarInstance {
        SidecarInstance::for_entry(entry, self.sidecar_port)
    }

    /// One entry per node, restricted to the configured datacenter.
    fn local_nodes<'a>(&self, entries: &'a [RingEntry]) -> Vec<&'a RingEntry> {
        let mut seen = HashSet::new();
        entries
            .iter()
            .filter(|e| {
                self.datacenter
                    .as_deref()
                    .is_none_or(|dc| e.datacenter.eq_ignore_ascii_case(dc))
            })
            .filter(|e| seen.insert(e.fqdn.as_str()))
            .collect()
    }

    pub fn instances(&self, entries: &[RingEntry]) -> Vec<SidecarInstance> {
        self.local_nodes(entries)
            .into_iter()
            .map(|e| self.instance(e))
            .collect()
    }

    pub async fn fetch_ring(&self, keyspace: &str) -> Result<Vec<RingEntry>, SidecarError> {
        let ring = self.client.ring(keyspace).await?;
        debug!(
            target: "cass_bulk::sidecar",
            keyspace,
            entries = ring.len(),
            "Fetched ring"
        );
        Ok(ring)
    }

    pub async fn fetch_schema(&self, keyspace: &str) -> Result<SchemaResponse, SidecarError> {
        self.client.schema(keyspace).await
    }

    pub async fn fetch_node_settings(&self) -> Result<NodeSettings, SidecarError> {
        self.client.node_settings().await
    }

    /// Current time of the first replica that answers.
    pub async fn fetch_cluster_time(
        &self,
        instances: &[SidecarInstance],
    ) -> Result<TimeSkewResponse, SidecarError> {
        let mut last_error = None;
        for instance in instances {
            match self.client.time_skew(instance).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(
                        target: "cass_bulk::sidecar",
                        %instance,
                        error = %e,
                        "Could not read cluster time, trying next replica"
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| SidecarError::Transport {
            instance: "cluster".to_string(),
            message: "no replica available to read cluster time".to_string(),
        }))
    }

    /// Creates `snapshot` on every eligible node concurrently and returns an
    /// availability hint for every node considered.
    pub async fn create_snapshot_across_cluster(
        &self,
        entries: &[RingEntry],
        snapshot: &SnapshotRef,
    ) -> HashMap<String, AvailabilityHint> {
        let mut hints = HashMap::new();
        let mut pending = Vec::new();
        for entry in self.local_nodes(entries) {
            if !is_eligible_for_snapshot(entry) {
                debug!(
                    target: "cass_bulk::sidecar",
                    node = %entry.fqdn,
                    status = %entry.status,
                    state = %entry.state,
                    "Skipping snapshot on ineligible node"
                );
                hints.insert(entry.fqdn.clone(), AvailabilityHint::Down);
                continue;
            }
            let instance = self.instance(entry);
            let client = Arc::clone(&self.client);
            pending.push(async move {
                let result = client.create_snapshot(&instance, snapshot).await;
                let created = result.is_ok();
                let hint = match result {
                    Ok(()) => AvailabilityHint::from_entry(entry),
                    Err(e) if e.is_exhausted() => {
                        warn!(
                            target: "cass_bulk::sidecar",
                            %instance,
                            error = %e,
                            "Snapshot creation exhausted retries, marking node down"
                        );
                        AvailabilityHint::Down
                    }
                    Err(e) => {
                        warn!(
                            target: "cass_bulk::sidecar",
                            %instance,
                            error = %e,
                            "Snapshot creation failed"
                        );
                        AvailabilityHint::Unknown
                    }
                };
                (entry.fqdn.clone(), hint, created)
            });
        }

        let mut created = 0usize;
        for (fqdn, hint, ok) in join_all(pending).await {
            hints.insert(fqdn, hint);
            created += usize::from(ok);
        }
        // Nothing to clear later unless some node holds the snapshot.
        if created > 0 {
            self.snapshot_created.store(true, Ordering::Release);
        }

        info!(
            target: "cass_bulk::sidecar",
            %snapshot,
            nodes = hints.len(),
            created,
            up = hints.values().filter(|h| **h == AvailabilityHint::Up).count(),
            "Snapshot created across cluster"
        );
        hints
    }

    /// Best-effort concurrent delete. Gives up waiting once the clear
    /// deadline passes.
    pub async fn clear_snapshot_across_cluster(
        &self,
        instances: &[SidecarInstance],
        snapshot: &SnapshotRef,
    ) -> ClearSummary {
        let cleared = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        let requests = instances.iter().map(|instance| {
            let (cleared, failed) = (&cleared, &failed);
            async move {
                match self.client.clear_snapshot(instance, snapshot).await {
                    Ok(()) => {
                        cleared.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            target: "cass_bulk::sidecar",
                            %instance,
                            %snapshot,
                            error = %e,
                            "Failed to clear snapshot"
                        );
                    }
                }
            }
        });

        let abandoned = tokio::time::timeout(self.clear_deadline, join_all(requests))
            .await
            .is_err();
        if abandoned {
            warn!(
                target: "cass_bulk::sidecar",
                %snapshot,
                deadline_secs = self.clear_deadline.as_secs(),
                "Gave up waiting for snapshot clearing"
            );
        }

        ClearSummary {
            cleared: cleared.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
            abandoned,
        }
    }

    /// Clears the snapshot when this job owns it, then closes the client.
    /// Errors are logged and never returned; repeated calls do nothing.
    pub async fn shutdown(
        &self,
        lifecycle: SnapshotLifecycle,
        instances: &[SidecarInstance],
        snapshot: &SnapshotRef,
    ) -> Option<ClearSummary> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return None;
        }

        let mut summary = None;
        if lifecycle.clear_snapshot {
            if lifecycle.create_snapshot && self.snapshot_created() {
                summary = Some(self.clear_snapshot_across_cluster(instances, snapshot).await);
            } else {
                warn!(
                    target: "cass_bulk::sidecar",
                    %snapshot,
                    "Skipping snapshot clearing: only the job that created a snapshot can clear it"
                );
            }
        }

        if let Err(e) = self.client.close().await {
            warn!(
                target: "cass_bulk::sidecar",
                error = %e,
                "Error closing control-plane client"
            );
        }
        summary
    }
}
