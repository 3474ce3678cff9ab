use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::client::{
    ListSnapshotFilesResponse, NodeSettings, SchemaResponse, SidecarClient, SidecarInstance,
    SnapshotRef, TimeSkewResponse, UploadRequest,
};
use crate::engine::errors::SidecarError;
use crate::engine::ring::RingEntry;
use crate::shared::config::SidecarConfig;

const CLUSTER: &str = "cluster";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub millis_to_sleep: u64,
    pub max_millis_to_sleep: u64,
    pub timeout: Duration,
    pub max_pool_size: usize,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (zero based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry);
        let millis = self
            .millis_to_sleep
            .saturating_mul(factor)
            .min(self.max_millis_to_sleep);
        Duration::from_millis(millis)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&SidecarConfig::default())
    }
}

impl From<&SidecarConfig> for RetryPolicy {
    fn from(cfg: &SidecarConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            millis_to_sleep: cfg.millis_to_sleep,
            max_millis_to_sleep: cfg.max_millis_to_sleep,
            timeout: Duration::from_secs(cfg.timeout_seconds),
            max_pool_size: cfg.max_pool_size.max(1),
        }
    }
}

/// Adds per-attempt timeouts, bounded exponential backoff and a shared
/// concurrency limit to any transport.
pub struct RetryingSidecarClient<C> {
    inner: C,
    policy: RetryPolicy,
    permits: Semaphore,
}

impl<C: SidecarClient> RetryingSidecarClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        let permits = Semaphore::new(policy.max_pool_size);
        Self {
            inner,
            policy,
            permits,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn with_retry<T, F, Fut>(
        &self,
        instance: &str,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, SidecarError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, SidecarError>> + Send,
        T: Send,
    {
        let attempts = self.policy.max_retries.saturating_add(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = {
                let _permit = self
                    .permits
                    .acquire()
                    .await
                    .map_err(|_| SidecarError::Closed)?;
                match tokio::time::timeout(self.policy.timeout, call()).await {
                    Ok(result) => result,
                    Err(_) => Err(SidecarError::Timeout {
                        instance: instance.to_string(),
                        timeout_ms: self.policy.timeout.as_millis() as u64,
                    }),
                }
            };

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            target: "cass_bulk::sidecar",
                            instance,
                            operation,
                            attempt,
                            "Request succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.policy.backoff(attempt - 1);
                    debug!(
                        target: "cass_bulk::sidecar",
                        instance,
                        operation,
                        attempt,
                        error = %e,
                        "Request failed, retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        target: "cass_bulk::sidecar",
                        instance,
                        operation,
                        attempts = attempt,
                        error = %e,
                        "Retries exhausted"
                    );
                    return Err(SidecarError::RetriesExhausted {
                        instance: instance.to_string(),
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<C: SidecarClient> SidecarClient for RetryingSidecarClient<C> {
    async fn ring(&self, keyspace: &str) -> Result<Vec<RingEntry>, SidecarError> {
        self.with_retry(CLUSTER, "ring", || self.inner.ring(keyspace))
            .await
    }

    async fn schema(&self, keyspace: &str) -> Result<SchemaResponse, SidecarError> {
        self.with_retry(CLUSTER, "schema", || self.inner.schema(keyspace))
            .await
    }

    async fn node_settings(&self) -> Result<NodeSettings, SidecarError> {
        self.with_retry(CLUSTER, "node_settings", || self.inner.node_settings())
            .await
    }

    async fn time_skew(&self, instance: &SidecarInstance) -> Result<TimeSkewResponse, SidecarError> {
        let name = instance.to_string();
        self.with_retry(&name, "time_skew", || self.inner.time_skew(instance))
            .await
    }

    async fn create_snapshot(
        &self,
        instance: &SidecarInstance,
        snapshot: &SnapshotRef,
    ) -> Result<(), SidecarError> {
        let name = instance.to_string();
        self.with_retry(&name, "create_snapshot", || {
            self.inner.create_snapshot(instance, snapshot)
        })
        .await
    }

    async fn list_snapshot_files(
        &self,
        instance: &SidecarInstance,
        snapshot: &SnapshotRef,
    ) -> Result<Option<ListSnapshotFilesResponse>, SidecarError> {
        let name = instance.to_string();
        self.with_retry(&name, "list_snapshot_files", || {
            self.inner.list_snapshot_files(instance, snapshot)
        })
        .await
    }

    async fn clear_snapshot(
        &self,
        instance: &SidecarInstance,
        snapshot: &SnapshotRef,
    ) -> Result<(), SidecarError> {
        let name = instance.to_string();
        self.with_retry(&name, "clear_snapshot", || {
            self.inner.clear_snapshot(instance, snapshot)
        })
        .await
    }

    async fn upload_component(
        &self,
        instance: &SidecarInstance,
        request: &UploadRequest,
    ) -> Result<(), SidecarError> {
        let name = instance.to_string();
        self.with_retry(&name, "upload_component", || {
            self.inner.upload_component(instance, request)
        })
        .await
    }

    async fn import_table(
        &self,
        instance: &SidecarInstance,
        keyspace: &str,
        table: &str,
        upload_id: &str,
    ) -> Result<(), SidecarError> {
        let name = instance.to_string();
        self.with_retry(&name, "import_table", || {
            self.inner.import_table(instance, keyspace, table, upload_id)
        })
        .await
    }

    async fn close(&self) -> Result<(), SidecarError> {
        self.permits.close();
        self.inner.close().await
    }
}
