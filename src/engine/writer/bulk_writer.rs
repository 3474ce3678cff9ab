use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::options::{RowBufferMode, WriterOptions};
use super::replica_uploader::{ReplicaUploader, TableUploadResult};
use crate::engine::bridge::{Bridge, Row, TableEncoder};
use crate::engine::cql::TableSchema;
use crate::engine::errors::WriteError;
use crate::engine::ring::{ReplicaSet, RingTopology, Token, TokenPartitioner, TokenRange};
use crate::engine::sidecar::{SidecarInstance, SidecarOrchestrator};
use crate::shared::time::{TimeProvider, format_millis, skew_minutes};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Idle,
    Tokenizing,
    Batching,
    Encoding,
    Uploading,
    Completed,
    Failed,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Everything shared by the writers of one job.
pub struct WriterContext {
    pub keyspace: String,
    pub table: String,
    pub ring: Arc<RingTopology>,
    pub partitioner: Arc<TokenPartitioner>,
    pub orchestrator: Arc<SidecarOrchestrator>,
    pub bridge: Arc<dyn Bridge>,
    pub schema: Arc<TableSchema>,
    pub options: WriterOptions,
    pub time_provider: Arc<dyn TimeProvider>,
    /// Prefix of every upload id issued by this job.
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub partition_id: usize,
    pub rows_written: usize,
    pub tables: Vec<TableUploadResult>,
}

struct OpenBatch {
    staging: TempDir,
    encoder: Box<dyn TableEncoder>,
    rows: usize,
    bytes: u64,
}

/// Writes the rows of one token partition. Rows must arrive sorted by token
/// and fall inside the partition's range.
pub struct BulkWriter {
    ctx: Arc<WriterContext>,
    partition_id: usize,
    state: Mutex<WriterState>,
}

impl BulkWriter {
    pub fn new(ctx: Arc<WriterContext>, partition_id: usize) -> Self {
        Self {
            ctx,
            partition_id,
            state: Mutex::new(WriterState::Idle),
        }
    }

    pub fn state(&self) -> WriterState {
        *self.state.lock()
    }

    fn set_state(&self, state: WriterState) {
        *self.state.lock() = state;
    }

    pub async fn write<I>(&self, rows: I) -> Result<WriteResult, WriteError>
    where
        I: IntoIterator<Item = Row>,
        I::IntoIter: Send,
    {
        let current = self.state();
        if current != WriterState::Idle {
            return Err(WriteError::InvalidState(current.to_string()));
        }
        match self.run(rows.into_iter()).await {
            Ok(result) => {
                self.set_state(WriterState::Completed);
                Ok(result)
            }
            Err(e) => {
                self.set_state(WriterState::Failed);
                warn!(
                    target: "cass_bulk::writer",
                    partition_id = self.partition_id,
                    error = %e,
                    "Partition write failed"
                );
                Err(e)
            }
        }
    }

    async fn run<R>(&self, rows: R) -> Result<WriteResult, WriteError>
    where
        R: Iterator<Item = Row> + Send,
    {
        let ctx = &self.ctx;
        let range = ctx.partitioner.token_range(self.partition_id)?;
        let replica_sets = ctx.ring.replica_sets_for_range(&range);
        if replica_sets.iter().all(|s| s.replicas.is_empty()) {
            return Err(WriteError::NoReplicas(range));
        }
        let mut instances: Vec<SidecarInstance> = Vec::new();
        for replica in replica_sets.iter().flat_map(|s| s.replicas.iter()) {
            let instance = ctx.orchestrator.instance(replica);
            if !instances.contains(&instance) {
                instances.push(instance);
            }
        }
        debug!(
            target: "cass_bulk::writer",
            partition_id = self.partition_id,
            %range,
            replica_sets = replica_sets.len(),
            replicas = instances.len(),
            "Partition replicas resolved"
        );

        self.check_clock_skew(&instances).await?;

        let uploader = ReplicaUploader::new(
            ctx.orchestrator.client(),
            ctx.orchestrator.sidecar_port(),
            ctx.keyspace.clone(),
            ctx.table.clone(),
            ctx.ring.replication().clone(),
            ctx.options.consistency_level,
            ctx.options.local_dc.clone(),
        );

        let mut tables = Vec::new();
        let mut rows_written = 0usize;
        let mut previous: Option<Token> = None;
        let mut batch: Option<OpenBatch> = None;

        for row in rows {
            self.set_state(WriterState::Tokenizing);
            let token = ctx.ring.partitioner().token(&row.partition_key);
            check_placement(token, &range, previous)?;
            previous = Some(token);

            self.set_state(WriterState::Batching);
            let mut open = match batch.take() {
                Some(open) => open,
                None => self.open_batch()?,
            };
            let added = open.encoder.add_row(token, &row)?;
            open.rows += 1;
            open.bytes += added as u64;
            rows_written += 1;

            if self.batch_full(&open) {
                tables.push(
                    self.finish_and_upload(open, &uploader, &replica_sets, tables.len())
                        .await?,
                );
            } else {
                batch = Some(open);
            }
        }

        if let Some(last) = batch.take() {
            tables.push(
                self.finish_and_upload(last, &uploader, &replica_sets, tables.len())
                    .await?,
            );
        }

        info!(
            target: "cass_bulk::writer",
            partition_id = self.partition_id,
            %range,
            rows_written,
            tables = tables.len(),
            "Partition written"
        );

        Ok(WriteResult {
            partition_id: self.partition_id,
            rows_written,
            tables,
        })
    }

    async fn check_clock_skew(&self, instances: &[SidecarInstance]) -> Result<(), WriteError> {
        let remote = self
            .ctx
            .orchestrator
            .fetch_cluster_time(instances)
            .await?
            .current_time_millis;
        let local = self.ctx.time_provider.now_millis();
        let allowable = self.ctx.options.allowable_skew_minutes;
        if (local - remote).abs() > allowable.saturating_mul(60_000) {
            return Err(WriteError::ClockSkewExceeded {
                allowable_minutes: allowable,
                local: format_millis(local),
                remote: format_millis(remote),
            });
        }
        debug!(
            target: "cass_bulk::writer",
            partition_id = self.partition_id,
            skew_minutes = skew_minutes(local, remote),
            "Clock skew within bounds"
        );
        Ok(())
    }

    fn open_batch(&self) -> Result<OpenBatch, WriteError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("cass_bulk-");
        let staging = match &self.ctx.options.staging_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempdir_in(dir)?
            }
            None => builder.tempdir()?,
        };
        let encoder = self
            .ctx
            .bridge
            .open_encoder(&self.ctx.schema, staging.path())?;
        Ok(OpenBatch {
            staging,
            encoder,
            rows: 0,
            bytes: 0,
        })
    }

    fn batch_full(&self, batch: &OpenBatch) -> bool {
        let options = &self.ctx.options;
        match options.row_buffer_mode {
            RowBufferMode::Unbuffered => batch.rows >= options.sstable_batch_size.max(1),
            RowBufferMode::Buffered => batch.bytes >= options.max_table_bytes(),
        }
    }

    async fn finish_and_upload(
        &self,
        batch: OpenBatch,
        uploader: &ReplicaUploader,
        replica_sets: &[ReplicaSet<'_>],
        sequence: usize,
    ) -> Result<TableUploadResult, WriteError> {
        self.set_state(WriterState::Encoding);
        let OpenBatch {
            staging,
            encoder,
            rows,
            bytes,
        } = batch;
        let encoded = encoder.finish()?;
        debug!(
            target: "cass_bulk::writer",
            partition_id = self.partition_id,
            table = %encoded.base_name,
            rows,
            bytes,
            "Storage table encoded"
        );

        self.set_state(WriterState::Uploading);
        let upload_id = format!(
            "{}-{}-{}",
            self.ctx.session_id, self.partition_id, sequence
        );
        let result = uploader.upload(&encoded, replica_sets, &upload_id).await;

        if let Err(e) = staging.close() {
            warn!(
                target: "cass_bulk::writer",
                error = %e,
                "Could not remove staging directory"
            );
        }
        result
    }
}

fn check_placement(
    token: Token,
    range: &TokenRange,
    previous: Option<Token>,
) -> Result<(), WriteError> {
    if !range.contains(token) {
        return Err(WriteError::PlacementViolation {
            token,
            range: *range,
        });
    }
    match previous {
        Some(prev) if token < prev => Err(WriteError::OutOfOrder {
            token,
            previous: prev,
        }),
        _ => Ok(()),
    }
}
