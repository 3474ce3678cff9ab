use std::sync::Arc;

use super::mock_bridge::MockBridge;
use super::mock_sidecar_client::MockSidecarClient;
use super::ring_factory::RingFactory;
use crate::engine::cql::TableSchema;
use crate::engine::ring::{RingTopology, TokenPartitioner};
use crate::engine::sidecar::SidecarOrchestrator;
use crate::engine::writer::{WriterContext, WriterOptions};
use crate::shared::time::FixedTimeProvider;

pub const CLUSTER_TIME_MILLIS: i64 = 1_700_000_000_000;

pub fn users_schema(ring: &RingTopology) -> TableSchema {
    TableSchema {
        keyspace: "ks".to_string(),
        table: "users".to_string(),
        create_statement: "CREATE TABLE ks.users (id int PRIMARY KEY, name text);".to_string(),
        replication: ring.replication().clone(),
        index_count: 0,
        udts: Vec::new(),
    }
}

/// Twelve-node ring split into one partition per node by default, so every
/// partition is owned by exactly three replicas. Fewer partitions make each
/// one span several replica sets.
pub struct WriterContextFactory {
    client: Arc<MockSidecarClient>,
    bridge: Arc<MockBridge>,
    options: WriterOptions,
    local_millis: i64,
    partitions: usize,
}

impl WriterContextFactory {
    pub fn new() -> Self {
        let options = WriterOptions {
            sstable_batch_size: 2,
            ..WriterOptions::default()
        };
        Self {
            client: Arc::new(MockSidecarClient::new().with_cluster_time(CLUSTER_TIME_MILLIS)),
            bridge: Arc::new(MockBridge::new()),
            options,
            local_millis: CLUSTER_TIME_MILLIS,
            partitions: 12,
        }
    }

    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_client(mut self, client: Arc<MockSidecarClient>) -> Self {
        self.client = client;
        self
    }

    pub fn with_bridge(mut self, bridge: Arc<MockBridge>) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn with_options(mut self, options: WriterOptions) -> Self {
        self.options = options;
        self
    }

    /// Local clock offset from the cluster clock, in minutes.
    pub fn with_local_skew_minutes(mut self, minutes: i64) -> Self {
        self.local_millis = CLUSTER_TIME_MILLIS + minutes * 60_000;
        self
    }

    pub fn client(&self) -> Arc<MockSidecarClient> {
        Arc::clone(&self.client)
    }

    pub fn bridge(&self) -> Arc<MockBridge> {
        Arc::clone(&self.bridge)
    }

    pub fn create(&self) -> Arc<WriterContext> {
        let ring = RingFactory::new().create();
        let partitioner = TokenPartitioner::new(&ring, self.partitions, 1).expect("partitioner");
        let schema = users_schema(&ring);
        let orchestrator = SidecarOrchestrator::new(
            self.client.clone(),
            9043,
            None,
            std::time::Duration::from_secs(5),
        );
        Arc::new(WriterContext {
            keyspace: "ks".to_string(),
            table: "users".to_string(),
            ring: Arc::new(ring),
            partitioner: Arc::new(partitioner),
            orchestrator: Arc::new(orchestrator),
            bridge: self.bridge.clone(),
            schema: Arc::new(schema),
            options: self.options.clone(),
            time_provider: Arc::new(FixedTimeProvider::new(self.local_millis)),
            session_id: "test-session".to_string(),
        })
    }
}
