use std::collections::HashMap;

use super::mock_sidecar_client::MockSidecarClient;
use super::ring_factory::RingFactory;
use crate::engine::job::JobOptions;

pub const USERS_SCHEMA: &str = r#"
CREATE KEYSPACE ks WITH replication = {'class': 'org.apache.cassandra.locator.NetworkTopologyStrategy', 'DC1': '3'} AND durable_writes = true;

CREATE TABLE ks.users (
    id int PRIMARY KEY,
    name text
) WITH comment = 'bulk';
"#;

/// Two complete storage tables plus a stray file.
pub const USERS_LISTING: [&str; 7] = [
    "nb-1-big-Data.db",
    "nb-1-big-Index.db",
    "nb-1-big-TOC.txt",
    "nb-2-big-Data.db",
    "nb-2-big-Index.db",
    "nb-2-big-Statistics.db",
    "manifest.json",
];

/// Read job against `ks.users` on a twelve-node, single-DC ring split into
/// twelve partitions unless `with_partitions` says otherwise.
pub struct JobFactory {
    ring: RingFactory,
    options: Vec<(String, String)>,
}

impl JobFactory {
    pub fn new() -> Self {
        Self {
            ring: RingFactory::new(),
            options: vec![
                ("keyspace".to_string(), "ks".to_string()),
                ("table".to_string(), "users".to_string()),
                ("snapshotName".to_string(), "sbr_test".to_string()),
                ("defaultParallelism".to_string(), "12".to_string()),
            ],
        }
    }

    pub fn with_ring(mut self, ring: RingFactory) -> Self {
        self.ring = ring;
        self
    }

    pub fn with_partitions(self, partitions: usize) -> Self {
        self.with_option("defaultParallelism", &partitions.to_string())
    }

    pub fn with_option(mut self, key: &str, value: &str) -> Self {
        self.options.push((key.to_string(), value.to_string()));
        self
    }

    /// Control plane serving the ring, schema and listing; extend it with
    /// failures before wrapping it in an `Arc`.
    pub fn client(&self) -> MockSidecarClient {
        MockSidecarClient::new()
            .with_ring(self.ring.entries())
            .with_schema(USERS_SCHEMA)
            .with_listing(&USERS_LISTING)
    }

    pub fn options(&self) -> JobOptions {
        let map: HashMap<String, String> = self.options.iter().cloned().collect();
        JobOptions::from_map(&map).expect("valid job options")
    }
}
