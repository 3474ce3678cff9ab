use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::engine::errors::RingError;

const SIMPLE_KEY: &str = "replication_factor";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplicationStrategy {
    SimpleStrategy,
    NetworkTopologyStrategy,
}

impl ReplicationStrategy {
    pub fn from_class_name(name: &str) -> Option<Self> {
        match name.rsplit('.').next().unwrap_or(name) {
            "SimpleStrategy" => Some(Self::SimpleStrategy),
            "NetworkTopologyStrategy" => Some(Self::NetworkTopologyStrategy),
            _ => None,
        }
    }
}

/// Replica counts of a keyspace: one `replication_factor` entry for the
/// simple strategy, one entry per datacenter otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationFactor {
    strategy: ReplicationStrategy,
    options: BTreeMap<String, usize>,
}

impl ReplicationFactor {
    pub fn simple(replicas: usize) -> Self {
        let mut options = BTreeMap::new();
        options.insert(SIMPLE_KEY.to_string(), replicas);
        Self {
            strategy: ReplicationStrategy::SimpleStrategy,
            options,
        }
    }

    pub fn network_topology<I, S>(datacenters: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        Self {
            strategy: ReplicationStrategy::NetworkTopologyStrategy,
            options: datacenters
                .into_iter()
                .map(|(dc, n)| (dc.into(), n))
                .collect(),
        }
    }

    pub fn strategy(&self) -> ReplicationStrategy {
        self.strategy
    }

    pub fn options(&self) -> &BTreeMap<String, usize> {
        &self.options
    }

    pub fn total(&self) -> usize {
        self.options.values().sum()
    }

    /// Replicas required in `datacenter`. The simple strategy ignores
    /// datacenters and returns the total.
    pub fn for_datacenter(&self, datacenter: &str) -> usize {
        match self.strategy {
            ReplicationStrategy::SimpleStrategy => self.total(),
            ReplicationStrategy::NetworkTopologyStrategy => self
                .options
                .iter()
                .find(|(dc, _)| dc.eq_ignore_ascii_case(datacenter))
                .map(|(_, n)| *n)
                .unwrap_or(0),
        }
    }

    /// Restricts a network-topology factor to one datacenter; used when the
    /// job only sees the ring of that datacenter.
    pub fn restricted_to(&self, datacenter: Option<&str>) -> Self {
        match (self.strategy, datacenter) {
            (ReplicationStrategy::NetworkTopologyStrategy, Some(dc)) => Self {
                strategy: self.strategy,
                options: self
                    .options
                    .iter()
                    .filter(|(name, _)| name.eq_ignore_ascii_case(dc))
                    .map(|(name, n)| (name.clone(), *n))
                    .collect(),
            },
            _ => self.clone(),
        }
    }

    /// Rejects factors the job cannot honour: zero replicas, or a datacenter
    /// filter the keyspace does not replicate to.
    pub fn validate(&self, datacenter: Option<&str>) -> Result<(), RingError> {
        if self.total() == 0 {
            return Err(RingError::InvalidReplication(
                "replication factor must be at least 1".to_string(),
            ));
        }
        if self.strategy == ReplicationStrategy::NetworkTopologyStrategy {
            if let Some(dc) = datacenter {
                if self.for_datacenter(dc) == 0 {
                    return Err(RingError::InvalidReplication(format!(
                        "datacenter {dc} is not present in the keyspace replication"
                    )));
                }
            }
        }
        Ok(())
    }
}
