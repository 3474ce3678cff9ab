use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::engine::ring::{ReplicationFactor, ReplicationStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    Quorum,
    LocalQuorum,
    EachQuorum,
    All,
    LocalOne,
}

fn quorum(replicas: usize) -> usize {
    replicas / 2 + 1
}

impl ConsistencyLevel {
    pub const fn is_local(self) -> bool {
        matches!(self, ConsistencyLevel::LocalQuorum | ConsistencyLevel::LocalOne)
    }

    /// Replicas that must acknowledge for the level to hold, summed over
    /// every datacenter the level counts.
    pub fn required(self, rf: &ReplicationFactor, local_dc: Option<&str>) -> usize {
        match self {
            ConsistencyLevel::Any | ConsistencyLevel::One | ConsistencyLevel::LocalOne => 1,
            ConsistencyLevel::Two => 2,
            ConsistencyLevel::Three => 3,
            ConsistencyLevel::Quorum => quorum(rf.total()),
            ConsistencyLevel::All => rf.total(),
            ConsistencyLevel::LocalQuorum => quorum(local_replicas(rf, local_dc)),
            ConsistencyLevel::EachQuorum => match rf.strategy() {
                ReplicationStrategy::SimpleStrategy => quorum(rf.total()),
                ReplicationStrategy::NetworkTopologyStrategy => rf
                    .options()
                    .values()
                    .filter(|n| **n > 0)
                    .map(|n| quorum(*n))
                    .sum(),
            },
        }
    }

    /// Whether acknowledgements from replicas in `succeeded` (one datacenter
    /// name per successful replica) satisfy the level.
    pub fn is_satisfied(
        self,
        rf: &ReplicationFactor,
        local_dc: Option<&str>,
        succeeded: &[&str],
    ) -> bool {
        match self {
            ConsistencyLevel::LocalQuorum | ConsistencyLevel::LocalOne => {
                let local = match local_dc {
                    Some(dc) => succeeded
                        .iter()
                        .filter(|s| s.eq_ignore_ascii_case(dc))
                        .count(),
                    None => succeeded.len(),
                };
                local >= self.required(rf, local_dc)
            }
            ConsistencyLevel::EachQuorum
                if rf.strategy() == ReplicationStrategy::NetworkTopologyStrategy =>
            {
                rf.options().iter().filter(|(_, n)| **n > 0).all(|(dc, n)| {
                    let acked = succeeded
                        .iter()
                        .filter(|s| s.eq_ignore_ascii_case(dc))
                        .count();
                    acked >= quorum(*n)
                })
            }
            _ => succeeded.len() >= self.required(rf, local_dc),
        }
    }
}

fn local_replicas(rf: &ReplicationFactor, local_dc: Option<&str>) -> usize {
    match (rf.strategy(), local_dc) {
        (ReplicationStrategy::NetworkTopologyStrategy, Some(dc)) => rf.for_datacenter(dc),
        _ => rf.total(),
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsistencyLevel::Any => "ANY",
            ConsistencyLevel::One => "ONE",
            ConsistencyLevel::Two => "TWO",
            ConsistencyLevel::Three => "THREE",
            ConsistencyLevel::Quorum => "QUORUM",
            ConsistencyLevel::LocalQuorum => "LOCAL_QUORUM",
            ConsistencyLevel::EachQuorum => "EACH_QUORUM",
            ConsistencyLevel::All => "ALL",
            ConsistencyLevel::LocalOne => "LOCAL_ONE",
        };
        f.write_str(name)
    }
}

impl FromStr for ConsistencyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ANY" => Ok(ConsistencyLevel::Any),
            "ONE" => Ok(ConsistencyLevel::One),
            "TWO" => Ok(ConsistencyLevel::Two),
            "THREE" => Ok(ConsistencyLevel::Three),
            "QUORUM" => Ok(ConsistencyLevel::Quorum),
            "LOCAL_QUORUM" => Ok(ConsistencyLevel::LocalQuorum),
            "EACH_QUORUM" => Ok(ConsistencyLevel::EachQuorum),
            "ALL" => Ok(ConsistencyLevel::All),
            "LOCAL_ONE" => Ok(ConsistencyLevel::LocalOne),
            other => Err(format!("unknown consistency level {other}")),
        }
    }
}
