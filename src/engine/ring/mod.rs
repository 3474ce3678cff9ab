pub mod murmur3;
pub mod partitioner;
pub mod replication;
pub mod token;
pub mod topology;

pub use partitioner::TokenPartitioner;
pub use replication::{ReplicationFactor, ReplicationStrategy};
pub use token::{Partitioner, Token, TokenRange};
pub use topology::{ReplicaSet, RingEntry, RingTopology};

#[cfg(test)]
mod murmur3_test;
#[cfg(test)]
mod token_test;
