use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Cursor;
use tracing::debug;

use super::options::JobOptions;
use crate::engine::bridge::CassandraVersion;
use crate::engine::cql::TableSchema;
use crate::engine::errors::CodecError;
use crate::engine::ring::{
    Partitioner, ReplicationFactor, RingEntry, RingTopology, TokenPartitioner, TokenRange,
};
use crate::engine::sidecar::AvailabilityHint;
use crate::shared::storage_header::{BinaryHeader, MagicFile};

/// Everything a worker needs to serve partitions without talking to the
/// cluster again: options, ring, partitioning, hints and schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub options: JobOptions,
    pub version: CassandraVersion,
    pub partitioner: Partitioner,
    pub replication: ReplicationFactor,
    pub ring: Vec<RingEntry>,
    pub ranges: Vec<TokenRange>,
    pub hints: BTreeMap<String, AvailabilityHint>,
    pub schema: TableSchema,
}

impl MagicFile for JobSnapshot {
    const MAGIC: [u8; 8] = *b"CBLKJOB\0";
    const VERSION: u16 = 1;
}

impl JobSnapshot {
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let payload = bincode::serialize(self)?;
        let mut out = Vec::with_capacity(payload.len() + 32);
        Self::write_framed(&mut out, &payload)?;
        Ok(out)
    }

    /// Decodes a snapshot written by this or a newer version; bytes a newer
    /// writer appended after the payload are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let (header, payload) = Self::read_framed(&mut Cursor::new(bytes))?;
        let snapshot: JobSnapshot = bincode::deserialize(&payload)?;
        snapshot.partitioner()?;
        debug!(
            target: "cass_bulk::job",
            version = header.version,
            trailing = bytes
                .len()
                .saturating_sub(BinaryHeader::TOTAL_LEN + 8 + payload.len()),
            partitions = snapshot.ranges.len(),
            "Job snapshot decoded"
        );
        Ok(snapshot)
    }

    pub fn partitioner(&self) -> Result<TokenPartitioner, CodecError> {
        Ok(TokenPartitioner::from_ranges(
            self.partitioner.full_range(),
            self.ranges.clone(),
        )?)
    }

    pub fn topology(&self) -> Result<RingTopology, CodecError> {
        Ok(RingTopology::new(
            self.partitioner,
            self.replication.clone(),
            self.ring.clone(),
            self.options.datacenter.as_deref(),
        )?)
    }
}
