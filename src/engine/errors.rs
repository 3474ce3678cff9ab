use std::io;
use thiserror::Error;
use tracing::{debug, error};

use crate::engine::ring::{Token, TokenRange};

/// Errors raised while building the ring or splitting it into partitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RingError {
    #[error("Ring is empty")]
    EmptyRing,

    #[error("Ring malformed: {0}")]
    Malformed(String),

    #[error("Unsupported partitioner: {0}")]
    UnsupportedPartitioner(String),

    #[error("Empty token range [{lower}, {upper})")]
    EmptyRange { lower: Token, upper: Token },

    #[error("Cannot split a token space of width {width} into {requested} partitions")]
    TooManyPartitions { width: u128, requested: usize },

    #[error("Unknown partition id {0}")]
    UnknownPartition(usize),

    #[error("Invalid replication factor: {0}")]
    InvalidReplication(String),
}

/// Failures reported by the control-plane transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SidecarError {
    #[error("Transport error against {instance}: {message}")]
    Transport { instance: String, message: String },

    #[error("Request to {instance} timed out after {timeout_ms}ms")]
    Timeout { instance: String, timeout_ms: u64 },

    #[error("Unexpected status {status} from {instance}: {message}")]
    Status {
        instance: String,
        status: u16,
        message: String,
    },

    #[error("Retries exhausted against {instance} after {attempts} attempts: {last}")]
    RetriesExhausted {
        instance: String,
        attempts: u32,
        last: Box<SidecarError>,
    },

    #[error("Malformed response from {instance}: {message}")]
    Malformed { instance: String, message: String },

    #[error("Sidecar client closed")]
    Closed,
}

impl SidecarError {
    /// Transport-class failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            SidecarError::Transport { .. } | SidecarError::Timeout { .. } => true,
            SidecarError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, SidecarError::RetriesExhausted { .. })
    }
}

/// Errors from snapshot listing discovery. Cloneable because a single
/// discovery result is shared by every concurrent caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Incomplete storage-table listing from {instance}: {reason}")]
    IncompleteListing { instance: String, reason: String },

    #[error("Listing snapshot on {instance} failed: {source}")]
    Sidecar {
        instance: String,
        #[source]
        source: SidecarError,
    },
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Keyspace {0} not found in schema")]
    KeyspaceNotFound(String),

    #[error("Table {keyspace}.{table} not found in schema")]
    TableNotFound { keyspace: String, table: String },

    #[error("Invalid replication settings for keyspace {keyspace}: {reason}")]
    InvalidReplication { keyspace: String, reason: String },

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Errors on the bulk write path.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Received token {token} outside of expected range {range}")]
    PlacementViolation { token: Token, range: TokenRange },

    #[error("Received token {token} after {previous}; rows must be sorted by token")]
    OutOfOrder { token: Token, previous: Token },

    #[error(
        "Time skew between local clock and cluster is too large. Allowable skew is {allowable_minutes} minutes. Local time is {local}, cluster time is {remote}"
    )]
    ClockSkewExceeded {
        allowable_minutes: i64,
        local: String,
        remote: String,
    },

    #[error(
        "Consistency level {consistency_level} not met for {table} in range {range}: {succeeded} of {required} required replicas succeeded"
    )]
    QuorumNotMet {
        table: String,
        range: TokenRange,
        consistency_level: String,
        required: usize,
        succeeded: usize,
    },

    #[error("No replicas own range {0}")]
    NoReplicas(TokenRange),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Writer cannot start from state {0}")]
    InvalidState(String),

    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    #[error(transparent)]
    Ring(#[from] RingError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from the versioned job snapshot encoding.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Decoded snapshot is invalid: {0}")]
    Invalid(#[from] RingError),
}

/// Job-level errors. Wrapped causes are transparent so the caller sees the
/// originating failure, not a generic wrapper.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid option {key}: {reason}")]
    InvalidOption { key: String, reason: String },

    #[error("Unsupported cluster version: {0}")]
    UnsupportedVersion(String),

    #[error(
        "Not enough replicas for partition {partition_id} in range {range}: {available} listed, {required} required"
    )]
    NotEnoughReplicas {
        partition_id: usize,
        range: TokenRange,
        required: usize,
        available: usize,
    },

    #[error(transparent)]
    Ring(#[from] RingError),

    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl JobError {
    pub fn log_error(&self) {
        match self {
            JobError::InvalidOption { key, reason } => {
                error!("Invalid job option {}: {}", key, reason);
            }
            JobError::UnsupportedVersion(v) => {
                error!("Unsupported cluster version: {}", v);
            }
            JobError::NotEnoughReplicas {
                partition_id,
                range,
                required,
                available,
            } => {
                error!(
                    "Partition {} listed {} replicas in {}, {} required",
                    partition_id, available, range, required
                );
            }
            JobError::Ring(e) => {
                error!("Ring error: {}", e);
                debug!("Ring error details: {:?}", e);
            }
            JobError::Sidecar(e) => {
                error!("Control-plane error: {}", e);
                debug!("Control-plane error details: {:?}", e);
            }
            JobError::Catalog(e) => {
                error!("Snapshot listing error: {}", e);
                debug!("Snapshot listing error details: {:?}", e);
            }
            JobError::Schema(e) => {
                error!("Schema error: {}", e);
                debug!("Schema error details: {:?}", e);
            }
            JobError::Write(e) => {
                error!("Write error: {}", e);
                debug!("Write error details: {:?}", e);
            }
            JobError::Codec(e) => {
                error!("Job snapshot codec error: {}", e);
                debug!("Job snapshot codec error details: {:?}", e);
            }
        }
    }
}
