use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::version::CassandraVersion;
use crate::engine::catalog::FileComponent;
use crate::engine::cql::TableSchema;
use crate::engine::errors::WriteError;
use crate::engine::ring::Token;

/// One row handed over by the analytics engine: the serialized partition
/// key plus column values in table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub partition_key: Bytes,
    pub columns: Vec<serde_json::Value>,
}

impl Row {
    pub fn new(partition_key: impl Into<Bytes>, columns: Vec<serde_json::Value>) -> Self {
        Self {
            partition_key: partition_key.into(),
            columns,
        }
    }
}

/// A finished, immutable storage table on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTable {
    pub base_name: String,
    pub directory: PathBuf,
    pub components: Vec<(FileComponent, PathBuf)>,
    pub row_count: usize,
}

/// Streams sorted rows into one storage table.
pub trait TableEncoder: Send {
    /// Appends a row and returns the number of encoded bytes it added.
    fn add_row(&mut self, token: Token, row: &Row) -> Result<usize, WriteError>;

    fn finish(self: Box<Self>) -> Result<EncodedTable, WriteError>;
}

/// File-format encoder for one storage generation.
pub trait Bridge: Send + Sync {
    fn version(&self) -> CassandraVersion;

    fn open_encoder(
        &self,
        schema: &TableSchema,
        directory: &Path,
    ) -> Result<Box<dyn TableEncoder>, WriteError>;
}
