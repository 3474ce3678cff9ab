use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::engine::bridge::{Bridge, CassandraVersion, EncodedTable, Row, TableEncoder};
use crate::engine::catalog::FileComponent;
use crate::engine::cql::TableSchema;
use crate::engine::errors::WriteError;
use crate::engine::ring::Token;

/// Components written for every table, eight in total.
pub const MOCK_COMPONENTS: [FileComponent; 8] = [
    FileComponent::Data,
    FileComponent::PrimaryIndex,
    FileComponent::Filter,
    FileComponent::Statistics,
    FileComponent::Summary,
    FileComponent::CompressionInfo,
    FileComponent::Digest,
    FileComponent::Toc,
];

/// Writes one small file per component; the data file holds the encoded rows.
pub struct MockBridge {
    version: CassandraVersion,
    bytes_per_row: Option<usize>,
    fail_on_row: Option<usize>,
    opened: Arc<AtomicUsize>,
}

impl MockBridge {
    pub fn new() -> Self {
        Self {
            version: CassandraVersion::FourZero,
            bytes_per_row: None,
            fail_on_row: None,
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_version(mut self, version: CassandraVersion) -> Self {
        self.version = version;
        self
    }

    /// Reports a fixed encoded size per row instead of the real one.
    pub fn with_bytes_per_row(mut self, bytes: usize) -> Self {
        self.bytes_per_row = Some(bytes);
        self
    }

    /// Fails when the `n`th row (zero based) of an encoder is appended.
    pub fn failing_on_row(mut self, n: usize) -> Self {
        self.fail_on_row = Some(n);
        self
    }

    pub fn encoders_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Bridge for MockBridge {
    fn version(&self) -> CassandraVersion {
        self.version
    }

    fn open_encoder(
        &self,
        _schema: &TableSchema,
        directory: &Path,
    ) -> Result<Box<dyn TableEncoder>, WriteError> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(MockTableEncoder {
            base_name: format!("nb-{n}-big"),
            directory: directory.to_path_buf(),
            data: Vec::new(),
            rows: 0,
            bytes_per_row: self.bytes_per_row,
            fail_on_row: self.fail_on_row,
        }))
    }
}

pub struct MockTableEncoder {
    base_name: String,
    directory: PathBuf,
    data: Vec<u8>,
    rows: usize,
    bytes_per_row: Option<usize>,
    fail_on_row: Option<usize>,
}

impl TableEncoder for MockTableEncoder {
    fn add_row(&mut self, token: Token, row: &Row) -> Result<usize, WriteError> {
        if self.fail_on_row == Some(self.rows) {
            return Err(WriteError::Encode(format!("cannot encode row {}", self.rows)));
        }
        let before = self.data.len();
        self.data.extend_from_slice(&token.value().to_be_bytes());
        self.data.extend_from_slice(&row.partition_key);
        let values = serde_json::to_vec(&row.columns)
            .map_err(|e| WriteError::Encode(e.to_string()))?;
        self.data.extend_from_slice(&values);
        self.rows += 1;
        Ok(self.bytes_per_row.unwrap_or(self.data.len() - before))
    }

    fn finish(self: Box<Self>) -> Result<EncodedTable, WriteError> {
        let mut components = Vec::with_capacity(MOCK_COMPONENTS.len());
        for component in MOCK_COMPONENTS {
            let path = self.directory.join(component.file_name(&self.base_name));
            let contents: &[u8] = match component {
                FileComponent::Data => &self.data,
                _ => component.suffix().as_bytes(),
            };
            fs::write(&path, contents)?;
            components.push((component, path));
        }
        Ok(EncodedTable {
            base_name: self.base_name,
            directory: self.directory,
            components,
            row_count: self.rows,
        })
    }
}
