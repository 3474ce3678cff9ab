use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::consistency::ConsistencyLevel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowBufferMode {
    /// Close a storage table every `sstable_batch_size` rows.
    #[default]
    Unbuffered,
    /// Close a storage table once `sstable_data_size_in_mb` of encoded data
    /// has accumulated.
    Buffered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterOptions {
    #[serde(default = "default_consistency_level")]
    pub consistency_level: ConsistencyLevel,
    #[serde(default)]
    pub local_dc: Option<String>,
    #[serde(default)]
    pub row_buffer_mode: RowBufferMode,
    #[serde(default = "default_sstable_batch_size")]
    pub sstable_batch_size: usize,
    #[serde(default = "default_sstable_data_size_in_mb")]
    pub sstable_data_size_in_mb: u64,
    #[serde(default = "default_allowable_skew_minutes")]
    pub allowable_skew_minutes: i64,
    /// Parent of per-batch staging directories; the system temp dir when unset.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

fn default_consistency_level() -> ConsistencyLevel {
    ConsistencyLevel::LocalQuorum
}

fn default_sstable_batch_size() -> usize {
    1_000_000
}

fn default_sstable_data_size_in_mb() -> u64 {
    160
}

fn default_allowable_skew_minutes() -> i64 {
    60
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            consistency_level: default_consistency_level(),
            local_dc: None,
            row_buffer_mode: RowBufferMode::default(),
            sstable_batch_size: default_sstable_batch_size(),
            sstable_data_size_in_mb: default_sstable_data_size_in_mb(),
            allowable_skew_minutes: default_allowable_skew_minutes(),
            staging_dir: None,
        }
    }
}

impl WriterOptions {
    pub fn max_table_bytes(&self) -> u64 {
        self.sstable_data_size_in_mb.saturating_mul(1024 * 1024)
    }
}
