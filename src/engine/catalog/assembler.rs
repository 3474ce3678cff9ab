use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::sidecar::FileInfo;

/// Component files that make up one storage table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FileComponent {
    Data,
    PrimaryIndex,
    Filter,
    Statistics,
    Summary,
    CompressionInfo,
    Digest,
    Toc,
    Crc,
    Partitions,
    Rows,
}

impl FileComponent {
    pub const ALL: [FileComponent; 11] = [
        FileComponent::Data,
        FileComponent::PrimaryIndex,
        FileComponent::Filter,
        FileComponent::Statistics,
        FileComponent::Summary,
        FileComponent::CompressionInfo,
        FileComponent::Digest,
        FileComponent::Toc,
        FileComponent::Crc,
        FileComponent::Partitions,
        FileComponent::Rows,
    ];

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.suffix() == suffix)
    }

    pub const fn suffix(self) -> &'static str {
        match self {
            FileComponent::Data => "Data.db",
            FileComponent::PrimaryIndex => "Index.db",
            FileComponent::Filter => "Filter.db",
            FileComponent::Statistics => "Statistics.db",
            FileComponent::Summary => "Summary.db",
            FileComponent::CompressionInfo => "CompressionInfo.db",
            FileComponent::Digest => "Digest.crc32",
            FileComponent::Toc => "TOC.txt",
            FileComponent::Crc => "CRC.db",
            FileComponent::Partitions => "Partitions.db",
            FileComponent::Rows => "Rows.db",
        }
    }

    /// `<base>-<suffix>`, the on-disk name of this component.
    pub fn file_name(self, base_name: &str) -> String {
        format!("{}-{}", base_name, self.suffix())
    }
}

/// All listed components of one storage table, in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTableFileGroup {
    pub base_name: String,
    pub components: IndexMap<FileComponent, FileInfo>,
}

impl StorageTableFileGroup {
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            components: IndexMap::new(),
        }
    }

    pub fn get(&self, component: FileComponent) -> Option<&FileInfo> {
        self.components.get(&component)
    }

    /// Data plus a primary index (`Index.db` or `Partitions.db`).
    pub fn is_complete(&self) -> bool {
        self.components.contains_key(&FileComponent::Data)
            && (self.components.contains_key(&FileComponent::PrimaryIndex)
                || self.components.contains_key(&FileComponent::Partitions))
    }

    pub fn total_size(&self) -> u64 {
        self.components.values().map(|f| f.size).sum()
    }
}

pub struct StorageTableAssembler;

impl StorageTableAssembler {
    /// Groups a flat snapshot listing by storage table. Unknown components
    /// and incomplete tables are dropped.
    pub fn group(files: &[FileInfo]) -> Vec<StorageTableFileGroup> {
        let mut groups: IndexMap<&str, StorageTableFileGroup> = IndexMap::new();
        for file in files {
            let Some((base, suffix)) = file.file_name.rsplit_once('-') else {
                debug!(
                    target: "cass_bulk::catalog",
                    file = %file.file_name,
                    "Skipping file without component separator"
                );
                continue;
            };
            let Some(component) = FileComponent::from_suffix(suffix) else {
                continue;
            };
            groups
                .entry(base)
                .or_insert_with(|| StorageTableFileGroup::new(base))
                .components
                .insert(component, file.clone());
        }

        let total = groups.len();
        let complete: Vec<StorageTableFileGroup> = groups
            .into_values()
            .filter(StorageTableFileGroup::is_complete)
            .collect();
        if complete.len() < total {
            debug!(
                target: "cass_bulk::catalog",
                dropped = total - complete.len(),
                "Dropped storage tables missing mandatory components"
            );
        }
        complete
    }
}
