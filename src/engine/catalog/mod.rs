pub mod assembler;
pub mod snapshot_catalog;

pub use assembler::{FileComponent, StorageTableAssembler, StorageTableFileGroup};
pub use snapshot_catalog::{
    CacheOutcome, CatalogKey, SnapshotCatalog, SnapshotCatalogStats, StorageTables,
};
