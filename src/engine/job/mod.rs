pub mod features;
pub mod job_snapshot;
pub mod options;
pub mod reader;

pub use features::{SchemaFeature, SchemaFeatureKind};
pub use job_snapshot::JobSnapshot;
pub use options::{JobOptions, generate_snapshot_name};
pub use reader::{BulkReaderJob, PartitionListing, ReplicaListing};

#[cfg(test)]
mod options_test;
