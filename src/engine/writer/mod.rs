pub mod bulk_writer;
pub mod consistency;
pub mod options;
pub mod replica_uploader;

pub use bulk_writer::{BulkWriter, WriteResult, WriterContext, WriterState};
pub use consistency::ConsistencyLevel;
pub use options::{RowBufferMode, WriterOptions};
pub use replica_uploader::{ReplicaUploader, TableUploadResult, UploadOutcome, UploadStatus};
