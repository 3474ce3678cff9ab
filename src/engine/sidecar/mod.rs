pub mod availability;
pub mod client;
pub mod orchestrator;
pub mod retry;

pub use availability::{AvailabilityHint, is_eligible_for_snapshot, order_by_availability};
pub use client::{
    FileInfo, ListSnapshotFilesResponse, NodeSettings, SchemaResponse, SidecarClient,
    SidecarInstance, SnapshotRef, TimeSkewResponse, UploadRequest,
};
pub use orchestrator::{ClearSummary, SidecarOrchestrator, SnapshotLifecycle};
pub use retry::{RetryPolicy, RetryingSidecarClient};
