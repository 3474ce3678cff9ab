pub mod job_factory;
pub mod mock_bridge;
pub mod mock_sidecar_client;
pub mod ring_factory;
pub mod row_factory;
pub mod writer_context_factory;

pub use job_factory::JobFactory;
pub use mock_bridge::MockBridge;
pub use mock_sidecar_client::MockSidecarClient;
pub use ring_factory::RingFactory;
pub use row_factory::RowFactory;
pub use writer_context_factory::WriterContextFactory;

#[cfg(test)]
mod ring_factory_test;
#[cfg(test)]
mod row_factory_test;
