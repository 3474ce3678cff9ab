pub use super::factories::{
    JobFactory, MockBridge, MockSidecarClient, RingFactory, RowFactory,
    WriterContextFactory,
};

pub struct Factory;

impl Factory {
    pub fn ring() -> RingFactory {
        RingFactory::new()
    }

    pub fn rows() -> RowFactory {
        RowFactory::new()
    }

    pub fn job() -> JobFactory {
        JobFactory::new()
    }

    pub fn writer_context() -> WriterContextFactory {
        WriterContextFactory::new()
    }

    pub fn sidecar() -> MockSidecarClient {
        MockSidecarClient::new()
    }

    pub fn bridge() -> MockBridge {
        MockBridge::new()
    }
}
