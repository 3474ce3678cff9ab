pub mod encoder;
pub mod registry;
pub mod version;

pub use encoder::{Bridge, EncodedTable, Row, TableEncoder};
pub use registry::BridgeRegistry;
pub use version::CassandraVersion;
