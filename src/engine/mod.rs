pub mod bridge;
pub mod catalog;
pub mod cql;
pub mod errors;
pub mod job;
pub mod ring;
pub mod sidecar;
pub mod writer;

pub use errors::*;
