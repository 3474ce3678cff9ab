pub mod config;
pub mod storage_header;
pub mod time;
