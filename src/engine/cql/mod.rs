pub mod extract;
pub mod table_schema;

pub use extract::{
    clean_table_name, extract_index_count, extract_replication_factor, extract_table_schema,
    extract_udts,
};
pub use table_schema::TableSchema;
