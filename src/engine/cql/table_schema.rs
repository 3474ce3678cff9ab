use serde::{Deserialize, Serialize};
use tracing::info;

use super::extract::{
    extract_index_count, extract_replication_factor, extract_table_schema, extract_udts,
};
use crate::engine::errors::SchemaError;
use crate::engine::ring::ReplicationFactor;

/// Everything the encoder needs to know about the target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub keyspace: String,
    pub table: String,
    pub create_statement: String,
    pub replication: ReplicationFactor,
    pub index_count: usize,
    pub udts: Vec<String>,
}

impl TableSchema {
    pub fn from_full_schema(
        full_schema: &str,
        keyspace: &str,
        table: &str,
    ) -> Result<Self, SchemaError> {
        let replication = extract_replication_factor(full_schema, keyspace)?;
        let create_statement = extract_table_schema(full_schema, keyspace, table)?;
        let index_count = extract_index_count(full_schema, keyspace, table)?;
        let udts = extract_udts(full_schema, keyspace)?;
        for udt in &udts {
            info!(target: "cass_bulk::job", udt = %udt, "Adding schema UDT");
        }
        Ok(Self {
            keyspace: keyspace.to_string(),
            table: table.to_string(),
            create_statement,
            replication,
            index_count,
            udts,
        })
    }
}
