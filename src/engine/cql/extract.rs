//! Pulls the pieces a job needs out of a keyspace's full CQL schema dump.

use regex::Regex;
use std::collections::BTreeMap;

use crate::engine::errors::SchemaError;
use crate::engine::ring::{ReplicationFactor, ReplicationStrategy};

const MAP_ENTRY: &str = r"'([^']*)'\s*:\s*'([^']*)'";

fn ident(name: &str) -> String {
    format!("\"?{}\"?", regex::escape(name))
}

/// Strips identifier quoting from a user supplied table name.
pub fn clean_table_name(name: &str) -> String {
    let trimmed = name.trim();
    match trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => trimmed.to_string(),
    }
}

/// The `CREATE TABLE` statement of `keyspace.table`.
pub fn extract_table_schema(
    schema: &str,
    keyspace: &str,
    table: &str,
) -> Result<String, SchemaError> {
    let pattern = format!(
        r"(?is)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?{}\.{}\s*\(.*?\)\s*(?:WITH[^;]*)?;",
        ident(keyspace),
        ident(table)
    );
    let re = Regex::new(&pattern)?;
    re.find(schema)
        .map(|m| m.as_str().trim().to_string())
        .ok_or_else(|| SchemaError::TableNotFound {
            keyspace: keyspace.to_string(),
            table: table.to_string(),
        })
}

/// Number of secondary indexes declared on `keyspace.table`.
pub fn extract_index_count(schema: &str, keyspace: &str, table: &str) -> Result<usize, SchemaError> {
    let pattern = format!(
        r"(?is)CREATE\s+(?:CUSTOM\s+)?INDEX\s+[^;]*?\s+ON\s+{}\.{}\s*\(",
        ident(keyspace),
        ident(table)
    );
    Ok(Regex::new(&pattern)?.find_iter(schema).count())
}

/// `CREATE TYPE` statements of the keyspace, in declaration order.
pub fn extract_udts(schema: &str, keyspace: &str) -> Result<Vec<String>, SchemaError> {
    let pattern = format!(
        r"(?is)CREATE\s+TYPE\s+(?:IF\s+NOT\s+EXISTS\s+)?{}\.\S+\s*\(.*?\)\s*;",
        ident(keyspace)
    );
    let mut udts: Vec<String> = Vec::new();
    for m in Regex::new(&pattern)?.find_iter(schema) {
        let stmt = m.as_str().trim().to_string();
        if !udts.contains(&stmt) {
            udts.push(stmt);
        }
    }
    Ok(udts)
}

/// Replication settings from the keyspace's `CREATE KEYSPACE` statement.
pub fn extract_replication_factor(
    schema: &str,
    keyspace: &str,
) -> Result<ReplicationFactor, SchemaError> {
    let pattern = format!(
        r"(?is)CREATE\s+KEYSPACE\s+(?:IF\s+NOT\s+EXISTS\s+)?{}\s+WITH\s+replication\s*=\s*\{{([^}}]*)\}}",
        ident(keyspace)
    );
    let re = Regex::new(&pattern)?;
    let body = re
        .captures(schema)
        .and_then(|c| c.get(1))
        .ok_or_else(|| SchemaError::KeyspaceNotFound(keyspace.to_string()))?
        .as_str();

    let invalid = |reason: String| SchemaError::InvalidReplication {
        keyspace: keyspace.to_string(),
        reason,
    };

    let mut class = None;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for cap in Regex::new(MAP_ENTRY)?.captures_iter(body) {
        let (key, value) = (&cap[1], &cap[2]);
        if key == "class" {
            class = Some(value.to_string());
            continue;
        }
        let n = value
            .parse::<usize>()
            .map_err(|_| invalid(format!("replica count {value:?} for {key} is not a number")))?;
        counts.insert(key.to_string(), n);
    }

    let class = class.ok_or_else(|| invalid("missing replication class".to_string()))?;
    match ReplicationStrategy::from_class_name(&class) {
        Some(ReplicationStrategy::SimpleStrategy) => {
            let n = counts
                .get("replication_factor")
                .copied()
                .ok_or_else(|| invalid("SimpleStrategy without replication_factor".to_string()))?;
            Ok(ReplicationFactor::simple(n))
        }
        Some(ReplicationStrategy::NetworkTopologyStrategy) => {
            counts.remove("replication_factor");
            Ok(ReplicationFactor::network_topology(counts))
        }
        None => Err(invalid(format!("unsupported replication class {class}"))),
    }
}
