use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use super::features::{SchemaFeature, SchemaFeatureKind};
use crate::engine::errors::JobError;
use crate::engine::sidecar::{SnapshotLifecycle, SnapshotRef};
use crate::engine::writer::ConsistencyLevel;

pub const KEYSPACE_KEY: &str = "keyspace";
pub const TABLE_KEY: &str = "table";
pub const SNAPSHOT_NAME_KEY: &str = "snapshotName";
pub const DC_KEY: &str = "dc";
pub const CREATE_SNAPSHOT_KEY: &str = "createSnapshot";
pub const CLEAR_SNAPSHOT_KEY: &str = "clearSnapshot";
pub const DEFAULT_PARALLELISM_KEY: &str = "defaultParallelism";
pub const NUM_CORES_KEY: &str = "numCores";
pub const CONSISTENCY_LEVEL_KEY: &str = "consistencyLevel";
pub const LAST_MODIFIED_COLUMN_NAME_KEY: &str = "lastModifiedColumnName";
pub const SIDECAR_PORT_KEY: &str = "sidecar_port";

pub const DEFAULT_SIDECAR_PORT: u16 = 9043;

/// Options of one read job, parsed from engine-supplied string pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    pub keyspace: String,
    pub table: String,
    pub snapshot_name: String,
    pub datacenter: Option<String>,
    pub create_snapshot: bool,
    pub clear_snapshot: bool,
    pub default_parallelism: usize,
    pub num_cores: usize,
    pub consistency_level: ConsistencyLevel,
    pub sidecar_port: u16,
    pub features: Vec<SchemaFeature>,
}

/// Job-unique snapshot name, `sbr_` followed by 32 hex digits.
pub fn generate_snapshot_name() -> String {
    format!("sbr_{:032x}", rand::random::<u128>())
}

struct OptionMap(HashMap<String, String>);

impl OptionMap {
    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(&key.to_ascii_lowercase())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, JobError> {
        self.get(key)
            .map(str::to_string)
            .ok_or_else(|| invalid(key, "option is required"))
    }

    fn boolean(&self, key: &str, default: bool) -> Result<bool, JobError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
            Some(v) => Err(invalid(key, &format!("expected true or false, got {v}"))),
        }
    }

    fn parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T, JobError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v
                .parse()
                .map_err(|_| invalid(key, &format!("cannot parse {v}"))),
        }
    }

    fn positive(&self, key: &str, default: usize) -> Result<usize, JobError> {
        match self.parsed(key, default)? {
            0 => Err(invalid(key, "must be at least 1")),
            n => Ok(n),
        }
    }
}

fn invalid(key: &str, reason: &str) -> JobError {
    JobError::InvalidOption {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

impl JobOptions {
    /// Keys are matched case-insensitively.
    pub fn from_map(options: &HashMap<String, String>) -> Result<Self, JobError> {
        let lowered: HashMap<String, String> = options
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect();
        let features = SchemaFeature::initialize_from_options(&lowered);
        let map = OptionMap(lowered);

        let create_snapshot = map.boolean(CREATE_SNAPSHOT_KEY, true)?;
        let consistency_level = match map.get(CONSISTENCY_LEVEL_KEY) {
            Some(v) => ConsistencyLevel::from_str(v)
                .map_err(|reason| invalid(CONSISTENCY_LEVEL_KEY, &reason))?,
            None => ConsistencyLevel::LocalQuorum,
        };

        Ok(Self {
            keyspace: map.required(KEYSPACE_KEY)?,
            table: map.required(TABLE_KEY)?,
            snapshot_name: map
                .get(SNAPSHOT_NAME_KEY)
                .map(str::to_string)
                .unwrap_or_else(generate_snapshot_name),
            datacenter: map.get(DC_KEY).map(str::to_string),
            create_snapshot,
            clear_snapshot: map.boolean(CLEAR_SNAPSHOT_KEY, create_snapshot)?,
            default_parallelism: map.positive(DEFAULT_PARALLELISM_KEY, 1)?,
            num_cores: map.positive(NUM_CORES_KEY, 1)?,
            consistency_level,
            sidecar_port: map.parsed(SIDECAR_PORT_KEY, DEFAULT_SIDECAR_PORT)?,
            features,
        })
    }

    pub fn lifecycle(&self) -> SnapshotLifecycle {
        SnapshotLifecycle {
            create_snapshot: self.create_snapshot,
            clear_snapshot: self.clear_snapshot,
        }
    }

    pub fn snapshot(&self) -> SnapshotRef {
        SnapshotRef::new(&self.keyspace, &self.table, &self.snapshot_name)
    }

    pub fn last_modified_column_name(&self) -> Option<&str> {
        self.features
            .iter()
            .find(|f| f.kind == SchemaFeatureKind::LastModifiedTimestamp)
            .and_then(|f| f.alias.as_deref())
    }
}
