use std::collections::HashMap;

use crate::engine::errors::JobError;
use crate::engine::job::{JobOptions, SchemaFeatureKind, generate_snapshot_name};
use crate::engine::writer::ConsistencyLevel;

fn options(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = [("keyspace", "ks"), ("table", "users")]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    for (k, v) in pairs {
        map.insert(k.to_string(), v.to_string());
    }
    map
}

fn invalid_key(err: JobError) -> String {
    match err {
        JobError::InvalidOption { key, .. } => key,
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn defaults_apply_when_only_table_is_given() {
    let opts = JobOptions::from_map(&options(&[])).unwrap();

    assert_eq!(opts.keyspace, "ks");
    assert_eq!(opts.table, "users");
    assert!(opts.snapshot_name.starts_with("sbr_"));
    assert!(opts.create_snapshot);
    assert!(opts.clear_snapshot);
    assert_eq!(opts.default_parallelism, 1);
    assert_eq!(opts.num_cores, 1);
    assert_eq!(opts.consistency_level, ConsistencyLevel::LocalQuorum);
    assert_eq!(opts.sidecar_port, 9043);
    assert_eq!(opts.datacenter, None);
    assert!(opts.features.is_empty());
}

#[test]
fn generated_snapshot_names_are_unique_hex() {
    let a = generate_snapshot_name();
    let b = generate_snapshot_name();
    assert_ne!(a, b);
    assert_eq!(a.len(), 4 + 32);
    assert!(a[4..].chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn keys_are_case_insensitive() {
    let opts = JobOptions::from_map(&options(&[
        ("SNAPSHOTNAME", "nightly"),
        ("Dc", "DC2"),
        ("defaultparallelism", "16"),
        ("NumCores", "4"),
        ("CONSISTENCYLEVEL", "quorum"),
        ("Sidecar_Port", "19043"),
    ]))
    .unwrap();

    assert_eq!(opts.snapshot_name, "nightly");
    assert_eq!(opts.datacenter.as_deref(), Some("DC2"));
    assert_eq!(opts.default_parallelism, 16);
    assert_eq!(opts.num_cores, 4);
    assert_eq!(opts.consistency_level, ConsistencyLevel::Quorum);
    assert_eq!(opts.sidecar_port, 19043);
}

#[test]
fn clear_snapshot_follows_create_snapshot_unless_set() {
    let opts = JobOptions::from_map(&options(&[("createSnapshot", "false")])).unwrap();
    assert!(!opts.create_snapshot);
    assert!(!opts.clear_snapshot);

    let opts = JobOptions::from_map(&options(&[
        ("createSnapshot", "false"),
        ("clearSnapshot", "true"),
    ]))
    .unwrap();
    assert!(opts.clear_snapshot);
    assert!(opts.lifecycle().clear_snapshot);
    assert!(!opts.lifecycle().create_snapshot);
}

#[test]
fn missing_table_is_rejected() {
    let mut map = options(&[]);
    map.remove("table");
    assert_eq!(invalid_key(JobOptions::from_map(&map).unwrap_err()), "table");
}

#[test]
fn malformed_values_are_rejected() {
    let err = JobOptions::from_map(&options(&[("createSnapshot", "yes")])).unwrap_err();
    assert_eq!(invalid_key(err), "createSnapshot");

    let err = JobOptions::from_map(&options(&[("numCores", "0")])).unwrap_err();
    assert_eq!(invalid_key(err), "numCores");

    let err = JobOptions::from_map(&options(&[("defaultParallelism", "many")])).unwrap_err();
    assert_eq!(invalid_key(err), "defaultParallelism");

    let err = JobOptions::from_map(&options(&[("consistencyLevel", "SERIAL")])).unwrap_err();
    assert_eq!(invalid_key(err), "consistencyLevel");
}

#[test]
fn last_modified_column_name_adds_aliased_feature() {
    let opts = JobOptions::from_map(&options(&[("lastModifiedColumnName", "modified_at")])).unwrap();

    assert_eq!(opts.last_modified_column_name(), Some("modified_at"));
    assert_eq!(opts.features.len(), 1);
    assert_eq!(opts.features[0].kind, SchemaFeatureKind::LastModifiedTimestamp);
    assert_eq!(opts.features[0].field_name(), "modified_at");
}

#[test]
fn snapshot_ref_uses_keyspace_table_and_name() {
    let opts = JobOptions::from_map(&options(&[("snapshotName", "snap")])).unwrap();
    assert_eq!(opts.snapshot().to_string(), "ks.users@snap");
}
