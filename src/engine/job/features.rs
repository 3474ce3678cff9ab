use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Extra columns a reader can append to every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaFeatureKind {
    LastModifiedTimestamp,
    UpdatedFieldsIndicator,
    UpdateFlag,
    CellDeletionInComplex,
    RangeDeletion,
    Ttl,
}

impl SchemaFeatureKind {
    pub const ALL: [SchemaFeatureKind; 6] = [
        SchemaFeatureKind::LastModifiedTimestamp,
        SchemaFeatureKind::UpdatedFieldsIndicator,
        SchemaFeatureKind::UpdateFlag,
        SchemaFeatureKind::CellDeletionInComplex,
        SchemaFeatureKind::RangeDeletion,
        SchemaFeatureKind::Ttl,
    ];

    /// Column name used when no alias is requested.
    pub const fn default_field_name(self) -> &'static str {
        match self {
            SchemaFeatureKind::LastModifiedTimestamp => "last_modified_timestamp",
            SchemaFeatureKind::UpdatedFieldsIndicator => "updated_fields_indicator",
            SchemaFeatureKind::UpdateFlag => "update_flag",
            SchemaFeatureKind::CellDeletionInComplex => "cell_deletion_in_complex",
            SchemaFeatureKind::RangeDeletion => "range_deletion",
            SchemaFeatureKind::Ttl => "ttl",
        }
    }

    /// Boolean job option enabling the feature, e.g. `addTtlColumn`.
    pub fn option_name(self) -> String {
        let camel: String = self
            .default_field_name()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect();
        format!("add{camel}Column")
    }
}

impl fmt::Display for SchemaFeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_field_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFeature {
    pub kind: SchemaFeatureKind,
    pub alias: Option<String>,
}

impl SchemaFeature {
    pub fn new(kind: SchemaFeatureKind) -> Self {
        Self { kind, alias: None }
    }

    pub fn aliased(kind: SchemaFeatureKind, alias: impl Into<String>) -> Self {
        Self {
            kind,
            alias: Some(alias.into()),
        }
    }

    pub fn field_name(&self) -> &str {
        self.alias
            .as_deref()
            .unwrap_or_else(|| self.kind.default_field_name())
    }

    /// Features switched on in `options`, whose keys are already lower-cased.
    /// A `lastmodifiedcolumnname` option enables the last-modified feature
    /// under that column name.
    pub fn initialize_from_options(options: &HashMap<String, String>) -> Vec<SchemaFeature> {
        let last_modified_alias = options
            .get("lastmodifiedcolumnname")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty());

        SchemaFeatureKind::ALL
            .iter()
            .filter_map(|kind| {
                let enabled = options
                    .get(&kind.option_name().to_ascii_lowercase())
                    .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
                match (kind, last_modified_alias) {
                    (SchemaFeatureKind::LastModifiedTimestamp, Some(alias)) => {
                        Some(SchemaFeature::aliased(*kind, alias))
                    }
                    _ if enabled => Some(SchemaFeature::new(*kind)),
                    _ => None,
                }
            })
            .collect()
    }
}
