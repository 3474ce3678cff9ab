use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage-format generations a bridge can encode for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CassandraVersion {
    ThreeZero,
    FourZero,
    FourOne,
    FiveZero,
}

impl CassandraVersion {
    /// Maps a release string such as `4.0.11` or `3.11.4-SNAPSHOT` to its
    /// format generation.
    pub fn from_release(release: &str) -> Option<Self> {
        let mut parts = release
            .trim()
            .split(|c: char| c == '.' || c == '-')
            .map(|p| p.parse::<u32>().ok());
        let major = parts.next().flatten()?;
        let minor = parts.next().flatten().unwrap_or(0);
        match (major, minor) {
            (3, _) => Some(CassandraVersion::ThreeZero),
            (4, 0) => Some(CassandraVersion::FourZero),
            (4, _) => Some(CassandraVersion::FourOne),
            (5, _) => Some(CassandraVersion::FiveZero),
            _ => None,
        }
    }
}

impl fmt::Display for CassandraVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CassandraVersion::ThreeZero => "3.0",
            CassandraVersion::FourZero => "4.0",
            CassandraVersion::FourOne => "4.1",
            CassandraVersion::FiveZero => "5.0",
        };
        f.write_str(s)
    }
}
