use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::encoder::Bridge;
use super::version::CassandraVersion;

/// Bridges keyed by storage generation. A cluster on a generation with no
/// registered bridge falls back to the nearest older one.
#[derive(Default, Clone)]
pub struct BridgeRegistry {
    bridges: BTreeMap<CassandraVersion, Arc<dyn Bridge>>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, bridge: Arc<dyn Bridge>) {
        self.bridges.insert(bridge.version(), bridge);
    }

    pub fn with(mut self, bridge: Arc<dyn Bridge>) -> Self {
        self.register(bridge);
        self
    }

    pub fn get(&self, version: CassandraVersion) -> Option<Arc<dyn Bridge>> {
        let (found, bridge) = self.bridges.range(..=version).next_back()?;
        if *found != version {
            debug!(
                target: "cass_bulk::job",
                requested = %version,
                using = %found,
                "Falling back to older bridge"
            );
        }
        Some(Arc::clone(bridge))
    }

    pub fn for_release(&self, release: &str) -> Option<Arc<dyn Bridge>> {
        self.get(CassandraVersion::from_release(release)?)
    }

    pub fn versions(&self) -> Vec<CassandraVersion> {
        self.bridges.keys().copied().collect()
    }
}
