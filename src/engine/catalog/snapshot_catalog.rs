use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::assembler::{StorageTableAssembler, StorageTableFileGroup};
use crate::engine::errors::CatalogError;
use crate::engine::sidecar::{SidecarClient, SidecarInstance, SnapshotRef};
use crate::shared::config::CatalogConfig;

pub const DEFAULT_MAX_ENTRIES: usize = 128;
pub const DEFAULT_EXPIRE_AFTER_ACCESS: Duration = Duration::from_secs(15 * 60);

pub type StorageTables = Arc<Vec<StorageTableFileGroup>>;
type Listing = Shared<BoxFuture<'static, Result<StorageTables, CatalogError>>>;

/// One snapshot on one node. The token range is not part of the key: a
/// listing covers the whole node regardless of which range asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogKey {
    pub datacenter: Option<String>,
    pub hostname: String,
    pub port: u16,
    pub keyspace: String,
    pub table: String,
    pub snapshot_name: String,
}

impl CatalogKey {
    pub fn new(datacenter: Option<&str>, instance: &SidecarInstance, snapshot: &SnapshotRef) -> Self {
        Self {
            datacenter: datacenter.map(str::to_string),
            hostname: instance.hostname.clone(),
            port: instance.port,
            keyspace: snapshot.keyspace.clone(),
            table: snapshot.table.clone(),
            snapshot_name: snapshot.snapshot_name.clone(),
        }
    }

    pub fn instance(&self) -> SidecarInstance {
        SidecarInstance::new(self.hostname.clone(), self.port)
    }

    pub fn snapshot(&self) -> SnapshotRef {
        SnapshotRef::new(&self.keyspace, &self.table, &self.snapshot_name)
    }
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}/{}",
            self.datacenter.as_deref().unwrap_or("null"),
            self.hostname,
            self.port,
            self.keyspace,
            self.table,
            self.snapshot_name
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotCatalogStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

struct CatalogEntry {
    listing: Listing,
    last_access: Instant,
}

/// Single-flight cache of snapshot listings. Concurrent callers for a key
/// share one discovery; resolved failures are dropped on the next lookup.
pub struct SnapshotCatalog {
    client: Arc<dyn SidecarClient>,
    expire_after_access: Duration,
    entries: Mutex<LruCache<CatalogKey, CatalogEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl SnapshotCatalog {
    pub fn new(
        client: Arc<dyn SidecarClient>,
        max_entries: usize,
        expire_after_access: Duration,
    ) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            client,
            expire_after_access,
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn with_defaults(client: Arc<dyn SidecarClient>) -> Self {
        Self::new(client, DEFAULT_MAX_ENTRIES, DEFAULT_EXPIRE_AFTER_ACCESS)
    }

    pub fn from_config(client: Arc<dyn SidecarClient>, cfg: &CatalogConfig) -> Self {
        Self::new(
            client,
            cfg.max_entries,
            Duration::from_secs(cfg.expire_after_access_secs),
        )
    }

    /// Storage tables of the snapshot on one node.
    pub async fn list(&self, key: &CatalogKey) -> Result<StorageTables, CatalogError> {
        let (listing, outcome) = self.lookup(key);
        debug!(
            target: "cass_bulk::catalog",
            key = %key,
            outcome = ?outcome,
            "Snapshot listing requested"
        );
        let result = listing.await;
        if let Err(e) = &result {
            warn!(
                target: "cass_bulk::catalog",
                key = %key,
                error = %e,
                "Snapshot listing failed"
            );
        }
        result
    }

    fn lookup(&self, key: &CatalogKey) -> (Listing, CacheOutcome) {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get_mut(key) {
            let expired = now.duration_since(entry.last_access) > self.expire_after_access;
            let failed = matches!(entry.listing.peek(), Some(Err(_)));
            if !expired && !failed {
                entry.last_access = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                return (entry.listing.clone(), CacheOutcome::Hit);
            }
            if expired {
                self.expirations.fetch_add(1, Ordering::Relaxed);
            }
            entries.pop(key);
        }

        let listing = self.discover(key.clone());
        let will_evict = entries.len() == entries.cap().get();
        entries.put(
            key.clone(),
            CatalogEntry {
                listing: listing.clone(),
                last_access: now,
            },
        );
        if will_evict {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        (listing, CacheOutcome::Miss)
    }

    fn discover(&self, key: CatalogKey) -> Listing {
        let client = Arc::clone(&self.client);
        async move {
            let instance = key.instance();
            let snapshot = key.snapshot();
            let response = client
                .list_snapshot_files(&instance, &snapshot)
                .await
                .map_err(|source| CatalogError::Sidecar {
                    instance: instance.to_string(),
                    source,
                })?;
            let files = match response {
                None => {
                    return Err(CatalogError::IncompleteListing {
                        instance: instance.to_string(),
                        reason: "no response body".to_string(),
                    });
                }
                Some(r) => r.snapshot_files_info.ok_or_else(|| {
                    CatalogError::IncompleteListing {
                        instance: instance.to_string(),
                        reason: "response has no file list".to_string(),
                    }
                })?,
            };
            let groups = StorageTableAssembler::group(&files);
            debug!(
                target: "cass_bulk::catalog",
                %instance,
                files = files.len(),
                tables = groups.len(),
                "Snapshot listing assembled"
            );
            Ok(Arc::new(groups))
        }
        .boxed()
        .shared()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn invalidate(&self, key: &CatalogKey) {
        self.entries.lock().pop(key);
    }

    pub fn stats(&self) -> SnapshotCatalogStats {
        SnapshotCatalogStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}
