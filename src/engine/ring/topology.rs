use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::replication::{ReplicationFactor, ReplicationStrategy};
use super::token::{Partitioner, Token, TokenRange};
use crate::engine::errors::RingError;

/// One token of one node as reported by the ring query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RingEntry {
    pub token: Token,
    pub fqdn: String,
    pub address: String,
    pub port: u16,
    pub datacenter: String,
    pub rack: String,
    pub status: String,
    pub state: String,
}

/// A contiguous piece of a range owned by one replica set. Consistency is
/// judged per piece: acknowledgements from another piece's owners do not
/// count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaSet<'a> {
    pub range: TokenRange,
    pub replicas: Vec<&'a RingEntry>,
}

impl ReplicaSet<'_> {
    fn same_owners(&self, replicas: &[&RingEntry]) -> bool {
        self.replicas.len() == replicas.len()
            && replicas
                .iter()
                .all(|r| self.replicas.iter().any(|x| x.fqdn == r.fqdn))
    }
}

/// Immutable view of the ring for one job.
#[derive(Debug, Clone)]
pub struct RingTopology {
    partitioner: Partitioner,
    replication: ReplicationFactor,
    entries: Vec<RingEntry>,
    /// Distinct racks per datacenter.
    racks: HashMap<String, usize>,
    /// Distinct nodes per datacenter.
    nodes: HashMap<String, usize>,
}

impl RingTopology {
    /// Builds the topology from raw ring entries, keeping only `datacenter`
    /// when one is given.
    pub fn new(
        partitioner: Partitioner,
        replication: ReplicationFactor,
        entries: Vec<RingEntry>,
        datacenter: Option<&str>,
    ) -> Result<Self, RingError> {
        let mut entries: Vec<RingEntry> = entries
            .into_iter()
            .filter(|e| datacenter.is_none_or(|dc| e.datacenter.eq_ignore_ascii_case(dc)))
            .collect();
        if entries.is_empty() {
            return Err(RingError::EmptyRing);
        }
        entries.sort_by(|a, b| a.token.cmp(&b.token).then_with(|| a.fqdn.cmp(&b.fqdn)));

        for pair in entries.windows(2) {
            if pair[0].token == pair[1].token {
                return Err(RingError::Malformed(format!(
                    "token {} is claimed by both {} and {}",
                    pair[0].token, pair[0].fqdn, pair[1].fqdn
                )));
            }
        }
        if let Some(e) = entries.iter().find(|e| !partitioner.contains(e.token)) {
            return Err(RingError::Malformed(format!(
                "token {} of {} is outside the {:?} token space",
                e.token, e.fqdn, partitioner
            )));
        }

        let replication = replication.restricted_to(datacenter);
        replication.validate(datacenter)?;

        let mut rack_sets: HashMap<String, HashSet<&str>> = HashMap::new();
        let mut node_sets: HashMap<String, HashSet<&str>> = HashMap::new();
        for e in &entries {
            rack_sets
                .entry(e.datacenter.clone())
                .or_default()
                .insert(e.rack.as_str());
            node_sets
                .entry(e.datacenter.clone())
                .or_default()
                .insert(e.fqdn.as_str());
        }

        if replication.strategy() == ReplicationStrategy::NetworkTopologyStrategy {
            for (dc, rf) in replication.options() {
                if *rf == 0 {
                    continue;
                }
                match node_sets.get(dc) {
                    None => {
                        return Err(RingError::Malformed(format!(
                            "replication requires {rf} replicas in {dc} but the ring has no nodes there"
                        )));
                    }
                    Some(nodes) if nodes.len() < *rf => {
                        warn!(
                            target: "cass_bulk::ring",
                            datacenter = %dc,
                            nodes = nodes.len(),
                            replication_factor = rf,
                            "Datacenter has fewer nodes than its replication factor"
                        );
                    }
                    Some(_) => {}
                }
            }
        }

        let racks = rack_sets.into_iter().map(|(k, v)| (k, v.len())).collect();
        let nodes = node_sets.into_iter().map(|(k, v)| (k, v.len())).collect();

        debug!(
            target: "cass_bulk::ring",
            entries = entries.len(),
            replication_factor = replication.total(),
            "Ring topology built"
        );

        Ok(Self {
            partitioner,
            replication,
            entries,
            racks,
            nodes,
        })
    }

    pub fn partitioner(&self) -> Partitioner {
        self.partitioner
    }

    pub fn replication(&self) -> &ReplicationFactor {
        &self.replication
    }

    pub fn entries(&self) -> &[RingEntry] {
        &self.entries
    }

    pub fn tokens(&self) -> impl Iterator<Item = Token> + '_ {
        self.entries.iter().map(|e| e.token)
    }

    /// One entry per node, in ring order of each node's first token.
    pub fn instances(&self) -> Vec<&RingEntry> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| seen.insert(e.fqdn.as_str()))
            .collect()
    }

    /// Owning replicas of `token`, primary first.
    pub fn replicas(&self, token: Token) -> Vec<&RingEntry> {
        let start = self.entries.partition_point(|e| e.token < token);
        let start = if start == self.entries.len() { 0 } else { start };
        match self.replication.strategy() {
            ReplicationStrategy::SimpleStrategy => self.simple_replicas(start),
            ReplicationStrategy::NetworkTopologyStrategy => self.network_replicas(start),
        }
    }

    fn revolution(&self, start: usize) -> impl Iterator<Item = &RingEntry> {
        let n = self.entries.len();
        (0..n).map(move |i| &self.entries[(start + i) % n])
    }

    fn simple_replicas(&self, start: usize) -> Vec<&RingEntry> {
        let wanted = self.replication.total();
        let mut replicas: Vec<&RingEntry> = Vec::with_capacity(wanted);
        for e in self.revolution(start) {
            if replicas.len() == wanted {
                break;
            }
            if !replicas.iter().any(|r| r.fqdn == e.fqdn) {
                replicas.push(e);
            }
        }
        replicas
    }

    /// Per-datacenter walk preferring unseen racks; endpoints on already
    /// used racks are held back and only taken once every rack of the
    /// datacenter has a replica.
    fn network_replicas(&self, start: usize) -> Vec<&RingEntry> {
        let wanted: HashMap<&str, usize> = self
            .replication
            .options()
            .iter()
            .filter(|(_, rf)| **rf > 0)
            .map(|(dc, rf)| {
                let available = self.nodes.get(dc).copied().unwrap_or(0);
                (dc.as_str(), (*rf).min(available))
            })
            .collect();
        let total_wanted: usize = wanted.values().sum();

        let mut replicas: Vec<&RingEntry> = Vec::with_capacity(total_wanted);
        let mut taken: HashMap<&str, usize> = HashMap::new();
        let mut seen_racks: HashMap<&str, HashSet<&str>> = HashMap::new();
        let mut skipped: HashMap<&str, Vec<&RingEntry>> = HashMap::new();

        for e in self.revolution(start) {
            if replicas.len() == total_wanted {
                break;
            }
            let dc = e.datacenter.as_str();
            let Some(&needed) = wanted.get(dc) else {
                continue;
            };
            let count = taken.entry(dc).or_insert(0);
            if *count >= needed || replicas.iter().any(|r| r.fqdn == e.fqdn) {
                continue;
            }

            let racks_in_dc = self.racks.get(dc).copied().unwrap_or(1);
            let seen = seen_racks.entry(dc).or_default();
            if seen.len() >= racks_in_dc {
                replicas.push(e);
                *count += 1;
            } else if seen.contains(e.rack.as_str()) {
                let held = skipped.entry(dc).or_default();
                if !held.iter().any(|h| h.fqdn == e.fqdn) {
                    held.push(e);
                }
            } else {
                seen.insert(e.rack.as_str());
                replicas.push(e);
                *count += 1;
                if seen.len() == racks_in_dc {
                    for held in skipped.remove(dc).unwrap_or_default() {
                        if *count >= needed {
                            break;
                        }
                        if !replicas.iter().any(|r| r.fqdn == held.fqdn) {
                            replicas.push(held);
                            *count += 1;
                        }
                    }
                }
            }
        }
        replicas
    }

    /// Ring-aligned pieces of the full token space. Each piece is owned by a
    /// single replica set.
    pub fn segments(&self) -> Vec<TokenRange> {
        let full = self.partitioner.full_range();
        let mut segments = Vec::with_capacity(self.entries.len() + 1);
        let mut lower = full.lower();
        for e in &self.entries {
            let boundary = Token(e.token.0 + 1);
            if let Ok(range) = TokenRange::new(lower, boundary) {
                segments.push(range);
            }
            lower = boundary;
        }
        if let Ok(range) = TokenRange::new(lower, full.upper()) {
            segments.push(range);
        }
        segments
    }

    /// Splits `range` at ring boundaries into pieces with a constant replica
    /// set, merging neighbours that share the same owners.
    pub fn replica_sets_for_range(&self, range: &TokenRange) -> Vec<ReplicaSet<'_>> {
        let mut sets: Vec<ReplicaSet<'_>> = Vec::new();
        for segment in self.segments() {
            let Some(piece) = segment.intersection(range) else {
                continue;
            };
            let replicas = self.replicas(segment.lower());
            match sets.last_mut() {
                Some(last) if last.range.upper() == piece.lower() && last.same_owners(&replicas) => {
                    last.range = TokenRange::new(last.range.lower(), piece.upper())
                        .unwrap_or(last.range);
                }
                _ => sets.push(ReplicaSet {
                    range: piece,
                    replicas,
                }),
            }
        }
        sets
    }

    /// Union of the replicas of every segment `range` touches, in order of
    /// first appearance.
    pub fn replicas_for_range(&self, range: &TokenRange) -> Vec<&RingEntry> {
        let mut replicas: Vec<&RingEntry> = Vec::new();
        for segment in self.segments().iter().filter(|s| s.intersects(range)) {
            for r in self.replicas(segment.lower()) {
                if !replicas.iter().any(|x| x.fqdn == r.fqdn) {
                    replicas.push(r);
                }
            }
        }
        replicas
    }
}
