use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::engine::ring::RingEntry;

/// Per-node availability observed when the snapshot was created. Orders
/// replica selection for reads; never fails a job on its own.
///
/// Variants are declared in preference order, so sorting by hint puts the
/// most likely reachable replicas first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AvailabilityHint {
    Up,
    Unknown,
    Down,
}

impl AvailabilityHint {
    /// Hint from the ring's status and state columns.
    pub fn from_state(status: &str, state: &str) -> Self {
        if status.eq_ignore_ascii_case("down") {
            return AvailabilityHint::Down;
        }
        if !status.eq_ignore_ascii_case("up") {
            return AvailabilityHint::Unknown;
        }
        match state.to_ascii_lowercase().as_str() {
            "normal" | "starting" | "leaving" | "moving" => AvailabilityHint::Up,
            "joining" => AvailabilityHint::Down,
            _ => AvailabilityHint::Unknown,
        }
    }

    pub fn from_entry(entry: &RingEntry) -> Self {
        Self::from_state(&entry.status, &entry.state)
    }
}

/// Joining and down nodes are neither snapshotted nor read from.
pub fn is_eligible_for_snapshot(entry: &RingEntry) -> bool {
    !entry.state.eq_ignore_ascii_case("joining") && !entry.status.eq_ignore_ascii_case("down")
}

/// Stable sort of replicas by their hint; replicas without a hint rank as
/// `Unknown`.
pub fn order_by_availability<'a>(
    replicas: &[&'a RingEntry],
    hints: &HashMap<String, AvailabilityHint>,
) -> Vec<&'a RingEntry> {
    let mut ordered = replicas.to_vec();
    ordered.sort_by_key(|r| {
        hints
            .get(&r.fqdn)
            .copied()
            .unwrap_or(AvailabilityHint::Unknown)
    });
    ordered
}
