use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::info;

use super::token::{Token, TokenRange};
use super::topology::{RingEntry, RingTopology};
use crate::engine::errors::RingError;

/// Splits the full token space into ordered, disjoint, ring-aligned ranges.
/// Identical inputs always yield identical ranges, so a failed task can be
/// re-executed against the same range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPartitioner {
    ranges: Vec<TokenRange>,
}

impl TokenPartitioner {
    pub fn new(
        ring: &RingTopology,
        requested_parallelism: usize,
        effective_cores: usize,
    ) -> Result<Self, RingError> {
        let count = requested_parallelism.max(effective_cores).max(1);
        let full = ring.partitioner().full_range();
        if (count as u128) > full.width() {
            return Err(RingError::TooManyPartitions {
                width: full.width(),
                requested: count,
            });
        }

        let segments = ring.segments();
        let ranges = if count >= segments.len() {
            split_segments(&segments, count)
        } else {
            group_segments(&segments, count)?
        };

        info!(
            target: "cass_bulk::ring",
            partitions = ranges.len(),
            segments = segments.len(),
            requested_parallelism,
            effective_cores,
            "Token space partitioned"
        );

        Ok(Self { ranges })
    }

    /// Rebuilds a partitioner from previously computed ranges, checking that
    /// they still tile `full` without gaps or empty ranges.
    pub fn from_ranges(full: TokenRange, ranges: Vec<TokenRange>) -> Result<Self, RingError> {
        let mut expected = full.lower();
        for r in &ranges {
            if r.lower() != expected {
                return Err(RingError::Malformed(format!(
                    "partition ranges are not contiguous at {}",
                    r.lower()
                )));
            }
            TokenRange::new(r.lower(), r.upper())?;
            expected = r.upper();
        }
        if ranges.is_empty() || expected != full.upper() {
            return Err(RingError::Malformed(
                "partition ranges do not cover the full ring".to_string(),
            ));
        }
        Ok(Self { ranges })
    }

    pub fn num_partitions(&self) -> usize {
        self.ranges.len()
    }

    pub fn ranges(&self) -> &[TokenRange] {
        &self.ranges
    }

    pub fn token_range(&self, partition_id: usize) -> Result<TokenRange, RingError> {
        self.ranges
            .get(partition_id)
            .copied()
            .ok_or(RingError::UnknownPartition(partition_id))
    }

    pub fn partition_for_token(&self, token: Token) -> Option<usize> {
        let idx = self.ranges.partition_point(|r| r.upper() <= token);
        self.ranges
            .get(idx)
            .filter(|r| r.contains(token))
            .map(|_| idx)
    }

    pub fn replicas_for_partition<'a>(
        &self,
        ring: &'a RingTopology,
        partition_id: usize,
    ) -> Result<Vec<&'a RingEntry>, RingError> {
        let range = self.token_range(partition_id)?;
        Ok(ring.replicas_for_range(&range))
    }
}

/// At least one partition per segment; the remainder goes one at a time to
/// the segment whose pieces are currently widest (lowest index on ties).
fn split_segments(segments: &[TokenRange], count: usize) -> Vec<TokenRange> {
    let mut pieces = vec![1u128; segments.len()];
    let mut heap: BinaryHeap<(u128, Reverse<usize>)> = segments
        .iter()
        .enumerate()
        .filter(|(_, s)| s.width() > 1)
        .map(|(i, s)| (s.width(), Reverse(i)))
        .collect();

    let mut remaining = count - segments.len();
    while remaining > 0 {
        let Some((_, Reverse(i))) = heap.pop() else {
            break;
        };
        pieces[i] += 1;
        remaining -= 1;
        if pieces[i] < segments[i].width() {
            heap.push((segments[i].width() / pieces[i], Reverse(i)));
        }
    }

    let mut ranges = Vec::with_capacity(count);
    for (segment, n) in segments.iter().zip(pieces) {
        let mut lower = segment.lower();
        for k in 1..=n {
            let upper = if k == n {
                segment.upper()
            } else {
                segment.offset(k, n)
            };
            // widths >= n guarantee strictly increasing bounds
            if let Ok(range) = TokenRange::new(lower, upper) {
                ranges.push(range);
                lower = upper;
            }
        }
    }
    ranges
}

/// Fewer partitions than segments: pick `count - 1` ring boundaries closest
/// to the equal-width targets, leaving room for every later pick.
fn group_segments(segments: &[TokenRange], count: usize) -> Result<Vec<TokenRange>, RingError> {
    let full = TokenRange::new(
        segments[0].lower(),
        segments[segments.len() - 1].upper(),
    )?;
    let candidates: Vec<Token> = segments[1..].iter().map(|s| s.lower()).collect();

    let mut bounds = Vec::with_capacity(count + 1);
    bounds.push(full.lower());
    let mut next_allowed = 0usize;
    for j in 1..count {
        let target = full.offset(j as u128, count as u128);
        let last_allowed = candidates.len() - (count - j);
        let window = &candidates[next_allowed..=last_allowed];
        let pos = window.partition_point(|c| *c < target);
        let pick = if pos == 0 {
            0
        } else if pos == window.len() {
            window.len() - 1
        } else {
            let below = target.0.wrapping_sub(window[pos - 1].0) as u128;
            let above = window[pos].0.wrapping_sub(target.0) as u128;
            if below <= above { pos - 1 } else { pos }
        };
        bounds.push(window[pick]);
        next_allowed += pick + 1;
    }
    bounds.push(full.upper());

    bounds
        .windows(2)
        .map(|w| TokenRange::new(w[0], w[1]))
        .collect()
}
