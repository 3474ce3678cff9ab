use serde_json::json;

use crate::engine::bridge::Row;
use crate::engine::ring::{Partitioner, Token, TokenRange};

/// Rows keyed by big-endian ints, filtered to a token range and sorted by
/// token the way the engine hands them over.
pub struct RowFactory {
    partitioner: Partitioner,
    range: Option<TokenRange>,
}

impl RowFactory {
    pub fn new() -> Self {
        Self {
            partitioner: Partitioner::Murmur3,
            range: None,
        }
    }

    pub fn in_range(mut self, range: TokenRange) -> Self {
        self.range = Some(range);
        self
    }

    fn row(key: i32) -> Row {
        Row::new(
            key.to_be_bytes().to_vec(),
            vec![json!(key), json!(format!("value-{key}"))],
        )
    }

    pub fn token_of(&self, row: &Row) -> Token {
        self.partitioner.token(&row.partition_key)
    }

    pub fn create_list(&self, count: usize) -> Vec<Row> {
        let mut rows: Vec<(Token, Row)> = (0..i32::MAX)
            .map(Self::row)
            .map(|r| (self.token_of(&r), r))
            .filter(|(t, _)| self.range.is_none_or(|range| range.contains(*t)))
            .take(count)
            .collect();
        rows.sort_by_key(|(t, _)| *t);
        rows.into_iter().map(|(_, r)| r).collect()
    }

    /// A row whose token falls outside the configured range.
    pub fn outside(&self) -> Row {
        (0..i32::MAX)
            .map(Self::row)
            .find(|r| {
                self.range
                    .is_some_and(|range| !range.contains(self.token_of(r)))
            })
            .expect("a key outside the range")
    }
}
