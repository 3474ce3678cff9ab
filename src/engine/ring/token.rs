use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::murmur3;
use crate::engine::errors::RingError;

/// Position of a key on the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Token(pub i128);

impl Token {
    pub const fn new(value: i128) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i128 {
        self.0
    }
}

impl From<i64> for Token {
    fn from(value: i64) -> Self {
        Self(value as i128)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash function the cluster uses to place partition keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Partitioner {
    Murmur3,
    Random,
}

impl Partitioner {
    /// Accepts either the short or the fully-qualified class name reported
    /// by node settings.
    pub fn from_class_name(name: &str) -> Result<Self, RingError> {
        let short = name.rsplit('.').next().unwrap_or(name);
        match short {
            "Murmur3Partitioner" => Ok(Partitioner::Murmur3),
            "RandomPartitioner" => Ok(Partitioner::Random),
            _ => Err(RingError::UnsupportedPartitioner(name.to_string())),
        }
    }

    pub const fn class_name(self) -> &'static str {
        match self {
            Partitioner::Murmur3 => "org.apache.cassandra.dht.Murmur3Partitioner",
            Partitioner::Random => "org.apache.cassandra.dht.RandomPartitioner",
        }
    }

    pub const fn min_token(self) -> Token {
        match self {
            Partitioner::Murmur3 => Token(i64::MIN as i128),
            Partitioner::Random => Token(-1),
        }
    }

    /// Largest assignable token. Random's true maximum (2^127) is clamped
    /// so that the exclusive end of the ring stays representable.
    pub const fn max_token(self) -> Token {
        match self {
            Partitioner::Murmur3 => Token(i64::MAX as i128),
            Partitioner::Random => Token(i128::MAX - 1),
        }
    }

    /// `[min, max + 1)`: the whole ring as one half-open range.
    pub fn full_range(self) -> TokenRange {
        TokenRange {
            lower: self.min_token(),
            upper: Token(self.max_token().0 + 1),
        }
    }

    pub fn contains(self, token: Token) -> bool {
        token >= self.min_token() && token <= self.max_token()
    }

    /// Token of a serialized partition key.
    pub fn token(self, key: &[u8]) -> Token {
        match self {
            Partitioner::Murmur3 => Token::from(murmur3::token_of(key)),
            Partitioner::Random => {
                let digest = Md5::digest(key);
                let mut buf = [0u8; 16];
                buf.copy_from_slice(&digest);
                let magnitude = i128::from_be_bytes(buf).unsigned_abs();
                let max = self.max_token().0 as u128;
                Token(magnitude.min(max) as i128)
            }
        }
    }
}

/// Half-open token range `[lower, upper)`. Never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenRange {
    lower: Token,
    upper: Token,
}

impl TokenRange {
    pub fn new(lower: Token, upper: Token) -> Result<Self, RingError> {
        if lower >= upper {
            return Err(RingError::EmptyRange { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> Token {
        self.lower
    }

    pub fn upper(&self) -> Token {
        self.upper
    }

    /// Last token included in the range.
    pub fn last(&self) -> Token {
        Token(self.upper.0 - 1)
    }

    pub fn contains(&self, token: Token) -> bool {
        token >= self.lower && token < self.upper
    }

    pub fn intersects(&self, other: &TokenRange) -> bool {
        self.lower < other.upper && other.lower < self.upper
    }

    /// Overlap of two ranges, if any.
    pub fn intersection(&self, other: &TokenRange) -> Option<TokenRange> {
        TokenRange::new(self.lower.max(other.lower), self.upper.min(other.upper)).ok()
    }

    pub fn width(&self) -> u128 {
        self.upper.0.wrapping_sub(self.lower.0) as u128
    }

    /// Token at `lower + width * numerator / denominator`, computed without
    /// overflowing for ring-sized widths.
    pub(crate) fn offset(&self, numerator: u128, denominator: u128) -> Token {
        let width = self.width();
        let delta = (width / denominator) * numerator + (width % denominator) * numerator / denominator;
        Token(self.lower.0.wrapping_add(delta as i128))
    }
}

impl fmt::Display for TokenRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.lower, self.upper)
    }
}
