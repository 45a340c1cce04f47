//! Fingerprint, accepted candidates and the bounded candidate pool.
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BinaryHeap;
use std::fmt;
use std::str::FromStr;

/// Committed hex digest of the pool data, published before the draw.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(hex_digest: &str) -> Result<Self> {
        let hex_digest = hex_digest.trim();
        if hex_digest.is_empty() {
            return Err(Error::InvalidConfig("fingerprint must not be empty".into()));
        }
        if !hex_digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidConfig(format!(
                "fingerprint {hex_digest:?} is not a hex digest"
            )));
        }
        Ok(Self(hex_digest.to_owned()))
    }

    /// Wrap a digest this crate just computed (already lowercase hex).
    pub(crate) fn from_digest(hex_digest: String) -> Self {
        Self(hex_digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

/// An accepted `(digest, nonce)` pair from the scan.
///
/// Ordering is by digest first, so the minimum of a set of candidates is the
/// winner. Equal digests fall back to the smaller nonce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Candidate {
    pub digest: String,
    pub nonce: u64,
}

impl Candidate {
    pub fn new(digest: impl Into<String>, nonce: u64) -> Self {
        Self {
            digest: digest.into(),
            nonce,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.digest, self.nonce)
    }
}

/// Bounded pool keeping the `capacity` smallest candidates inserted.
///
/// Backed by a max-heap so the largest retained candidate is the one evicted
/// when a smaller one arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "PoolRepr", into = "PoolRepr")]
pub struct CandidatePool {
    capacity: usize,
    heap: BinaryHeap<Candidate>,
}

impl CandidatePool {
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig("pool size must be >= 1".into()));
        }
        Ok(Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Insert a candidate; returns whether it was retained.
    pub fn insert(&mut self, candidate: Candidate) -> bool {
        if self.heap.len() < self.capacity {
            self.heap.push(candidate);
            return true;
        }
        match self.heap.peek() {
            Some(largest) if candidate < *largest => {
                self.heap.pop();
                self.heap.push(candidate);
                true
            }
            _ => false,
        }
    }

    /// Fold another pool in, keeping the `capacity` smallest across both.
    pub fn merge(&mut self, other: CandidatePool) {
        for candidate in other.heap {
            self.insert(candidate);
        }
    }

    /// The candidate with the smallest digest.
    pub fn winner(&self) -> Option<&Candidate> {
        self.heap.iter().min()
    }

    /// Retained candidates ordered by digest, smallest first.
    pub fn sorted(&self) -> Vec<Candidate> {
        let mut out: Vec<Candidate> = self.heap.iter().cloned().collect();
        out.sort();
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.heap.iter()
    }
}

impl PartialEq for CandidatePool {
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity && self.sorted() == other.sorted()
    }
}

impl Eq for CandidatePool {}

#[derive(Serialize, Deserialize)]
struct PoolRepr {
    capacity: usize,
    candidates: Vec<Candidate>,
}

impl From<CandidatePool> for PoolRepr {
    fn from(pool: CandidatePool) -> Self {
        PoolRepr {
            capacity: pool.capacity,
            candidates: pool.sorted(),
        }
    }
}

impl TryFrom<PoolRepr> for CandidatePool {
    type Error = Error;

    fn try_from(repr: PoolRepr) -> Result<Self> {
        if repr.candidates.len() > repr.capacity {
            return Err(Error::InvalidConfig(format!(
                "pool holds {} candidates but capacity is {}",
                repr.candidates.len(),
                repr.capacity
            )));
        }
        let mut pool = CandidatePool::with_capacity(repr.capacity)?;
        for candidate in repr.candidates {
            pool.insert(candidate);
        }
        Ok(pool)
    }
}
