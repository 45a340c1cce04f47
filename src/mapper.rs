//! Maps a digest onto a combination of labels.
//!
//! The digest is read as a big-endian unsigned integer and reduced modulo
//! `C(n, k)`. The resulting index is turned into a combination with the
//! combinatorial number system, which yields exactly the combination found at
//! that position when enumerating k-subsets in lexicographic order, without
//! walking the other `C(n, k) - 1` subsets.
use crate::error::{Error, Result};
use crate::game::GameVariant;
use num_bigint::BigUint;
use num_traits::{Num, One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The labels drawn from one zone, ascending in the pool's order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrawResult {
    pub zone: String,
    pub labels: Vec<String>,
}

impl fmt::Display for DrawResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.labels.join(" "))
    }
}

/// Exact binomial coefficient `C(n, k)`; zero when `k > n`.
pub fn binomial(n: usize, k: usize) -> BigUint {
    if k > n {
        return BigUint::zero();
    }
    let k = k.min(n - k);
    let mut acc = BigUint::one();
    for i in 0..k {
        // acc * (n - i) is always divisible by (i + 1) at this point.
        acc *= n - i;
        acc /= i + 1;
    }
    acc
}

/// Map a hex digest onto a combination of the variant's labels.
pub fn unrank(hash: &str, variant: &GameVariant) -> Result<DrawResult> {
    let value = BigUint::from_str_radix(hash, 16)
        .map_err(|e| Error::Mapping(format!("digest {hash:?} is not hex: {e}")))?;
    let total = binomial(variant.pool_size(), variant.pick());
    if total.is_zero() {
        return Err(Error::Mapping(format!(
            "variant {:?} picks {} of {} labels",
            variant.name(),
            variant.pick(),
            variant.pool_size()
        )));
    }
    unrank_index(&(value % total), variant)
}

/// The `index`-th combination (lexicographic order) of the variant's labels.
pub fn unrank_index(index: &BigUint, variant: &GameVariant) -> Result<DrawResult> {
    let positions = unrank_positions(index, variant.pool_size(), variant.pick())?;
    let labels = variant.labels();
    Ok(DrawResult {
        zone: variant.name().to_owned(),
        labels: positions.into_iter().map(|p| labels[p].clone()).collect(),
    })
}

/// Inverse of [`unrank_index`]: the lexicographic index of a combination.
pub fn rank(result: &DrawResult, variant: &GameVariant) -> Result<BigUint> {
    let labels = variant.labels();
    let positions = result
        .labels
        .iter()
        .map(|label| {
            labels.iter().position(|l| l == label).ok_or_else(|| {
                Error::Mapping(format!(
                    "label {label:?} is not in variant {:?}",
                    variant.name()
                ))
            })
        })
        .collect::<Result<Vec<usize>>>()?;
    rank_positions(&positions, variant.pool_size(), variant.pick())
}

fn unrank_positions(index: &BigUint, n: usize, k: usize) -> Result<Vec<usize>> {
    let total = binomial(n, k);
    if k == 0 || total.is_zero() {
        return Err(Error::Mapping(format!("cannot choose {k} of {n}")));
    }
    if *index >= total {
        return Err(Error::Mapping(format!(
            "index {index} out of range for {total} combinations"
        )));
    }

    let mut remaining = index.clone();
    let mut out = Vec::with_capacity(k);
    let mut c = 0usize;
    for p in 0..k {
        loop {
            // Completions once position p is fixed at c.
            let completions = binomial(n - c - 1, k - p - 1);
            if remaining < completions {
                out.push(c);
                c += 1;
                break;
            }
            remaining -= completions;
            c += 1;
        }
    }
    Ok(out)
}

fn rank_positions(positions: &[usize], n: usize, k: usize) -> Result<BigUint> {
    if positions.len() != k {
        return Err(Error::Mapping(format!(
            "combination has {} labels, expected {k}",
            positions.len()
        )));
    }
    let mut index = BigUint::zero();
    let mut c = 0usize;
    for (p, &chosen) in positions.iter().enumerate() {
        if chosen < c || chosen >= n {
            return Err(Error::Mapping(
                "combination is not strictly ascending within the pool".into(),
            ));
        }
        while c < chosen {
            index += binomial(n - c - 1, k - p - 1);
            c += 1;
        }
        c += 1;
    }
    Ok(index)
}
