//! Verifiable lottery draws.
//!
//! A draw is derived in two steps from a published fingerprint:
//! a proof-of-work scan over nonces `0, 1, 2, ...` finds the first `N`
//! digests below a difficulty threshold and keeps the smallest one, then the
//! winning nonce is hashed together with the fingerprint and that hash is
//! unranked into one combination per game zone.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use sha3::Sha3_256;
use std::fmt;
use std::str::FromStr;

pub mod config;
pub mod difficulty;
pub mod draw;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod game;
pub mod mapper;
pub mod stream;
pub mod types;

pub use config::DrawConfig;
pub use difficulty::Difficulty;
pub use draw::{derive_draw, draw_input_hash, verify_candidate, verify_draw, Draw, DrawRecord};
pub use engine::{SearchEngine, SearchEngineBuilder};
pub use error::{Error, Result, VerifyError};
pub use fingerprint::{fingerprint_bytes, fingerprint_file};
pub use game::{Game, GameVariant, Registry};
pub use mapper::{binomial, rank, unrank, unrank_index, DrawResult};
pub use types::{Candidate, CandidatePool, Fingerprint};

/// Hash functions a draw can be derived with.
///
/// The algorithm is part of the published draw parameters: auditors must use
/// the same one to reproduce the scan.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "sha2-256")]
    Sha2_256,
    #[serde(rename = "sha2-512")]
    Sha2_512,
    #[serde(rename = "sha3-256")]
    Sha3_256,
    #[serde(rename = "blake3")]
    Blake3,
}

impl HashAlgorithm {
    /// Calculates SHA-256 over the given data.
    pub fn calculate_sha2_256(data: &[u8]) -> Vec<u8> {
        Sha256::digest(data).to_vec()
    }

    /// Calculates SHA-512 over the given data.
    pub fn calculate_sha2_512(data: &[u8]) -> Vec<u8> {
        Sha512::digest(data).to_vec()
    }

    /// Calculates SHA3-256 over the given data.
    pub fn calculate_sha3_256(data: &[u8]) -> Vec<u8> {
        Sha3_256::digest(data).to_vec()
    }

    /// Calculates BLAKE3 (32-byte output) over the given data.
    pub fn calculate_blake3(data: &[u8]) -> Vec<u8> {
        blake3::hash(data).as_bytes().to_vec()
    }

    /// Calculates the digest based on the selected algorithm.
    pub fn calculate(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha2_256 => Self::calculate_sha2_256(data),
            Self::Sha2_512 => Self::calculate_sha2_512(data),
            Self::Sha3_256 => Self::calculate_sha3_256(data),
            Self::Blake3 => Self::calculate_blake3(data),
        }
    }

    /// Lowercase hex rendering of [`HashAlgorithm::calculate`].
    pub fn hex_digest(&self, data: &[u8]) -> String {
        hex::encode(self.calculate(data))
    }

    /// Number of hex characters in a digest.
    pub const fn hex_len(&self) -> usize {
        match self {
            Self::Sha2_512 => 128,
            Self::Sha2_256 | Self::Sha3_256 | Self::Blake3 => 64,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha2_256 => "sha2-256",
            Self::Sha2_512 => "sha2-512",
            Self::Sha3_256 => "sha3-256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha2-256" | "sha256" => Ok(Self::Sha2_256),
            "sha2-512" | "sha512" => Ok(Self::Sha2_512),
            "sha3-256" => Ok(Self::Sha3_256),
            "blake3" => Ok(Self::Blake3),
            other => Err(Error::InvalidConfig(format!(
                "hash algorithm {other:?} is not available"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_algorithm_sha2_256() {
        assert_eq!(
            HashAlgorithm::Sha2_256.hex_digest(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_hash_algorithm_sha3_256() {
        assert_eq!(
            HashAlgorithm::Sha3_256.hex_digest(b"hello"),
            "3338be694f50c5f338814986cdf0686453a888b84f424d792af4b9202398f392"
        );
    }

    #[test]
    fn test_hash_algorithm_dispatch_blake3() {
        let via_dispatch = HashAlgorithm::Blake3.calculate(b"hello world");
        let direct = HashAlgorithm::calculate_blake3(b"hello world");
        assert_eq!(via_dispatch, direct);
    }

    #[test]
    fn test_hex_len_matches_digest() {
        for algo in [
            HashAlgorithm::Sha2_256,
            HashAlgorithm::Sha2_512,
            HashAlgorithm::Sha3_256,
            HashAlgorithm::Blake3,
        ] {
            assert_eq!(algo.hex_digest(b"x").len(), algo.hex_len(), "{algo}");
        }
    }

    #[test]
    fn test_parse_algorithm_names() {
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha2_256);
        assert_eq!("SHA3-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha3_256);
        let err = "md5".parse::<HashAlgorithm>().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_algorithm_serde_uses_names() {
        let s = serde_json::to_string(&HashAlgorithm::Sha3_256).unwrap();
        assert_eq!(s, "\"sha3-256\"");
        let back: HashAlgorithm = serde_json::from_str("\"blake3\"").unwrap();
        assert_eq!(back, HashAlgorithm::Blake3);
    }
}
