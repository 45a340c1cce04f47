//! Difficulty threshold for the nonce scan.
use crate::error::{Error, Result};
use crate::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hex upper bound a candidate digest must fall below.
///
/// A digest satisfies the threshold when its leading `len()` hex characters
/// compare bytewise less than the threshold, kept exactly as given. Digests
/// are lowercase, so an uppercase `F` only admits `0-9` in its position
/// while `f` also admits `a-e`. Each extra leading `0` makes acceptance 16
/// times less likely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Difficulty(String);

impl Difficulty {
    pub fn new(threshold: &str) -> Result<Self> {
        let threshold = threshold.trim();
        if threshold.is_empty() {
            return Err(Error::InvalidConfig("difficulty must not be empty".into()));
        }
        if !threshold.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidConfig(format!(
                "difficulty {threshold:?} is not a hex string"
            )));
        }
        Ok(Self(threshold.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `digest` (lowercase hex) lies strictly below the threshold.
    ///
    /// A digest shorter than the threshold never satisfies it.
    #[inline]
    pub fn admits(&self, digest: &str) -> bool {
        match digest.as_bytes().get(..self.0.len()) {
            Some(prefix) => prefix < self.0.as_bytes(),
            None => false,
        }
    }

    /// Reject thresholds that cannot be compared against `algorithm` digests.
    pub fn check_for(&self, algorithm: HashAlgorithm) -> Result<()> {
        if self.0.len() > algorithm.hex_len() {
            return Err(Error::InvalidConfig(format!(
                "difficulty has {} hex digits but {} digests have {}",
                self.0.len(),
                algorithm,
                algorithm.hex_len()
            )));
        }
        if self.0.bytes().all(|b| b == b'0') {
            return Err(Error::InvalidConfig(
                "difficulty of all zeros can never be satisfied".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self("00003".to_owned())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Difficulty {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Difficulty> for String {
    fn from(value: Difficulty) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_compares_leading_digits_only() {
        let d = Difficulty::new("00003").unwrap();
        assert!(d.admits("000002e7500efdf2398d79d41e72477400acb60d23b8ed26f4cea25fc7905de0"));
        assert!(d.admits("00002fffffffffff"));
        assert!(!d.admits("00003000000000000"));
        assert!(!d.admits("0000400000"));
        assert!(!d.admits("0000"));
    }

    #[test]
    fn threshold_case_is_kept_and_compared_bytewise() {
        let upper: Difficulty = "000F".parse().unwrap();
        assert_eq!(upper.as_str(), "000F");
        assert!(upper.admits("00091234"));
        assert!(!upper.admits("000a1234"));

        let lower: Difficulty = "000f".parse().unwrap();
        assert!(lower.admits("000a1234"));
        assert!(!lower.admits("000f0000"));
    }

    #[test]
    fn rejects_non_hex_and_empty() {
        assert!(matches!(Difficulty::new(""), Err(Error::InvalidConfig(_))));
        assert!(matches!(Difficulty::new("00g3"), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn check_for_rejects_unsatisfiable_thresholds() {
        let long = Difficulty::new(&"1".repeat(65)).unwrap();
        assert!(long.check_for(HashAlgorithm::Sha2_256).is_err());
        assert!(long.check_for(HashAlgorithm::Sha2_512).is_ok());
        let zero = Difficulty::new("000").unwrap();
        assert!(zero.check_for(HashAlgorithm::Sha2_256).is_err());
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let d: Difficulty = serde_json::from_str("\"0000F\"").unwrap();
        assert_eq!(d.as_str(), "0000F");
        assert!(serde_json::from_str::<Difficulty>("\"xyz\"").is_err());
    }
}
