//! Fingerprint of the pool data file, published before the draw.
use crate::error::{Error, Result};
use crate::types::Fingerprint;
use crate::HashAlgorithm;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

/// Hash the pool data after trimming surrounding whitespace.
pub fn fingerprint_bytes(data: &str, algorithm: HashAlgorithm) -> Fingerprint {
    let digest = algorithm.hex_digest(data.trim().as_bytes());
    Fingerprint::from_digest(digest)
}

/// Read `path` as text and fingerprint its trimmed contents.
pub fn fingerprint_file(path: impl AsRef<Path>, algorithm: HashAlgorithm) -> Result<Fingerprint> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => Error::InputNotFound(path.to_path_buf()),
        _ => Error::unknown(format!("reading {}", path.display()), err),
    })?;
    let fingerprint = fingerprint_bytes(&data, algorithm);
    info!(path = %path.display(), fingerprint = %fingerprint, "fingerprinted pool data");
    Ok(fingerprint)
}
