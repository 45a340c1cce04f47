//! Draw derivation from a fingerprint, its verification, and the published record.
use crate::difficulty::Difficulty;
use crate::engine::{candidate_digest, SearchEngine};
use crate::error::{Error, Result, VerifyError};
use crate::game::GameVariant;
use crate::mapper::{unrank, DrawResult};
use crate::types::{Candidate, CandidatePool, Fingerprint};
use crate::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// All zone results of one invocation, derived from a single draw hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Draw {
    pub winner: Candidate,
    pub draw_hash: String,
    pub results: Vec<DrawResult>,
}

impl fmt::Display for Draw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, result) in self.results.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{result}")?;
        }
        Ok(())
    }
}

/// `Hash(decimal(nonce) ++ fingerprint)`: note the reversed operand order
/// relative to the candidate digest.
pub fn draw_input_hash(algorithm: HashAlgorithm, nonce: u64, fingerprint: &Fingerprint) -> String {
    let mut data = nonce.to_string().into_bytes();
    data.extend_from_slice(fingerprint.as_bytes());
    algorithm.hex_digest(&data)
}

/// Map the winning nonce onto every zone, in the given order.
pub fn map_zones(
    algorithm: HashAlgorithm,
    fingerprint: &Fingerprint,
    winner: Candidate,
    zones: &[GameVariant],
) -> Result<Draw> {
    if zones.is_empty() {
        return Err(Error::InvalidConfig("at least one zone is required".into()));
    }
    let draw_hash = draw_input_hash(algorithm, winner.nonce, fingerprint);
    let results = zones
        .iter()
        .map(|zone| unrank(&draw_hash, zone))
        .collect::<Result<Vec<_>>>()?;
    Ok(Draw {
        winner,
        draw_hash,
        results,
    })
}

/// Search once, then draw every zone from the winner's draw hash.
pub fn derive_draw(
    fingerprint: &Fingerprint,
    engine: &SearchEngine,
    zones: &[GameVariant],
) -> Result<(CandidatePool, Draw)> {
    if zones.is_empty() {
        return Err(Error::InvalidConfig("at least one zone is required".into()));
    }
    let pool = engine.search(fingerprint)?;
    let winner = pool_winner(&pool)?;
    let draw = map_zones(engine.algorithm, fingerprint, winner, zones)?;
    info!(nonce = draw.winner.nonce, draw = %draw, "draw derived");
    Ok((pool, draw))
}

fn pool_winner(pool: &CandidatePool) -> Result<Candidate> {
    pool.winner()
        .cloned()
        .ok_or_else(|| Error::Mapping("candidate pool is empty, no winner to map".into()))
}

/// Check that a published candidate digest is genuine and meets the threshold.
pub fn verify_candidate(
    algorithm: HashAlgorithm,
    fingerprint: &Fingerprint,
    difficulty: &Difficulty,
    candidate: &Candidate,
) -> Result<(), VerifyError> {
    let digest = candidate_digest(algorithm, fingerprint, candidate.nonce);
    if digest != candidate.digest {
        return Err(VerifyError::DigestMismatch);
    }
    if !difficulty.admits(&digest) {
        return Err(VerifyError::InvalidDifficulty);
    }
    Ok(())
}

/// Check a published draw against its winner without repeating the scan.
///
/// This confirms the digest, threshold and mapping. Confirming that the
/// winner is the smallest of the first `pool_size` acceptances requires the
/// full scan, see [`DrawRecord::verify_strict`].
pub fn verify_draw(
    algorithm: HashAlgorithm,
    fingerprint: &Fingerprint,
    difficulty: &Difficulty,
    zones: &[GameVariant],
    draw: &Draw,
) -> Result<(), VerifyError> {
    verify_candidate(algorithm, fingerprint, difficulty, &draw.winner)?;
    let expected = map_zones(algorithm, fingerprint, draw.winner.clone(), zones)
        .map_err(|e| VerifyError::Malformed(e.to_string()))?;
    if expected.draw_hash != draw.draw_hash || expected.results != draw.results {
        return Err(VerifyError::DrawMismatch);
    }
    Ok(())
}

/// Everything an auditor needs to reproduce a draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub fingerprint: Fingerprint,
    pub difficulty: Difficulty,
    pub pool_size: usize,
    pub algorithm: HashAlgorithm,
    pub game: String,
    pub zones: Vec<GameVariant>,
    pub pool: CandidatePool,
    pub draw: Draw,
    /// Rendered draw, e.g. `02 07 08 09 17 25|01`.
    pub numbers: String,
}

impl DrawRecord {
    pub fn new(
        fingerprint: Fingerprint,
        engine: &SearchEngine,
        game: impl Into<String>,
        zones: Vec<GameVariant>,
        pool: CandidatePool,
        draw: Draw,
    ) -> Self {
        let numbers = draw.to_string();
        Self {
            fingerprint,
            difficulty: engine.difficulty.clone(),
            pool_size: engine.pool_size,
            algorithm: engine.algorithm,
            game: game.into(),
            zones,
            pool,
            draw,
            numbers,
        }
    }

    /// Checks every published candidate and the draw, without rescanning.
    pub fn verify(&self) -> Result<(), VerifyError> {
        if self.pool.len() != self.pool_size {
            return Err(VerifyError::Malformed(format!(
                "pool holds {} candidates, expected {}",
                self.pool.len(),
                self.pool_size
            )));
        }
        for candidate in self.pool.iter() {
            verify_candidate(self.algorithm, &self.fingerprint, &self.difficulty, candidate)?;
        }
        if self.pool.winner() != Some(&self.draw.winner) {
            return Err(VerifyError::Malformed(
                "winner is not the smallest pool digest".into(),
            ));
        }
        verify_draw(
            self.algorithm,
            &self.fingerprint,
            &self.difficulty,
            &self.zones,
            &self.draw,
        )?;
        if self.numbers != self.draw.to_string() {
            return Err(VerifyError::DrawMismatch);
        }
        Ok(())
    }

    /// [`DrawRecord::verify`] plus a full rescan with `threads` workers.
    pub fn verify_strict(&self, threads: usize) -> Result<(), VerifyError> {
        self.verify()?;
        let engine = crate::engine::SearchEngineBuilder::default()
            .difficulty(self.difficulty.clone())
            .pool_size(self.pool_size)
            .algorithm(self.algorithm)
            .threads(threads)
            .build_validated()
            .map_err(|e| VerifyError::Malformed(e.to_string()))?;
        let (pool, draw) = derive_draw(&self.fingerprint, &engine, &self.zones)
            .map_err(|e| VerifyError::Malformed(e.to_string()))?;
        if pool != self.pool || draw != self.draw {
            return Err(VerifyError::DrawMismatch);
        }
        Ok(())
    }
}
