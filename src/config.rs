//! Draw parameters with defaults, loadable from JSON.
use crate::difficulty::Difficulty;
use crate::engine::{SearchEngine, SearchEngineBuilder, DEFAULT_BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::game::{Game, Registry};
use crate::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Parameters of a draw. Every field is published alongside the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DrawConfig {
    pub difficulty: Difficulty,
    pub pool_size: usize,
    pub game: String,
    pub algorithm: HashAlgorithm,
    /// Worker threads for the scan; does not affect the result.
    pub threads: usize,
    pub block_size: u64,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            pool_size: 10,
            game: "double-color-ball".to_owned(),
            algorithm: HashAlgorithm::default(),
            threads: default_threads(),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// One less than the available cores, at least one.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|nz| nz.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

impl DrawConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| Error::InvalidConfig(format!("config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::InputNotFound(path.to_path_buf()),
            _ => Error::unknown(format!("reading {}", path.display()), err),
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig("pool_size must be >= 1".into()));
        }
        if self.threads == 0 {
            return Err(Error::InvalidConfig("threads must be >= 1".into()));
        }
        self.difficulty.check_for(self.algorithm)?;
        Registry::builtin().game(&self.game)?;
        Ok(())
    }

    pub fn game<'r>(&self, registry: &'r Registry) -> Result<&'r Game> {
        registry.game(&self.game)
    }

    pub fn engine(&self) -> Result<SearchEngine> {
        SearchEngineBuilder::default()
            .difficulty(self.difficulty.clone())
            .pool_size(self.pool_size)
            .threads(self.threads)
            .algorithm(self.algorithm)
            .block_size(self.block_size)
            .build_validated()
    }
}
