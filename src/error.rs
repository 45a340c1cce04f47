use std::path::PathBuf;
use std::sync::Arc;

/// Reasons a published candidate or draw fails to check out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("recomputed digest does not match the published digest")]
    DigestMismatch,
    #[error("digest does not meet difficulty")]
    InvalidDifficulty,
    #[error("draw does not match the published result")]
    DrawMismatch,
    #[error("malformed draw record: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("mapping failed: {0}")]
    Mapping(String),
    #[error("nonce space exhausted before the candidate pool filled")]
    NonceOverflow,
    #[error("search channel closed")]
    ChannelClosed,
    #[error("{context}: {source}")]
    Unknown {
        context: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Wrap an unexpected failure, keeping it as the error source.
    pub fn unknown<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Unknown {
            context: context.into(),
            source: Arc::new(source),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
