use std::io;
use std::path::PathBuf;

/// Tagger error types
#[derive(Debug, thiserror::Error)]
pub enum TaggerError {
    /// Character does not map to any tag type
    #[error("Invalid tag type character: {0:?}")]
    InvalidTagType(char),

    /// Answer to a search prompt is not a number
    #[error("Invalid search value: {0:?}")]
    InvalidSearchValue(String),

    /// Log destination cannot be created or opened
    #[error("Log sink unavailable at {path}: {reason}")]
    SinkUnavailable { path: PathBuf, reason: String },

    /// Writing to an opened sink failed
    #[error("Sink error: {0}")]
    Sink(String),

    /// Device log source failure
    #[error("Log source error: {0}")]
    Source(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Global tagger initialized twice
    #[error("Logs tagger is already initialized")]
    AlreadyInitialized,

    /// Global tagger used before initialization
    #[error("Logs tagger is not initialized, call initialize() first")]
    NotInitialized,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, TaggerError>;

impl From<config::ConfigError> for TaggerError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
