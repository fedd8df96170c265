use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid record identifier: {0:?} (expected 24 hex characters)")]
    InvalidIdentifier(String),

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("timestamp {0} is before the Unix epoch")]
    PreEpochTimestamp(i64),

    #[error("record has no versions")]
    EmptyHistory,

    #[error("broken version history: expected version {expected}, found {found}")]
    BrokenHistory { expected: u64, found: u64 },

    #[error("version {0} not found")]
    VersionNotFound(u64),
}
