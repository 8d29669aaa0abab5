//! Core error types for visitcount-core.
//!
//! Only configuration and storage plumbing surface errors to callers.
//! Count acquisition itself never fails: candidate failures and chain
//! exhaustion are contained by the orchestrator, which always has a
//! fallback.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by diagnostic and configuration entry points.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing store
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The store is locked by another process
    #[error("Store is locked")]
    Locked,

    /// The store cannot be used at all
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be prepared
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Why a single candidate attempt failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Connection, DNS or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-2xx status
    #[error("HTTP status {0}")]
    Status(u16),

    /// The body was not an object carrying an accepted integer field
    #[error("malformed response: {0}")]
    Malformed(String),

    /// No answer within the per-attempt timeout
    #[error("timed out after {0}ms")]
    Timeout(u64),
}

/// One failed (source, proxy) attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    /// Label of the candidate, e.g. `countapi` or `countapi via allorigins`.
    pub candidate: String,
    pub reason: FailureReason,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.candidate, self.reason)
    }
}

impl std::error::Error for CandidateFailure {}

/// Source chain resolution errors.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// Every candidate failed; reasons are kept in attempt order.
    #[error("all {} count sources exhausted: [{}]", failures.len(), join_failures(failures))]
    AllSourcesExhausted { failures: Vec<CandidateFailure> },
}

impl ResolveError {
    /// Per-candidate failures in the order they were attempted.
    pub fn failures(&self) -> &[CandidateFailure] {
        match self {
            ResolveError::AllSourcesExhausted { failures } => failures,
        }
    }
}

fn join_failures(failures: &[CandidateFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
