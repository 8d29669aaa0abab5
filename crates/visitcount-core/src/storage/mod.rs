mod config;
pub mod memory;
pub mod sqlite;

pub use config::{Config, DisplayConfig, EstimatorConfig, ResolverConfig};
pub use memory::{MemoryStore, UnavailableStore};
pub use sqlite::SqliteStore;

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{ConfigError, StorageError};

/// Scope name of the durable store inside the SQLite file.
pub const LOCAL_SCOPE: &str = "local";

/// Prefix shared by every session scope.
pub const SESSION_SCOPE_PREFIX: &str = "session:";

/// Scope name for the flags of one browsing session.
pub fn session_scope(session_id: &str) -> String {
    format!("{SESSION_SCOPE_PREFIX}{session_id}")
}

/// String key-value store injected into the gatekeeper and the cache.
///
/// Every operation is fallible; callers decide how an unavailable store
/// degrades.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every entry visible through this store.
    fn clear(&self) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }
}

/// Returns `~/.config/visitcount[-dev]/` based on VISITCOUNT_ENV.
///
/// Set VISITCOUNT_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("VISITCOUNT_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("visitcount-dev")
    } else {
        base_dir.join("visitcount")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
