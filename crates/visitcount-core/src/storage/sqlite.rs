//! SQLite-backed key-value store.
//!
//! One `kv` table holds every scope: the durable `local` scope used by the
//! persistent cache and one `session:<id>` scope per browsing session.
//! Scoped handles share a single connection. Every row carries the unix
//! time it was last written so stale session scopes can be pruned.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{data_dir, KeyValueStore, SESSION_SCOPE_PREFIX};
use crate::error::StorageError;

/// SQLite database for counter state.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    scope: String,
}

impl SqliteStore {
    /// Open the store at `~/.config/visitcount/visitcount.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(scope: &str) -> Result<Self, StorageError> {
        let path = data_dir()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?
            .join("visitcount.db");
        Self::open_at(&path, scope)
    }

    /// Open the store at an explicit path.
    pub fn open_at(path: &Path, scope: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn, scope)
    }

    /// Open an in-memory database.
    pub fn open_memory(scope: &str) -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, scope)
    }

    fn from_connection(conn: Connection, scope: &str) -> Result<Self, StorageError> {
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            scope: scope.to_string(),
        })
    }

    /// Another handle on the same database, restricted to `scope`.
    pub fn scoped(&self, scope: &str) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            scope: scope.to_string(),
        }
    }

    /// Delete the flags of every session, whatever handle this is.
    ///
    /// Returns the number of rows removed.
    pub fn clear_sessions(&self) -> Result<usize, StorageError> {
        let removed = self.conn()?.execute(
            "DELETE FROM kv WHERE scope LIKE ?1",
            params![session_pattern()],
        )?;
        tracing::debug!(removed, "cleared all session scopes");
        Ok(removed)
    }

    /// Delete every session scope whose newest write is older than `cutoff`.
    ///
    /// Returns the number of rows removed. The durable scope is never touched.
    pub fn prune_sessions(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
        let removed = self.conn()?.execute(
            "DELETE FROM kv WHERE scope IN (
                SELECT scope FROM kv
                WHERE scope LIKE ?1
                GROUP BY scope
                HAVING MAX(updated_at) < ?2
            )",
            params![session_pattern(), cutoff.timestamp()],
        )?;
        if removed > 0 {
            tracing::debug!(removed, %cutoff, "pruned stale session scopes");
        }
        Ok(removed)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("connection lock poisoned: {e}")))
    }
}

fn session_pattern() -> String {
    format!("{SESSION_SCOPE_PREFIX}%")
}

/// Bring the schema to the current version.
///
/// `schema_version` holds a single row; a database without it is version 0.
fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )?;
    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i64>>(0)
        })?
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }
    Ok(())
}

fn set_version(conn: &Connection, version: i64) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        params![version],
    )?;
    Ok(())
}

/// v1: scoped key-value table.
fn migrate_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
            scope      TEXT NOT NULL,
            key        TEXT NOT NULL,
            value      TEXT NOT NULL,
            PRIMARY KEY (scope, key)
        );",
    )?;
    set_version(conn, 1)
}

/// v2: last-write time per row. Existing rows count as written at epoch.
fn migrate_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch("ALTER TABLE kv ADD COLUMN updated_at INTEGER NOT NULL DEFAULT 0;")?;
    set_version(&tx, 2)?;
    tx.commit()
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE scope = ?1 AND key = ?2")?;
        let result = stmt.query_row(params![self.scope, key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO kv (scope, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![self.scope, key, value, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn()?.execute(
            "DELETE FROM kv WHERE scope = ?1 AND key = ?2",
            params![self.scope, key],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.conn()?
            .execute("DELETE FROM kv WHERE scope = ?1", params![self.scope])?;
        Ok(())
    }
}
