//! Durable last-known count per counter.
//!
//! Remote values always overwrite what is stored. When every remote source is
//! down the cache doubles as a local-only counter, which only sees visits from
//! this one profile.

use chrono::{DateTime, Utc};

use crate::key::CounterKey;
use crate::storage::KeyValueStore;

pub struct PersistentCache<S> {
    store: S,
}

impl<S: KeyValueStore> PersistentCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn count_key(key: &CounterKey) -> String {
        format!("vc-count:{}", key.storage_id())
    }

    fn timestamp_key(key: &CounterKey) -> String {
        format!("vc-updated:{}", key.storage_id())
    }

    /// Last stored count, if present and well-formed.
    pub fn load(&self, key: &CounterKey) -> Option<u64> {
        match self.store.get(&Self::count_key(key)) {
            Ok(Some(raw)) => match raw.trim().parse::<u64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    tracing::warn!(%key, %raw, "ignoring malformed cached count");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(%key, error = %e, "persistent cache unavailable");
                None
            }
        }
    }

    /// When the count was last written.
    pub fn last_updated(&self, key: &CounterKey) -> Option<DateTime<Utc>> {
        let raw = self.store.get(&Self::timestamp_key(key)).ok().flatten()?;
        DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Overwrite the stored count unconditionally.
    pub fn store(&self, key: &CounterKey, value: u64) {
        if let Err(e) = self.write(key, value) {
            tracing::warn!(%key, value, error = %e, "failed to persist count");
        }
    }

    fn write(&self, key: &CounterKey, value: u64) -> Result<(), crate::error::StorageError> {
        self.store.set(&Self::count_key(key), &value.to_string())?;
        self.store
            .set(&Self::timestamp_key(key), &Utc::now().to_rfc3339())?;
        Ok(())
    }

    /// Stored count (or zero) plus one, persisted and returned.
    ///
    /// With storage unavailable nothing is written and 1 is returned.
    pub fn local_increment(&self, key: &CounterKey) -> u64 {
        let current = match self.store.get(&Self::count_key(key)) {
            Ok(raw) => raw.and_then(|r| r.trim().parse::<u64>().ok()).unwrap_or(0),
            Err(e) => {
                tracing::warn!(%key, error = %e, "persistent cache unavailable, local count not kept");
                return 1;
            }
        };

        let next = current.saturating_add(1);
        self.store(key, next);
        next
    }

    /// Forget the stored count for `key`.
    pub fn clear(&self, key: &CounterKey) {
        let result = self
            .store
            .remove(&Self::count_key(key))
            .and_then(|()| self.store.remove(&Self::timestamp_key(key)));
        if let Err(e) = result {
            tracing::warn!(%key, error = %e, "failed to clear cached count");
        }
    }

    /// Forget every stored count.
    pub fn clear_all(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear persistent cache");
        }
    }
}
