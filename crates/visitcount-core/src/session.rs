//! Once-per-session increment gate.
//!
//! A flag per counter in the session-scoped store records that this session
//! already caused an increment. Storage failures fail open: counting a visit
//! twice is preferred over never counting it.

use crate::key::CounterKey;
use crate::storage::KeyValueStore;

pub struct SessionGatekeeper<S> {
    store: S,
}

impl<S: KeyValueStore> SessionGatekeeper<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn flag_key(key: &CounterKey) -> String {
        format!("vc-visited:{}", key.storage_id())
    }

    /// True until [`mark_incremented`](Self::mark_incremented) is called for
    /// `key` in this session.
    pub fn should_increment(&self, key: &CounterKey) -> bool {
        match self.store.get(&Self::flag_key(key)) {
            Ok(flag) => flag.is_none(),
            Err(e) => {
                tracing::warn!(%key, error = %e, "session storage unavailable, counting visit");
                true
            }
        }
    }

    pub fn mark_incremented(&self, key: &CounterKey) {
        if let Err(e) = self.store.set(&Self::flag_key(key), "1") {
            tracing::warn!(%key, error = %e, "failed to record session visit");
        }
    }

    /// Drop every flag of this session.
    pub fn clear_session(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear session flags");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, UnavailableStore};

    #[test]
    fn increments_once_per_key() {
        let gate = SessionGatekeeper::new(MemoryStore::new());
        let site = CounterKey::new("example.com", "site-total");
        let page = CounterKey::for_page("example.com", "/about");

        assert!(gate.should_increment(&site));
        assert!(gate.should_increment(&site));
        gate.mark_incremented(&site);
        assert!(!gate.should_increment(&site));
        assert!(gate.should_increment(&page));
    }

    #[test]
    fn clearing_the_session_rearms_the_gate() {
        let gate = SessionGatekeeper::new(MemoryStore::new());
        let site = CounterKey::new("example.com", "site-total");
        gate.mark_incremented(&site);
        gate.clear_session();
        assert!(gate.should_increment(&site));
    }

    #[test]
    fn fails_open_without_storage() {
        let gate = SessionGatekeeper::new(UnavailableStore);
        let site = CounterKey::new("example.com", "site-total");
        gate.mark_incremented(&site);
        assert!(gate.should_increment(&site));
    }
}
