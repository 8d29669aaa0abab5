//! Count acquisition: session gate, remote chain, local cache, estimate.
//!
//! ## State Transitions
//!
//! ```text
//! DECIDE -> REMOTE -> DONE
//!              |
//!              v
//!        LOCAL_FALLBACK -> DONE
//!              |
//!              v
//!          ESTIMATE -> DONE
//! ```
//!
//! Every path ends in `DONE`; [`CountAcquirer::acquire`] cannot fail. The
//! session flag and the cache are only written after a remote success.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::cache::PersistentCache;
use crate::estimator::Estimator;
use crate::key::CounterKey;
use crate::session::SessionGatekeeper;
use crate::sources::{CountTransport, Operation, SourceChainResolver};
use crate::storage::KeyValueStore;

/// Where an acquired count came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// Authoritative value from a remote candidate.
    Remote { candidate: String },
    /// Every source failed on a first visit; counted locally.
    LocalIncrement,
    /// Every source failed on a repeat visit; last cached value.
    Cache,
    /// Nothing authoritative or cached was available.
    Estimate,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Remote { candidate } => write!(f, "remote ({candidate})"),
            Origin::LocalIncrement => f.write_str("local increment"),
            Origin::Cache => f.write_str("cache"),
            Origin::Estimate => f.write_str("estimate"),
        }
    }
}

/// Result of one acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acquisition {
    pub key: CounterKey,
    pub operation: Operation,
    pub value: u64,
    pub origin: Origin,
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct CountAcquirer<T, SS, PS> {
    gatekeeper: Arc<SessionGatekeeper<SS>>,
    resolver: Arc<SourceChainResolver<T>>,
    cache: PersistentCache<PS>,
    estimator: Estimator,
    clock: Clock,
}

impl<T, SS, PS> CountAcquirer<T, SS, PS>
where
    T: CountTransport + 'static,
    SS: KeyValueStore + 'static,
    PS: KeyValueStore,
{
    pub fn new(
        gatekeeper: SessionGatekeeper<SS>,
        resolver: SourceChainResolver<T>,
        cache: PersistentCache<PS>,
        estimator: Estimator,
    ) -> Self {
        Self {
            gatekeeper: Arc::new(gatekeeper),
            resolver: Arc::new(resolver),
            cache,
            estimator,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock used for estimates.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn gatekeeper(&self) -> &SessionGatekeeper<SS> {
        &self.gatekeeper
    }

    pub fn resolver(&self) -> &SourceChainResolver<T> {
        &self.resolver
    }

    pub fn cache(&self) -> &PersistentCache<PS> {
        &self.cache
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Displayable count for `key`. Never fails.
    pub async fn acquire(&self, key: &CounterKey) -> u64 {
        self.acquire_detailed(key).await.value
    }

    /// Like [`acquire`](Self::acquire), also reporting the operation and origin.
    pub async fn acquire_detailed(&self, key: &CounterKey) -> Acquisition {
        let operation = if self.gatekeeper.should_increment(key) {
            Operation::Increment
        } else {
            Operation::Read
        };

        let (value, origin) = match self.resolver.resolve_detailed(operation, key).await {
            Ok(resolved) => {
                self.cache.store(key, resolved.value);
                if operation == Operation::Increment {
                    self.gatekeeper.mark_incremented(key);
                }
                (
                    resolved.value,
                    Origin::Remote {
                        candidate: resolved.candidate,
                    },
                )
            }
            Err(e) => {
                tracing::warn!(%key, op = operation.as_str(), error = %e, "falling back to local count");
                self.local_fallback(operation, key)
            }
        };

        tracing::info!(%key, op = operation.as_str(), value, %origin, "count acquired");
        Acquisition {
            key: key.clone(),
            operation,
            value,
            origin,
        }
    }

    fn local_fallback(&self, operation: Operation, key: &CounterKey) -> (u64, Origin) {
        match operation {
            Operation::Increment => (self.cache.local_increment(key), Origin::LocalIncrement),
            Operation::Read => match self.cache.load(key) {
                Some(value) => (value, Origin::Cache),
                None => (self.estimator.estimate(self.now()), Origin::Estimate),
            },
        }
    }

    /// Best-effort increment of a secondary counter on a detached task.
    ///
    /// Gated once per session like the main counter. Failures are logged
    /// and never reach the caller; the handle is only useful for tests that
    /// want to wait for the attempt.
    pub fn spawn_tracking(&self, key: CounterKey) -> Option<JoinHandle<()>> {
        if !self.gatekeeper.should_increment(&key) {
            tracing::debug!(%key, "tracking already counted this session");
            return None;
        }

        let resolver = Arc::clone(&self.resolver);
        let gatekeeper = Arc::clone(&self.gatekeeper);
        Some(tokio::spawn(async move {
            match resolver.resolve(Operation::Increment, &key).await {
                Ok(value) => {
                    gatekeeper.mark_incremented(&key);
                    tracing::debug!(%key, value, "tracking recorded");
                }
                Err(e) => tracing::warn!(%key, error = %e, "tracking failed"),
            }
        }))
    }

    /// Forget session flags and every cached count.
    pub fn reset(&self) {
        self.gatekeeper.clear_session();
        self.cache.clear_all();
    }
}
