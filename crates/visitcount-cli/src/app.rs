//! Wiring from configuration to a ready acquirer.

use std::sync::Arc;

use chrono::Utc;
use clap::Args;
use visitcount_core::storage::{session_scope, LOCAL_SCOPE};
use visitcount_core::{
    Config, CountAcquirer, HttpTransport, KeyValueStore, PersistentCache, SessionGatekeeper,
    SourceChainResolver, SqliteStore, StorageError, UnavailableStore,
};

pub type Store = Arc<dyn KeyValueStore>;
pub type Acquirer = CountAcquirer<HttpTransport, Store, Store>;

/// Identifies the browsing session whose flags gate increments.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Session id (a fresh one per invocation when unset)
    #[arg(long = "session", env = "VISITCOUNT_SESSION")]
    pub id: Option<String>,
}

impl SessionArgs {
    pub fn resolve(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }
}

/// Config from disk, or defaults when it cannot be read.
pub fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "using default configuration");
            Config::default()
        }
    }
}

/// The database under the data dir, as a handle on the durable scope.
pub fn open_database() -> Result<SqliteStore, StorageError> {
    SqliteStore::open(LOCAL_SCOPE)
}

/// Drop session flags older than the configured lifetime.
fn prune_stale_sessions(db: &SqliteStore, config: &Config) {
    let cutoff = chrono::Duration::from_std(config.session_ttl())
        .ok()
        .and_then(|ttl| Utc::now().checked_sub_signed(ttl));
    let Some(cutoff) = cutoff else {
        return;
    };
    if let Err(e) = db.prune_sessions(cutoff) {
        tracing::warn!(error = %e, "could not prune stale sessions");
    }
}

/// Durable and session stores. Without a database both degrade to a store
/// that refuses every operation, and counting continues.
fn open_stores(config: &Config, session_id: &str) -> (Store, Store) {
    match open_database() {
        Ok(local) => {
            prune_stale_sessions(&local, config);
            let session = local.scoped(&session_scope(session_id));
            (Arc::new(session), Arc::new(local))
        }
        Err(e) => {
            tracing::warn!(error = %e, "storage unavailable, continuing without persistence");
            (Arc::new(UnavailableStore), Arc::new(UnavailableStore))
        }
    }
}

pub fn acquirer(config: &Config, session_id: &str) -> Acquirer {
    let (session, local) = open_stores(config, session_id);
    tracing::debug!(session = session_id, "stores ready");

    let resolver = SourceChainResolver::new(
        HttpTransport::new(),
        config.resolver.sources.clone(),
        config.resolver.proxies.clone(),
    )
    .with_timeout(config.resolver.timeout());

    CountAcquirer::new(
        SessionGatekeeper::new(session),
        resolver,
        PersistentCache::new(local),
        config.estimator(),
    )
}
