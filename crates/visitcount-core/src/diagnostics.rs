//! Point-in-time report of local counter state for manual testing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::key::CounterKey;
use crate::orchestrator::CountAcquirer;
use crate::sources::CountTransport;
use crate::storage::KeyValueStore;

/// Local view of one counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterStats {
    pub key: CounterKey,
    /// Last count held by the persistent cache.
    pub cached_count: Option<u64>,
    pub cached_at: Option<DateTime<Utc>>,
    /// This session already caused an increment.
    pub counted_this_session: bool,
}

/// Everything `stats` prints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub generated_at: DateTime<Utc>,
    pub app_version: String,
    pub site: CounterStats,
    pub page: Option<CounterStats>,
    /// Sources in the order they are tried.
    pub sources: Vec<String>,
    /// What the estimator would show right now.
    pub estimate: u64,
    pub launch_date: String,
}

impl StatsReport {
    /// Collect the report without touching the network.
    pub fn collect<T, SS, PS>(
        acquirer: &CountAcquirer<T, SS, PS>,
        site: &CounterKey,
        page: Option<&CounterKey>,
        app_version: impl Into<String>,
    ) -> Self
    where
        T: CountTransport + 'static,
        SS: KeyValueStore + 'static,
        PS: KeyValueStore,
    {
        let now = acquirer.now();
        Self {
            generated_at: now,
            app_version: app_version.into(),
            site: counter_stats(acquirer, site),
            page: page.map(|p| counter_stats(acquirer, p)),
            sources: acquirer
                .resolver()
                .sources()
                .iter()
                .map(|s| s.name.clone())
                .collect(),
            estimate: acquirer.estimator().estimate(now),
            launch_date: acquirer.estimator().launch().to_string(),
        }
    }

    /// Pretty JSON export.
    pub fn export(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn counter_stats<T, SS, PS>(acquirer: &CountAcquirer<T, SS, PS>, key: &CounterKey) -> CounterStats
where
    T: CountTransport + 'static,
    SS: KeyValueStore + 'static,
    PS: KeyValueStore,
{
    CounterStats {
        key: key.clone(),
        cached_count: acquirer.cache().load(key),
        cached_at: acquirer.cache().last_updated(key),
        counted_this_session: !acquirer.gatekeeper().should_increment(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PersistentCache;
    use crate::estimator::Estimator;
    use crate::session::SessionGatekeeper;
    use crate::sources::{default_sources, HttpTransport, SourceChainResolver};
    use crate::storage::MemoryStore;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn report_reflects_local_state() {
        let launch = NaiveDate::from_ymd_opt(2025, 7, 2).unwrap();
        let acq = CountAcquirer::new(
            SessionGatekeeper::new(MemoryStore::new()),
            SourceChainResolver::new(HttpTransport::new(), default_sources(), vec![]),
            PersistentCache::new(MemoryStore::new()),
            Estimator::deterministic(launch),
        )
        .with_clock(|| Utc.with_ymd_and_hms(2025, 7, 3, 8, 0, 0).unwrap());

        let site = CounterKey::new("example.com", "site-total");
        let page = CounterKey::for_page("example.com", "/");
        acq.cache().store(&site, 12);
        acq.gatekeeper().mark_incremented(&site);

        let report = StatsReport::collect(&acq, &site, Some(&page), "0.1.0");

        assert_eq!(report.site.cached_count, Some(12));
        assert!(report.site.cached_at.is_some());
        assert!(report.site.counted_this_session);
        let page_stats = report.page.as_ref().unwrap();
        assert_eq!(page_stats.key.key, "page-home");
        assert!(!page_stats.counted_this_session);
        assert_eq!(report.sources, vec!["countapi", "counterapi"]);
        assert_eq!(report.estimate, 2);
        assert_eq!(report.launch_date, "2025-07-02");

        let json = report.export().unwrap();
        assert!(json.contains("\"cached_count\": 12"));
    }
}
