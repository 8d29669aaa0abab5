//! Page-load flow: placeholder, acquisition, count-up, per-page tracking.

use std::sync::Mutex;

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use tokio::task::JoinHandle;

use crate::animator::{Animator, DisplayTarget, LOADING_PLACEHOLDER};
use crate::key::CounterKey;
use crate::orchestrator::{Acquisition, CountAcquirer};
use crate::sources::CountTransport;
use crate::storage::KeyValueStore;

/// Outcome of one page load.
#[derive(Debug)]
pub struct PageLoad {
    pub acquisition: Acquisition,
    /// Value the animation started from.
    pub start: u64,
    /// Detached per-page tracking attempt, if one was launched.
    pub tracking: Option<JoinHandle<()>>,
}

pub struct CounterWidget<T, SS, PS, D> {
    acquirer: CountAcquirer<T, SS, PS>,
    animator: Animator<D>,
    duration_ms: u64,
    placeholder: String,
    rng: Mutex<Mcg128Xsl64>,
}

impl<T, SS, PS, D> CounterWidget<T, SS, PS, D>
where
    T: CountTransport + 'static,
    SS: KeyValueStore + 'static,
    PS: KeyValueStore,
    D: DisplayTarget,
{
    pub fn new(acquirer: CountAcquirer<T, SS, PS>, animator: Animator<D>, duration_ms: u64) -> Self {
        Self {
            acquirer,
            animator,
            duration_ms,
            placeholder: LOADING_PLACEHOLDER.to_string(),
            rng: Mutex::new(Mcg128Xsl64::from_entropy()),
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Seed the start-offset source for reproducible animations.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(Mcg128Xsl64::seed_from_u64(seed));
        self
    }

    pub fn acquirer(&self) -> &CountAcquirer<T, SS, PS> {
        &self.acquirer
    }

    pub fn animator(&self) -> &Animator<D> {
        &self.animator
    }

    /// Run the whole page-load flow for `site`, tracking `page` on the side.
    pub async fn load(&self, site: &CounterKey, page: Option<CounterKey>) -> PageLoad {
        if !self.animator.has_target() {
            tracing::warn!("counter display target not found, count will not be shown");
        }
        self.animator.show_text(&self.placeholder);

        let acquisition = self.acquirer.acquire_detailed(site).await;
        let start = self.start_value(acquisition.value);
        self.animator
            .render(start, acquisition.value, self.duration_ms)
            .await;

        let tracking = page.and_then(|page| self.acquirer.spawn_tracking(page));

        PageLoad {
            acquisition,
            start,
            tracking,
        }
    }

    /// A few below the final value, never below 1 and never above the value.
    fn start_value(&self, value: u64) -> u64 {
        let offset = match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(2..=6),
            Err(_) => 2,
        };
        value.saturating_sub(offset).max(1).min(value)
    }
}
