//! Time-based visit estimate used when neither a remote source nor the local
//! cache can supply a count.
//!
//! The base count is a piecewise growth curve over whole days since launch:
//!
//! ```text
//! days 1..=3    slow start        2 * d (+ 0..=2 when modulated)
//! days 4..=14   compounding       6 * 1.15^(d - 3)
//! days 15..=60  linear            25 + 4 * (d - 14)
//! days 61..     weekly steps      209 + 15 * ((d - 60) / 7)
//! ```
//!
//! With modulation enabled the base is scaled by hour-of-day and
//! day-of-week multipliers and a bounded random jitter.

use std::sync::Mutex;

use chrono::{DateTime, Datelike, Local, NaiveDate, Timelike, Utc, Weekday};
use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;

/// Growth curve breakpoints and rates.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthModel {
    /// Last day of the slow-start phase.
    pub slow_days: u64,
    pub slow_per_day: u64,
    /// Upper bound of the random extra added during slow start.
    pub slow_jitter: u64,
    /// Last day of the compounding phase.
    pub compound_days: u64,
    pub compound_base: f64,
    pub compound_rate: f64,
    /// Last day of the linear phase.
    pub linear_days: u64,
    pub linear_base: u64,
    pub linear_per_day: u64,
    pub steady_base: u64,
    pub steady_per_week: u64,
}

impl Default for GrowthModel {
    fn default() -> Self {
        Self {
            slow_days: 3,
            slow_per_day: 2,
            slow_jitter: 2,
            compound_days: 14,
            compound_base: 6.0,
            compound_rate: 1.15,
            linear_days: 60,
            linear_base: 25,
            linear_per_day: 4,
            steady_base: 209,
            steady_per_week: 15,
        }
    }
}

impl GrowthModel {
    /// Base count for `days` whole days since launch (`days >= 1`).
    pub fn base(&self, days: u64) -> u64 {
        if days <= self.slow_days {
            days.saturating_mul(self.slow_per_day)
        } else if days <= self.compound_days {
            let exp = (days - self.slow_days) as i32;
            (self.compound_base * self.compound_rate.powi(exp)).floor() as u64
        } else if days <= self.linear_days {
            self.linear_base
                .saturating_add((days - self.compound_days).saturating_mul(self.linear_per_day))
        } else {
            let weeks = (days - self.linear_days) / 7;
            self.steady_base
                .saturating_add(weeks.saturating_mul(self.steady_per_week))
        }
    }
}

/// Lower and upper bound of the jitter factor.
pub const JITTER_RANGE: (f64, f64) = (0.85, 1.15);

pub struct Estimator {
    launch: NaiveDate,
    model: GrowthModel,
    modulation: bool,
    rng: Mutex<Mcg128Xsl64>,
}

impl Estimator {
    /// Modulated estimator with an entropy-seeded jitter source.
    pub fn new(launch: NaiveDate) -> Self {
        Self {
            launch,
            model: GrowthModel::default(),
            modulation: true,
            rng: Mutex::new(Mcg128Xsl64::from_entropy()),
        }
    }

    /// Estimator whose output depends only on elapsed days.
    pub fn deterministic(launch: NaiveDate) -> Self {
        Self::new(launch).with_modulation(false)
    }

    pub fn with_modulation(mut self, enabled: bool) -> Self {
        self.modulation = enabled;
        self
    }

    /// Seed the jitter source for reproducible output.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(Mcg128Xsl64::seed_from_u64(seed));
        self
    }

    pub fn launch(&self) -> NaiveDate {
        self.launch
    }

    /// Whole days since launch, never less than 1.
    pub fn elapsed_days(&self, now: DateTime<Utc>) -> u64 {
        let days = (now.date_naive() - self.launch).num_days();
        days.max(1) as u64
    }

    /// Estimated visit count at `now`. Always at least 1.
    pub fn estimate(&self, now: DateTime<Utc>) -> u64 {
        let days = self.elapsed_days(now);
        let base = self.model.base(days);
        if !self.modulation {
            return base.max(1);
        }

        let base = if days <= self.model.slow_days {
            base.saturating_add(self.slow_start_extra())
        } else {
            base
        };
        let local = now.with_timezone(&Local);
        let factor = hour_multiplier(local.hour())
            * day_multiplier(local.weekday())
            * self.jitter();
        ((base as f64 * factor).floor() as u64).max(1)
    }

    fn slow_start_extra(&self) -> u64 {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..=self.model.slow_jitter),
            Err(_) => 0,
        }
    }

    fn jitter(&self) -> f64 {
        let (lo, hi) = JITTER_RANGE;
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(lo..hi),
            Err(_) => 1.0,
        }
    }
}

/// Business hours peak, evening bump, night dip.
fn hour_multiplier(hour: u32) -> f64 {
    match hour {
        9..=17 => 1.3,
        19..=22 => 1.2,
        0..=6 => 0.7,
        _ => 1.0,
    }
}

fn day_multiplier(day: Weekday) -> f64 {
    match day {
        Weekday::Sat | Weekday::Sun => 0.9,
        _ => 1.1,
    }
}
