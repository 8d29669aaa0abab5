use chrono::{DateTime, Utc};
use clap::Args;
use visitcount_core::{Estimator, Result};

use crate::app;

#[derive(Args)]
pub struct EstimateArgs {
    /// Instant to estimate for, RFC 3339 (default: now)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,

    /// Pure growth curve, no time-of-day or random scaling
    #[arg(long)]
    pub deterministic: bool,
}

pub fn run(args: EstimateArgs) -> Result<()> {
    let config = app::load_config();
    let estimator = if args.deterministic {
        Estimator::deterministic(config.launch_date)
    } else {
        config.estimator()
    };

    let now = args.at.unwrap_or_else(Utc::now);
    tracing::debug!(days = estimator.elapsed_days(now), "days since launch");
    println!("{}", estimator.estimate(now));
    Ok(())
}
