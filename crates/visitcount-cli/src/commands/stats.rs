use clap::Args;
use visitcount_core::{Result, StatsReport};

use crate::app::{self, SessionArgs};

#[derive(Args)]
pub struct StatsArgs {
    /// Page path to include
    #[arg(long, default_value = "/")]
    pub path: String,

    #[command(flatten)]
    pub session: SessionArgs,
}

pub fn run(args: StatsArgs) -> Result<()> {
    let config = app::load_config();
    let acquirer = app::acquirer(&config, &args.session.resolve());

    let page = config.page_key(&args.path);
    let report = StatsReport::collect(
        &acquirer,
        &config.site_key(),
        Some(&page),
        env!("CARGO_PKG_VERSION"),
    );
    println!("{}", report.export()?);
    Ok(())
}
