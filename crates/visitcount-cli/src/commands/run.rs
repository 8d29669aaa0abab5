use clap::Args;
use serde::Serialize;
use visitcount_core::{Acquisition, CoreError, Result};

use crate::app::{self, SessionArgs};

#[derive(Args)]
pub struct RunArgs {
    /// Page path counted on the side
    #[arg(long, default_value = "/")]
    pub path: String,

    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Serialize)]
struct RunReport {
    session: String,
    #[serde(flatten)]
    acquisition: Acquisition,
    /// Page counter a tracking attempt was made for.
    tracked_page: Option<String>,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let config = app::load_config();
    let session = args.session.resolve();
    let acquirer = app::acquirer(&config, &session);

    let acquisition = acquirer.acquire_detailed(&config.site_key()).await;

    let mut tracked_page = None;
    if config.track_pages {
        let page = config.page_key(&args.path);
        if let Some(tracking) = acquirer.spawn_tracking(page.clone()) {
            tracking
                .await
                .map_err(|e| CoreError::Custom(format!("page tracking task failed: {e}")))?;
            tracked_page = Some(page.key);
        }
    }

    let report = RunReport {
        session,
        acquisition,
        tracked_page,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
