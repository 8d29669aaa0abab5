use clap::Args;
use visitcount_core::{Animator, CounterWidget, Result};

use crate::app::{self, SessionArgs};
use crate::terminal::TerminalTarget;

#[derive(Args)]
pub struct ShowArgs {
    /// Page path counted on the side
    #[arg(long, default_value = "/")]
    pub path: String,

    #[command(flatten)]
    pub session: SessionArgs,

    /// Print the final value without counting up
    #[arg(long)]
    pub no_animate: bool,
}

pub async fn run(args: ShowArgs) -> Result<()> {
    let config = app::load_config();
    let session_id = args.session.resolve();
    let acquirer = app::acquirer(&config, &session_id);

    let duration_ms = if args.no_animate {
        0
    } else {
        config.display.duration_ms
    };
    let widget = CounterWidget::new(acquirer, Animator::new(Some(TerminalTarget)), duration_ms)
        .with_placeholder(config.display.placeholder.clone());

    let page = config.track_pages.then(|| config.page_key(&args.path));
    let load = widget.load(&config.site_key(), page).await;
    println!();

    // the process would drop the detached request on exit
    if let Some(tracking) = load.tracking {
        if let Err(e) = tracking.await {
            tracing::warn!(error = %e, "page tracking task aborted");
        }
    }

    tracing::debug!(origin = %load.acquisition.origin, "count shown");
    Ok(())
}
