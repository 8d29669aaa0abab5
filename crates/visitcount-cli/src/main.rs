use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod terminal;

#[derive(Parser)]
#[command(name = "visitcount", version, about = "Resilient visit counter")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire the site count and animate it
    Show(commands::show::ShowArgs),
    /// Acquire the site count once and print how it was obtained
    Run(commands::run::RunArgs),
    /// Local counter state as JSON
    Stats(commands::stats::StatsArgs),
    /// Clear cached counts and the flags of every session
    Reset,
    /// Time-based estimate of the count
    Estimate(commands::estimate::EstimateArgs),
    /// Print the counter key derived from a page path
    Key {
        /// Page path (e.g. "/blog/hello/")
        path: String,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("visitcount_core={level},visitcount={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Show(args) => commands::show::run(args).await,
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Reset => commands::reset::run(),
        Commands::Estimate(args) => commands::estimate::run(args),
        Commands::Key { path } => commands::key::run(&path),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
