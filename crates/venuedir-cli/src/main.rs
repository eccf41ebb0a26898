mod batch;
mod scrape;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "venuedir")]
#[command(about = "Extract the brand directory of a venue listing")]
struct Cli {
    /// Show the browser window instead of running headless
    #[arg(long, global = true)]
    headed: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape a single venue URL and write its brand report
    Scrape {
        /// Venue listing URL (full or short link)
        url: String,

        /// Report path; derived from the URL when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Scrape every venue in the venues file
    Batch {
        /// Venues file; defaults to `VENUEDIR_VENUES_PATH`
        #[arg(long)]
        venues: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = venuedir_core::load_app_config()?;
    if cli.headed {
        config.headless = false;
    }

    let env_filter = if cli.verbose {
        EnvFilter::try_new("debug")?
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?
    };
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Scrape { url, output } => {
            scrape::run_scrape(&config, &url, output.as_deref()).await
        }
        Commands::Batch { venues } => batch::run_batch(&config, venues.as_deref()).await,
    }
}
