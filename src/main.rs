//! valuation-harvester - Scheduled harvester for a municipal property
//! valuation portal

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use valuation_harvester::commands::{InitDbCommand, RunCommand, ScheduleCommand};
use valuation_harvester::config::Config;

#[derive(Parser)]
#[command(
    name = "valuation-harvester",
    version,
    about = "Harvests a municipal property valuation portal into PostgreSQL",
    long_about = "Walks the portal's stateful search form across every property type and volume, snapshots the results into PostgreSQL, and alerts an operator when the portal misbehaves."
)]
struct Cli {
    /// Portal search page URL
    #[arg(long, global = true, env = "PORTAL_BASE_URL")]
    base_url: Option<String>,

    /// PostgreSQL connection URL
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one harvest pass now
    #[command(alias = "r")]
    Run,

    /// Run daily at the configured time until stopped
    #[command(alias = "s")]
    Schedule,

    /// Create the database schema and exit
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env()
            .add_directive(Level::WARN.into())
            .add_directive("valuation_harvester=info".parse()?)
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(base_url) = cli.base_url {
        config.portal.base_url = base_url;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = Some(database_url);
    }

    // Ctrl-C stops the run at the next combination boundary instead of
    // mid-postback.
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            cancel_on_signal.cancel();
        }
    });

    match cli.command {
        Commands::Run => {
            let report = RunCommand::new(config).execute(cancel).await?;
            println!("{}", report.summary());
        }

        Commands::Schedule => {
            ScheduleCommand::new(config).execute(cancel).await?;
        }

        Commands::InitDb => {
            InitDbCommand::new(config).execute().await?;
        }
    }

    Ok(())
}
