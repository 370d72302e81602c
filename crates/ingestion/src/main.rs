//! SentAI Ingestion CLI
//!
//! Operator commands that run outside the HTTP gateway:
//! 1. `harvest`: replay captured review-page snapshots into spreadsheet and rows files
//! 2. `load`: bulk-load a rows file as reviews owned by an existing user
//! 3. `grant-admin`: promote a user to the admin role

mod commands;
mod errors;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sentai_common::{
    config::{AppConfig, ObservabilityConfig},
    db::{DbPool, Repository},
    harvest::HarvestConfig,
    logging, VERSION,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "ingestion", version = VERSION)]
#[command(about = "SentAI review harvesting and bulk loading")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay captured page snapshots and export the harvested reviews
    Harvest {
        /// JSON file with an array of card snapshots
        #[arg(long)]
        snapshots: PathBuf,
        /// Stop after this many distinct reviews
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Seconds to wait for the page to show more reviews
        #[arg(long, default_value_t = 10)]
        advance_timeout_secs: u64,
        /// Spreadsheet (.xls) output path
        #[arg(long)]
        xls_out: Option<PathBuf>,
        /// Rows JSON output path, accepted by `load`
        #[arg(long)]
        json_out: Option<PathBuf>,
    },
    /// Load a rows file as reviews owned by an existing user
    Load {
        /// JSON array of rows, or an object with a `reviews` array
        #[arg(long)]
        file: PathBuf,
        /// Owner full name
        #[arg(long)]
        full_name: String,
        /// Owner organization
        #[arg(long)]
        organization: String,
    },
    /// Promote a user to the admin role
    GrantAdmin {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        organization: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    // Only `load` and `grant-admin` need the database section
    let config = AppConfig::load();
    match &config {
        Ok(config) => logging::init(&config.observability),
        Err(_) => logging::init(&ObservabilityConfig::default()),
    }

    info!("SentAI Ingestion v{}", VERSION);

    match cli.command {
        Commands::Harvest {
            snapshots,
            limit,
            advance_timeout_secs,
            xls_out,
            json_out,
        } => {
            let page = commands::read_snapshots(&snapshots).await?;
            let harvest_config = HarvestConfig {
                limit,
                advance_timeout: Duration::from_secs(advance_timeout_secs),
            };

            let reviews = commands::harvest(page, harvest_config).await;
            commands::write_outputs(&reviews, xls_out.as_deref(), json_out.as_deref()).await?;
            println!("Harvested {} reviews", reviews.len());
        }
        Commands::Load {
            file,
            full_name,
            organization,
        } => {
            let config = config.context("Failed to load configuration")?;
            let repo = connect(&config).await?;
            let report = commands::load(
                &repo,
                &file,
                &full_name,
                &organization,
                config.ingestion.chunk_size,
            )
            .await?;

            println!("Inserted {} of {} rows", report.success, report.total);
            for error in &report.errors {
                println!("  {}", error);
            }
        }
        Commands::GrantAdmin {
            full_name,
            organization,
        } => {
            let repo = connect(&config.context("Failed to load configuration")?).await?;
            let user = commands::grant_admin(&repo, &full_name, &organization).await?;
            println!("{} ({}) is now {:?}", user.full_name, user.organization, user.role);
        }
    }

    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<Repository> {
    info!("Connecting to database...");
    let pool = DbPool::new(&config.database).await?;
    pool.init_schema().await?;
    Ok(Repository::new(pool))
}
