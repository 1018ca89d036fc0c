//! Status Harvester CLI
//!
//! Local execution entry point. Scheduling repeated runs is left to cron or
//! whatever invokes this binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use status_harvester::{
    error::Result,
    models::Config,
    pipeline,
    services::HttpDocumentClient,
    storage::{self, LocalStorage},
};

/// Status Harvester - status feed from document store annotations
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Harvests [system] status blocks into a status snapshot"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "harvester.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one harvest and replace the stored snapshot
    Harvest {
        /// Snapshot output path (default: output.snapshot_path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only fetch pages updated within this many hours
        #[arg(long, conflicts_with = "full")]
        since_hours: Option<u64>,

        /// Re-scan every page regardless of update time
        #[arg(long)]
        full: bool,

        /// Child document recursion depth
        #[arg(long)]
        depth: Option<u32>,

        /// Page bodies fetched in parallel
        #[arg(long)]
        concurrency: Option<usize>,

        /// Case-insensitive document name pattern
        #[arg(long)]
        filter: Option<String>,
    },

    /// Print the stored snapshot (or the empty fallback)
    Show {
        /// Snapshot path (default: output.snapshot_path)
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Harvest {
            output,
            since_hours,
            full,
            depth,
            concurrency,
            filter,
        } => {
            if let Some(path) = output {
                config.output.snapshot_path = path;
            }
            if let Some(hours) = since_hours {
                config.harvest.since_hours = Some(hours);
                config.harvest.full_resync = false;
            }
            if full {
                config.harvest.full_resync = true;
            }
            if let Some(depth) = depth {
                config.harvest.max_depth = depth;
            }
            if let Some(concurrency) = concurrency {
                config.harvest.concurrency = concurrency;
            }
            if filter.is_some() {
                config.harvest.document_filter = filter;
            }

            if let Err(e) = config.validate() {
                log::error!("Refusing to start: {e}");
                return Err(e);
            }

            let api = HttpDocumentClient::new(&config)?;
            let storage = LocalStorage::new(&config.output.snapshot_path);
            let snapshot = pipeline::run_harvester(&config, &api, &storage).await?;

            log::info!(
                "Harvest complete: {} messages, overall {:?}",
                snapshot.messages.len(),
                snapshot.overall
            );
        }

        Command::Show { snapshot } => {
            let path = snapshot.unwrap_or(config.output.snapshot_path);
            let sink = LocalStorage::new(path);
            log::debug!("Reading snapshot from {}", sink.path().display());
            let snapshot = storage::load_snapshot_or_empty(&sink).await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (workspace {})", config.api.workspace_id);
            log::info!("    documents filter: {:?}", config.harvest.document_filter);
            log::info!("    max depth: {}", config.harvest.max_depth);
            log::info!(
                "    delta scan: {}",
                match (config.harvest.full_resync, config.harvest.since_hours) {
                    (false, Some(hours)) => format!("last {hours}h"),
                    _ => "full resync".to_string(),
                }
            );
            log::info!("    snapshot: {}", config.output.snapshot_path.display());
        }
    }

    Ok(())
}
