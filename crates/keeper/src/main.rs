use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::time;

use iusd_keeper::{Keeper, KeeperConfig};

#[derive(Parser, Debug)]
#[command(name = "iusd-keeper")]
#[command(about = "iUSD protocol off-chain rebase/allocation keeper")]
struct Args {
    /// Path to keeper configuration file
    #[arg(short, long, default_value = "keeper.toml")]
    config: String,

    /// Tick interval in seconds, overriding the configured value
    #[arg(short, long)]
    interval: Option<u64>,

    /// Dry run mode - run jobs but don't persist the snapshot
    #[arg(long)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .init();

    log::info!("Starting iUSD keeper");

    if args.dry_run {
        log::warn!("Running in DRY RUN mode - snapshot will not be persisted");
    }

    // Load configuration
    let config = KeeperConfig::load(&args.config)
        .with_context(|| format!("loading keeper config from {}", args.config))?;

    let interval_secs = args.interval.unwrap_or(config.tick_interval_secs);
    let health_log_every = config.health_log_every;
    log::info!("Snapshot path: {}", config.snapshot_path);
    log::info!("Tick interval: {}s", interval_secs);
    log::info!("Enabled jobs: {:?}", config.enabled_jobs());

    // Initialize keeper
    let mut keeper = Keeper::new(config, args.dry_run).context("initializing keeper")?;

    log::info!("Keeper initialized successfully");

    // Start main job loop
    let mut interval_timer = time::interval(Duration::from_secs(interval_secs));
    let mut iteration = 0u64;

    loop {
        interval_timer.tick().await;
        iteration += 1;

        log::debug!("Starting keeper iteration {}", iteration);

        match keeper.run_all_jobs().await {
            Ok(jobs) => {
                if jobs > 0 {
                    log::info!("Iteration {}: ran {} jobs", iteration, jobs);
                } else {
                    log::debug!("Iteration {}: no jobs due", iteration);
                }
            }
            Err(e) => {
                log::error!("Error in keeper iteration {}: {}", iteration, e);
                // Continue running even if individual iterations fail
            }
        }

        // Basic health metrics every N iterations
        if iteration % health_log_every == 0 {
            if let Err(e) = keeper.health_check() {
                log::warn!("Health check warning: {}", e);
            }
        }
    }
}
