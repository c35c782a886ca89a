//! # zsemplan — ZSEM timetable scraper daemon
//!
//! Scrapes the class timetable, the substitution pages and the staff
//! directory on cron schedules, appends each result as a snapshot, and prunes
//! every log down to its newest snapshot.
//!
//! Usage:
//!   zsemplan                           # Use ~/.zsemplan/config.toml (or defaults)
//!   zsemplan --config ./zsemplan.toml  # Custom config file
//!   zsemplan -v                        # Debug logging

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;
use zsemplan_core::{ZsemConfig, logs};
use zsemplan_pipeline::Pipelines;
use zsemplan_scheduler::{SchedulerEngine, spawn_scheduler};
use zsemplan_scrape::HttpFetcher;
use zsemplan_store::SnapshotDb;

#[derive(Parser)]
#[command(name = "zsemplan", version, about = "📅 ZSEM timetable and substitutions scraper")]
struct Cli {
    /// Config file (default: ~/.zsemplan/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "zsemplan=debug,zsemplan_core=debug,zsemplan_scrape=debug,zsemplan_store=debug,zsemplan_scheduler=debug,zsemplan_pipeline=debug"
    } else {
        "zsemplan=info,zsemplan_core=info,zsemplan_scrape=info,zsemplan_store=info,zsemplan_scheduler=info,zsemplan_pipeline=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => ZsemConfig::load_from(&shellexpand_path(path))?,
        None => ZsemConfig::load()?,
    };
    tracing::info!("🌐 Source: {}", config.source.base());

    let store = Arc::new(SnapshotDb::open(&config.storage.resolved_db_path())?);
    for log in logs::ALL {
        tracing::info!("🗂️ {log}: {} snapshots", store.count(log)?);
    }
    let fetcher = Arc::new(HttpFetcher::new(&config.source)?);
    let engine = SchedulerEngine::from_config(&config.schedule)?;
    tracing::info!("🕐 Schedules run on {} time", engine.timezone());
    let check_interval = Duration::from_secs(config.schedule.check_interval_secs.max(1));
    let run_budget = Duration::from_secs(config.schedule.run_budget_secs);
    let pipelines = Arc::new(Pipelines::new(fetcher, store, config)?);

    let scheduler = tokio::spawn(spawn_scheduler(
        Arc::new(Mutex::new(engine)),
        move |job| {
            let pipelines = pipelines.clone();
            async move { pipelines.run(job).await }
        },
        check_interval,
        run_budget,
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("👋 Shutting down");
    scheduler.abort();
    Ok(())
}

fn shellexpand_path(path: &std::path::Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string())
}
