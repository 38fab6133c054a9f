//! Radar archive updater service.
//!
//! Periodically scrapes the archive's per-elevation directory listings,
//! downloads new multi-elevation scan files into the local cache,
//! deduplicates against a persisted ledger, and prunes old cached files.
//! Decoding, compositing consumers, and serving live elsewhere.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use updater::config::UpdaterConfig;
use updater::download::MultiAngleDownloader;
use updater::ledger::DownloadLedger;
use updater::scheduler::UpdateScheduler;
use updater::scrape::ArchiveScraper;

#[derive(Parser, Debug)]
#[command(name = "updater")]
#[command(about = "Radar archive updater with multi-elevation downloads")]
struct Args {
    /// Path to a YAML config file (defaults apply when omitted)
    #[arg(long, env = "UPDATER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the archive base URL
    #[arg(long, env = "ARCHIVE_BASE_URL")]
    base_url: Option<String>,

    /// Override the cache directory
    #[arg(long, env = "CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Override the refresh interval in seconds
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Run one refresh cycle and exit (vs continuous scheduling)
    #[arg(long)]
    once: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting radar archive updater");

    let mut config = match &args.config {
        Some(path) => UpdaterConfig::load(path)?,
        None => UpdaterConfig::default(),
    };
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(cache_dir) = args.cache_dir {
        config.cache_dir = cache_dir;
    }
    if let Some(interval) = args.interval_secs {
        config.update_interval_secs = interval;
    }
    if config.angles().is_empty() {
        bail!("No elevation angles configured");
    }

    let config = Arc::new(config);
    tokio::fs::create_dir_all(&config.cache_dir).await?;

    info!(
        base_url = %config.base_url,
        cache_dir = %config.cache_dir.display(),
        angles = config.angles().len(),
        interval_secs = config.update_interval_secs,
        "Configuration loaded"
    );

    // Composition root: the scheduler owns its collaborators explicitly.
    let ledger = Arc::new(DownloadLedger::open(
        config.ledger_path(),
        config.ledger_capacity,
    ));
    let scraper = Arc::new(ArchiveScraper::new(config.clone())?);
    let downloader = MultiAngleDownloader::new(scraper.clone(), config.clone())?;
    let scheduler = UpdateScheduler::new(scraper, downloader, ledger.clone(), config.clone());

    if args.once {
        info!("Running single refresh cycle");
        scheduler.run_cycle().await;
    } else {
        // Handle Ctrl+C
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
            shutdown_tx_clone.send(()).ok();
        });

        scheduler.run_forever(shutdown_tx.subscribe()).await;
    }

    info!(
        tracked_scans = ledger.len(),
        last_check = %ledger.last_check(),
        "Updater session complete"
    );

    Ok(())
}
