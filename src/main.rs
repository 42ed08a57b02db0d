//! # rss_shim
//!
//! Polls web pages that publish no feed of their own, remembers every item
//! identifier it has seen, and republishes the history as RSS 2.0 feeds.
//!
//! ## Usage
//!
//! ```sh
//! rss_shim --data-dir ./data --feed-url-origin https://feeds.example.org
//! ```
//!
//! ## Architecture
//!
//! 1. **Startup**: parse configuration, create the cache and feed roots,
//!    validate the source registry, load every source's cache
//! 2. **Cycle**: run each shim in registration order: fetch candidates,
//!    update the dedup cache, rebuild and write its feed
//! 3. **Idle**: sleep for the base interval plus random jitter, then repeat

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cache;
mod cli;
mod config;
mod error;
mod extract;
mod http;
mod models;
mod outputs;
mod registry;
mod scheduler;
mod shims;
mod utils;

use cli::Cli;
use config::Layout;
use http::HttpFetcher;
use registry::{Registry, default_shims};
use scheduler::{Interval, Scheduler};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "rss_shim starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let layout = Layout::from_cli(&args).inspect_err(|e| {
        error!(origin = ?args.feed_url_origin, error = %e, "Invalid feed URL origin");
    })?;
    if let Err(e) = layout.init().await {
        error!(
            cache_dir = %layout.cache_dir.display(),
            feed_dir = %layout.feed_dir.display(),
            error = %e,
            "Data directories are not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }
    info!(
        cache_dir = %layout.cache_dir.display(),
        feed_dir = %layout.feed_dir.display(),
        feed_url_origin = ?layout.feed_url_origin.as_ref().map(|u| u.as_str()),
        "Data directories ready"
    );

    let registry = Registry::new(default_shims())?;
    info!(sources = ?registry.keys(), "Registered sources");

    let fetcher = HttpFetcher::new(Duration::from_secs(args.fetch_timeout_secs))?;
    let interval = Interval::from_minutes(args.interval_minutes, args.jitter_minutes);
    let mut scheduler = Scheduler::open(registry, &layout, fetcher, interval).await?;
    for source in scheduler.sources() {
        debug!(
            source = source.key(),
            cached = source.seen().len(),
            feed = %source.feed_file().display(),
            "Source ready"
        );
    }

    if args.once {
        let report = scheduler.run_cycle().await;
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Single cycle complete"
        );
        return Ok(());
    }

    info!(
        base_secs = interval.base.as_secs(),
        jitter_secs = interval.jitter.as_secs(),
        "Entering polling loop"
    );
    scheduler.run_forever().await;
    Ok(())
}
