//! Command-line interface definitions for rss_shim.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every option can also be set through an environment variable, which is how
//! container deployments configure it.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for rss_shim.
///
/// # Examples
///
/// ```sh
/// # Poll forever, keeping state and feeds under ./data
/// rss_shim
///
/// # Serve feeds from a separate web root and advertise their public URL
/// rss_shim --feed-dir /srv/www/feeds --feed-url-origin https://feeds.example.org
///
/// # Run a single cycle and exit
/// rss_shim --once
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Base directory for cache and feed files
    #[arg(short, long, env = "DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory for per-source cache files (defaults to <data-dir>/cache)
    #[arg(long, env = "CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory for per-source RSS files (defaults to <data-dir>/feeds)
    #[arg(long, env = "FEED_DIR")]
    pub feed_dir: Option<PathBuf>,

    /// Public URL the feed directory is served at; enables `atom:link rel="self"`
    #[arg(long, env = "FEED_URL_ORIGIN")]
    pub feed_url_origin: Option<String>,

    /// Base polling interval in minutes
    #[arg(
        long,
        env = "POLL_INTERVAL_MINUTES",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_minutes: u64,

    /// Maximum jitter applied to each interval, in minutes either way
    #[arg(long, env = "POLL_JITTER_MINUTES", default_value_t = 2)]
    pub jitter_minutes: u64,

    /// Per-request timeout for source pages, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Run one cycle and exit instead of polling forever
    #[arg(long)]
    pub once: bool,
}
