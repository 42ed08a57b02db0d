//! Deployment layout: where cache and feed files live, and where feeds are served.
//!
//! Cache files and feed files have independent roots so feed documents can
//! be served from a web root without exposing internal state. Directories are
//! only created by [`Layout::init`], which the composition root calls once at
//! startup.

use std::path::{Path, PathBuf};
use url::Url;

use crate::cli::Cli;
use crate::error::ShimError;
use crate::utils::ensure_writable_dir;

#[derive(Debug, Clone)]
pub struct Layout {
    pub cache_dir: PathBuf,
    pub feed_dir: PathBuf,
    /// Public URL of `feed_dir`, always ending in `/`.
    pub feed_url_origin: Option<Url>,
}

impl Layout {
    /// Build a layout from explicit roots.
    ///
    /// # Arguments
    ///
    /// * `cache_dir` - Root for per-source cache files
    /// * `feed_dir` - Root for per-source RSS files
    /// * `feed_url_origin` - Public URL `feed_dir` is served at. Blank means none.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if `feed_url_origin` is not an absolute URL.
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        feed_dir: impl Into<PathBuf>,
        feed_url_origin: Option<&str>,
    ) -> Result<Self, url::ParseError> {
        let feed_url_origin = feed_url_origin
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|origin| {
                // Without the trailing slash, join() would replace the last segment.
                if origin.ends_with('/') {
                    Url::parse(origin)
                } else {
                    Url::parse(&format!("{origin}/"))
                }
            })
            .transpose()?;

        Ok(Self {
            cache_dir: cache_dir.into(),
            feed_dir: feed_dir.into(),
            feed_url_origin,
        })
    }

    /// Resolve the layout from parsed arguments.
    ///
    /// `--cache-dir` and `--feed-dir` win when given; otherwise both roots
    /// sit under `--data-dir` as `cache/` and `feeds/`.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if `--feed-url-origin` is not an absolute URL.
    pub fn from_cli(cli: &Cli) -> Result<Self, url::ParseError> {
        let cache_dir = cli
            .cache_dir
            .clone()
            .unwrap_or_else(|| cli.data_dir.join("cache"));
        let feed_dir = cli
            .feed_dir
            .clone()
            .unwrap_or_else(|| cli.data_dir.join("feeds"));
        Self::new(cache_dir, feed_dir, cli.feed_url_origin.as_deref())
    }

    /// Create both roots and check they are writable.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::Persistence`] for the first root that can't be
    /// created or written to.
    pub async fn init(&self) -> Result<(), ShimError> {
        ensure_writable_dir(&self.cache_dir).await?;
        ensure_writable_dir(&self.feed_dir).await
    }

    /// Cache file for a source: `<cache_dir>/<source_path>.json`.
    ///
    /// Nested source paths such as `comics_kingdom/rae_the_doe` map to nested
    /// files; the parent directory is created on first write.
    pub fn cache_file(&self, source_path: &str) -> PathBuf {
        join_key(&self.cache_dir, source_path, "json")
    }

    /// Feed document for a source: `<feed_dir>/<source_path>.rss`.
    pub fn feed_file(&self, source_path: &str) -> PathBuf {
        join_key(&self.feed_dir, source_path, "rss")
    }

    /// Externally reachable URL of a source's feed, if an origin is configured.
    pub fn feed_url(&self, source_path: &str) -> Option<String> {
        let origin = self.feed_url_origin.as_ref()?;
        origin
            .join(&format!("{source_path}.rss"))
            .ok()
            .map(String::from)
    }
}

fn join_key(root: &Path, source_path: &str, extension: &str) -> PathBuf {
    root.join(format!("{source_path}.{extension}"))
}
