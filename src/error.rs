//! Error taxonomy for shim runs.
//!
//! Every failure a shim cycle can hit maps onto one [`ShimError`] variant.
//! The scheduler catches these at the per-shim boundary, so none of them
//! terminate the process once the loop is running.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShimError {
    /// Network or HTTP failure. Retried naturally on the next cycle.
    #[error("fetching {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    /// The page was fetched but the expected structural marker is missing.
    #[error("extraction failed for {source_path}: {reason}")]
    Extraction { source_path: String, reason: String },

    /// A feed or item was constructed with a required field left empty.
    #[error("invalid feed: {0}")]
    Validation(String),

    #[error("I/O error on {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache file {path} is not a JSON array of strings: {source}")]
    CacheFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize feed: {0}")]
    Serialization(String),

    /// The HTTP client could not be constructed at startup.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("source path {0:?} is registered more than once")]
    DuplicateSourcePath(String),

    #[error("source path {0:?} is not filesystem-safe")]
    InvalidSourcePath(String),
}

impl ShimError {
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ShimError::Persistence {
            path: path.into(),
            source,
        }
    }

    pub fn extraction(source_path: impl Into<String>, reason: impl Into<String>) -> Self {
        ShimError::Extraction {
            source_path: source_path.into(),
            reason: reason.into(),
        }
    }

    /// Short label for the error class, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ShimError::Fetch { .. } => "fetch",
            ShimError::Extraction { .. } => "extraction",
            ShimError::Validation(_) => "validation",
            ShimError::Persistence { .. } | ShimError::CacheFormat { .. } => "persistence",
            ShimError::Serialization(_) => "serialization",
            ShimError::HttpClient(_) => "startup",
            ShimError::DuplicateSourcePath(_) | ShimError::InvalidSourcePath(_) => "registry",
        }
    }
}
