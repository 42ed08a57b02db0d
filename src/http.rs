//! Page retrieval for shims.
//!
//! Shims never talk to `reqwest` directly; they ask a [`PageFetcher`] for
//! the text of a URL. Production code uses [`HttpFetcher`]; tests hand in a
//! canned fetcher so shim logic runs without the network.

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::error::ShimError;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` and return the body as text.
    ///
    /// Non-2xx responses are a [`ShimError::Fetch`].
    async fn fetch_page(&self, url: &str) -> Result<String, ShimError>;
}

/// [`PageFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client that gives up on any single request after `timeout`.
    ///
    /// An unresponsive source would otherwise stall the whole cycle, since
    /// shims run one at a time.
    pub fn new(timeout: Duration) -> Result<Self, ShimError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(ShimError::HttpClient)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch_page(&self, url: &str) -> Result<String, ShimError> {
        let t0 = Instant::now();
        let fetch_err = |reason: String| ShimError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, elapsed_ms = t0.elapsed().as_millis() as u64, "Source returned an error status");
            return Err(fetch_err(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

#[cfg(test)]
pub mod testing {
    //! Canned [`PageFetcher`] for unit tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct StaticFetcher {
        pages: Mutex<HashMap<String, Result<String, String>>>,
        requests: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(self, url: &str, body: &str) -> Self {
            self.set_page(url, body);
            self
        }

        pub fn with_failure(self, url: &str, reason: &str) -> Self {
            self.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), Err(reason.to_string()));
            self
        }

        /// Replace a page between runs.
        pub fn set_page(&self, url: &str, body: &str) {
            self.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), Ok(body.to_string()));
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch_page(&self, url: &str) -> Result<String, ShimError> {
            self.requests.lock().unwrap().push(url.to_string());
            match self.pages.lock().unwrap().get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(reason)) => Err(ShimError::Fetch {
                    url: url.to_string(),
                    reason: reason.clone(),
                }),
                None => Err(ShimError::Fetch {
                    url: url.to_string(),
                    reason: "HTTP 404 Not Found".to_string(),
                }),
            }
        }
    }
}
