//! The polling loop.
//!
//! The scheduler alternates between two states: idle (sleeping out a jittered
//! interval) and polling (running every source once, in registration order).
//! A cycle always attempts every source; an error or panic in one source is
//! logged and the cycle moves on.

use futures::FutureExt;
use rand::{Rng, rng};
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument};

use crate::config::Layout;
use crate::error::ShimError;
use crate::http::PageFetcher;
use crate::registry::Registry;
use crate::shims::Source;

/// Sleep between cycles: `base` plus a uniform offset in `[-jitter, +jitter]`.
///
/// A fresh offset is drawn for every cycle so deployments that start together
/// drift apart and polling has no strict period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub base: Duration,
    pub jitter: Duration,
}

impl Default for Interval {
    fn default() -> Self {
        Self::from_minutes(30, 2)
    }
}

impl Interval {
    pub fn from_minutes(base: u64, jitter: u64) -> Self {
        Self {
            base: Duration::from_secs(base.saturating_mul(60)),
            jitter: Duration::from_secs(jitter.saturating_mul(60)),
        }
    }

    /// Draw the next delay, rounded to whole seconds and never negative.
    pub fn next_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        let jitter = self.jitter.as_secs_f64();
        let offset = if jitter > 0.0 {
            rng.random_range(-jitter..=jitter)
        } else {
            0.0
        };
        let secs = (self.base.as_secs_f64() + offset).max(0.0).round();
        Duration::from_secs(secs as u64)
    }
}

/// Outcome of one pass over every source.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

pub struct Scheduler<F> {
    sources: Vec<Source>,
    fetcher: F,
    interval: Interval,
}

impl<F: PageFetcher> Scheduler<F> {
    /// Open every registered source, loading its cache.
    ///
    /// A cache that can't be read fails startup rather than being silently
    /// replaced by an empty one on the next write.
    pub async fn open(
        registry: Registry,
        layout: &Layout,
        fetcher: F,
        interval: Interval,
    ) -> Result<Self, ShimError> {
        let mut sources = Vec::with_capacity(registry.len());
        for shim in registry.into_shims() {
            sources.push(Source::open(shim, layout).await?);
        }
        Ok(Self {
            sources,
            fetcher,
            interval,
        })
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Run every source once, in registration order.
    #[instrument(level = "info", skip_all, fields(sources = self.sources.len()))]
    pub async fn run_cycle(&mut self) -> CycleReport {
        let t0 = Instant::now();
        let mut report = CycleReport::default();
        info!("Polling");

        for source in &mut self.sources {
            let key = source.key().to_string();
            let outcome = AssertUnwindSafe(source.run(&self.fetcher))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(summary)) => {
                    info!(
                        source = %key,
                        candidates = summary.candidates,
                        new = summary.new_identifiers.len(),
                        cached = summary.cached,
                        feed_items = summary.feed_items,
                        "Source updated"
                    );
                    report.succeeded.push(key);
                }
                Ok(Err(e)) => {
                    error!(source = %key, kind = e.kind(), error = %e, "Source cycle failed");
                    report.failed.push((key, e.to_string()));
                }
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!(source = %key, error = %message, "Source panicked");
                    report.failed.push((key, message));
                }
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Cycle complete"
        );
        report
    }

    /// Poll forever. Only stops when the process does.
    pub async fn run_forever(&mut self) {
        loop {
            self.run_cycle().await;
            let delay = self.interval.next_delay(&mut rng());
            info!(secs = delay.as_secs(), "Idle until next cycle");
            sleep(delay).await;
        }
    }
}
