//! Shims: one adapter per external source, all driven by one run algorithm.
//!
//! A [`Shim`] knows three things about its source: where its files live
//! ([`Shim::source_path`]), how to find item identifiers on the live page
//! ([`Shim::fetch_candidates`]), and how to dress the cached identifiers up as
//! a feed ([`Shim::describe`], [`Shim::build_feed`]). Everything else, the
//! cache bookkeeping and file output, lives in [`Source::run`] and is the
//! same for every shim.
//!
//! # Supported Sources
//!
//! | Source | Module | Candidates per poll |
//! |--------|--------|---------------------|
//! | Comics Kingdom strips | [`comics_kingdom`] | one canonical strip URL |
//! | Astral blog | [`astral`] | every post listed on the blog index |
//!
//! # Adding a source
//!
//! 1. Create a module under `src/shims/`.
//! 2. Implement [`Shim`]; keep HTML parsing in synchronous helpers so the
//!    fetch future stays `Send`.
//! 3. Register it in [`crate::registry::default_shims`].

pub mod astral;
pub mod comics_kingdom;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::cache::SeenIdentifiers;
use crate::config::Layout;
use crate::error::ShimError;
use crate::http::PageFetcher;
use crate::models::{Candidate, Feed, FeedItem, MAX_FEED_ITEMS};
use crate::outputs::files::write_atomic;
use crate::outputs::rss::to_rss;

#[async_trait]
pub trait Shim: Send + Sync {
    /// Unique, filesystem-safe key that namespaces this source's files,
    /// e.g. `comics_kingdom/rae_the_doe`.
    fn source_path(&self) -> String;

    /// Fetch the source page and pull out item identifiers, newest first.
    ///
    /// Zero candidates is not an error. A page missing the structure the
    /// shim expects is a [`ShimError::Extraction`].
    async fn fetch_candidates(&self, fetcher: &dyn PageFetcher)
    -> Result<Vec<Candidate>, ShimError>;

    /// Turn a cached identifier into a feed item.
    ///
    /// `fetched` is the candidate from this poll with the same identifier,
    /// when the source still lists it. The default uses whatever metadata the
    /// candidate carried and falls back to the identifier as title.
    fn describe(&self, identifier: &str, fetched: Option<&Candidate>) -> FeedItem {
        let title = fetched
            .and_then(|c| c.title.clone())
            .unwrap_or_else(|| identifier.to_string());
        let mut item = FeedItem::new(title)
            .with_link(identifier)
            .with_published_at(fetched.and_then(|c| c.published_at));
        if let Some(description) = fetched.and_then(|c| c.description.clone()) {
            item = item.with_description(description);
        }
        item
    }

    /// Assemble channel metadata around `items` (newest first).
    fn build_feed(&self, items: Vec<FeedItem>, self_url: Option<String>)
    -> Result<Feed, ShimError>;
}

/// Result of one successful [`Source::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub candidates: usize,
    pub new_identifiers: Vec<String>,
    pub cached: usize,
    pub feed_items: usize,
}

/// A registered shim together with the cache it owns.
///
/// The cache is loaded once in [`Source::open`] and kept in memory across
/// runs; the file on disk is rewritten whenever it changes.
pub struct Source {
    shim: Box<dyn Shim>,
    key: String,
    seen: SeenIdentifiers,
    cache_file: PathBuf,
    feed_file: PathBuf,
    feed_url: Option<String>,
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("key", &self.key)
            .field("cached", &self.seen.len())
            .field("cache_file", &self.cache_file)
            .field("feed_file", &self.feed_file)
            .finish()
    }
}

impl Source {
    /// Resolve file locations for `shim` and load its cache.
    pub async fn open(shim: Box<dyn Shim>, layout: &Layout) -> Result<Self, ShimError> {
        let key = shim.source_path();
        let cache_file = layout.cache_file(&key);
        let feed_file = layout.feed_file(&key);
        let feed_url = layout.feed_url(&key);
        let seen = SeenIdentifiers::load(&cache_file).await?;
        info!(source = %key, cached = seen.len(), "Opened source");
        Ok(Self {
            shim,
            key,
            seen,
            cache_file,
            feed_file,
            feed_url,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn seen(&self) -> &SeenIdentifiers {
        &self.seen
    }

    pub fn feed_file(&self) -> &Path {
        &self.feed_file
    }

    /// Poll the source once and rewrite its feed.
    ///
    /// 1. Fetch candidates.
    /// 2. Prepend the unseen ones to the cache, keeping the source's order.
    /// 3. Persist the cache if anything was new.
    /// 4. Describe the newest [`MAX_FEED_ITEMS`] identifiers, build the feed,
    ///    serialize it, and replace the feed file.
    ///
    /// On any error the in-memory cache, the cache file and the feed file are
    /// left as they were before the run, except that a cache already persisted
    /// in step 3 stays persisted when a later step fails.
    #[instrument(level = "info", skip_all, fields(source = %self.key))]
    pub async fn run(&mut self, fetcher: &dyn PageFetcher) -> Result<RunSummary, ShimError> {
        let candidates = self.shim.fetch_candidates(fetcher).await?;
        debug!(count = candidates.len(), "Fetched candidates");

        let mut next = self.seen.clone();
        let new_identifiers =
            next.observe_all(candidates.iter().map(|c| c.identifier.as_str()));
        if !new_identifiers.is_empty() {
            for id in &new_identifiers {
                info!(identifier = %id, "Found new item");
            }
            next.persist(&self.cache_file).await?;
            self.seen = next;
        }

        let by_identifier: HashMap<&str, &Candidate> = candidates
            .iter()
            .map(|c| (c.identifier.as_str(), c))
            .collect();
        let items: Vec<FeedItem> = self
            .seen
            .newest(MAX_FEED_ITEMS)
            .iter()
            .map(|id| {
                self.shim
                    .describe(id, by_identifier.get(id.as_str()).copied())
            })
            .collect();

        let feed = self.shim.build_feed(items, self.feed_url.clone())?;
        let rss = to_rss(&feed)?;
        write_atomic(&self.feed_file, rss.as_bytes()).await?;

        Ok(RunSummary {
            candidates: candidates.len(),
            new_identifiers,
            cached: self.seen.len(),
            feed_items: feed.rendered_items().len(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ListShim;
    use super::*;
    use crate::http::testing::StaticFetcher;

    fn layout(dir: &std::path::Path) -> Layout {
        Layout::new(dir.join("cache"), dir.join("feeds"), None).unwrap()
    }

    fn feed_items(path: &std::path::Path) -> Vec<(String, String)> {
        let xml = std::fs::read_to_string(path).unwrap();
        let channel = ::rss::Channel::read_from(xml.as_bytes()).unwrap();
        channel
            .items()
            .iter()
            .map(|i| {
                (
                    i.title().unwrap_or_default().to_string(),
                    i.link().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_new_candidate_is_prepended() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());
        SeenIdentifiers::from_ids(["B", "A"])
            .persist(&layout.cache_file("list"))
            .await
            .unwrap();

        let fetcher = StaticFetcher::new().with_page("https://example.org/list", "C\n");
        let mut source = Source::open(Box::new(ListShim::new("list")), &layout)
            .await
            .unwrap();
        let summary = source.run(&fetcher).await.unwrap();

        assert_eq!(summary.new_identifiers, ["C"]);
        assert_eq!(source.seen().as_slice(), ["C", "B", "A"]);
        let on_disk = SeenIdentifiers::load(&layout.cache_file("list")).await.unwrap();
        assert_eq!(on_disk.as_slice(), ["C", "B", "A"]);

        let links: Vec<String> = feed_items(source.feed_file())
            .into_iter()
            .map(|(_, link)| link)
            .collect();
        assert_eq!(links, ["C", "B", "A"]);
    }

    #[tokio::test]
    async fn test_second_run_without_news_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());
        let fetcher = StaticFetcher::new().with_page("https://example.org/list", "B\nA\n");
        let mut source = Source::open(Box::new(ListShim::new("list")), &layout)
            .await
            .unwrap();

        source.run(&fetcher).await.unwrap();
        let cache_before = std::fs::read(layout.cache_file("list")).unwrap();
        let items_before = feed_items(source.feed_file());

        let summary = source.run(&fetcher).await.unwrap();
        assert!(summary.new_identifiers.is_empty());
        assert_eq!(std::fs::read(layout.cache_file("list")).unwrap(), cache_before);
        assert_eq!(feed_items(source.feed_file()), items_before);
    }

    #[tokio::test]
    async fn test_zero_candidates_rebuilds_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());
        SeenIdentifiers::from_ids(["B", "A"])
            .persist(&layout.cache_file("list"))
            .await
            .unwrap();

        let fetcher = StaticFetcher::new().with_page("https://example.org/list", "");
        let mut source = Source::open(Box::new(ListShim::new("list")), &layout)
            .await
            .unwrap();
        let summary = source.run(&fetcher).await.unwrap();

        assert_eq!(summary.candidates, 0);
        assert_eq!(summary.feed_items, 2);
        assert!(source.feed_file().is_file());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_files_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());
        let fetcher = StaticFetcher::new().with_page("https://example.org/list", "A\n");
        let mut source = Source::open(Box::new(ListShim::new("list")), &layout)
            .await
            .unwrap();
        source.run(&fetcher).await.unwrap();
        let feed_before = std::fs::read(source.feed_file()).unwrap();

        let failing = StaticFetcher::new().with_failure("https://example.org/list", "timeout");
        let err = source.run(&failing).await.unwrap_err();
        assert_eq!(err.kind(), "fetch");
        assert_eq!(std::fs::read(source.feed_file()).unwrap(), feed_before);
        assert_eq!(source.seen().as_slice(), ["A"]);
    }

    #[tokio::test]
    async fn test_unwritable_cache_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());
        let fetcher = StaticFetcher::new().with_page("https://example.org/list", "A\n");
        let mut source = Source::open(Box::new(ListShim::new("list")), &layout)
            .await
            .unwrap();

        // A directory where the cache file belongs makes the rename fail.
        let cache_file = layout.cache_file("list");
        std::fs::create_dir_all(&cache_file).unwrap();
        let err = source.run(&fetcher).await.unwrap_err();
        assert_eq!(err.kind(), "persistence");
        assert!(source.seen().is_empty());
        assert!(!source.feed_file().exists());
        assert!(!layout.cache_dir.join(".list.json.tmp").exists());

        std::fs::remove_dir(&cache_file).unwrap();
        let summary = source.run(&fetcher).await.unwrap();
        assert_eq!(summary.new_identifiers, ["A"]);
        assert_eq!(source.seen().as_slice(), ["A"]);
        assert!(source.feed_file().is_file());
    }

    #[tokio::test]
    async fn test_unwritable_feed_keeps_persisted_cache() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());
        let fetcher = StaticFetcher::new().with_page("https://example.org/list", "A\n");
        let mut source = Source::open(Box::new(ListShim::new("list")), &layout)
            .await
            .unwrap();

        let feed_file = layout.feed_file("list");
        std::fs::create_dir_all(&feed_file).unwrap();
        let err = source.run(&fetcher).await.unwrap_err();
        assert_eq!(err.kind(), "persistence");
        assert_eq!(source.seen().as_slice(), ["A"]);
        let on_disk = SeenIdentifiers::load(&layout.cache_file("list")).await.unwrap();
        assert_eq!(on_disk.as_slice(), ["A"]);

        std::fs::remove_dir(&feed_file).unwrap();
        let summary = source.run(&fetcher).await.unwrap();
        assert!(summary.new_identifiers.is_empty());
        let links: Vec<String> = feed_items(source.feed_file())
            .into_iter()
            .map(|(_, link)| link)
            .collect();
        assert_eq!(links, ["A"]);
    }

    #[tokio::test]
    async fn test_feed_bounded_to_newest_ten() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());
        let page: String = (0..25).map(|i| format!("item-{i:02}\n")).collect();
        let fetcher = StaticFetcher::new().with_page("https://example.org/list", &page);
        let mut source = Source::open(Box::new(ListShim::new("list")), &layout)
            .await
            .unwrap();

        let summary = source.run(&fetcher).await.unwrap();
        assert_eq!(summary.cached, 25);
        assert_eq!(summary.feed_items, MAX_FEED_ITEMS);
        let links: Vec<String> = feed_items(source.feed_file())
            .into_iter()
            .map(|(_, link)| link)
            .collect();
        assert_eq!(links, source.seen().newest(MAX_FEED_ITEMS));
        assert_eq!(links[0], "item-00");
    }

    #[tokio::test]
    async fn test_self_url_comes_from_layout() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(
            dir.path().join("cache"),
            dir.path().join("feeds"),
            Some("https://feeds.example.net"),
        )
        .unwrap();
        let fetcher = StaticFetcher::new().with_page("https://example.org/list", "A\n");
        let mut source = Source::open(Box::new(ListShim::new("list")), &layout)
            .await
            .unwrap();
        source.run(&fetcher).await.unwrap();

        let xml = std::fs::read_to_string(source.feed_file()).unwrap();
        assert!(xml.contains(r#"href="https://feeds.example.net/list.rss""#));
    }
}
