//! Comics Kingdom strip shim.
//!
//! This module follows one comic on [Comics Kingdom](https://comicskingdom.com),
//! a comic strip syndication platform. The comic's landing page always shows
//! the latest strip and advertises it through
//! `<link rel="canonical" href="https://comicskingdom.com/<comic>/YYYY-MM-DD">`.
//!
//! # URL Pattern
//!
//! Strip URLs end in the strip date, which is where item titles and publish
//! dates come from. Only the newest strip is visible per poll; older ones
//! accumulate in the cache.

use async_trait::async_trait;
use tracing::{instrument, warn};
use url::Url;

use super::Shim;
use crate::error::ShimError;
use crate::extract::{canonical_links, resolve_first};
use crate::http::PageFetcher;
use crate::models::{Candidate, Feed, FeedItem};
use crate::utils::{trailing_date, trailing_token};

const BASE_URL: &str = "https://comicskingdom.com/";

#[derive(Debug, Clone)]
pub struct ComicsKingdomShim {
    /// Slug in the site URL, e.g. `rae-the-doe`.
    pub comic_id: String,
    /// Display name, e.g. `Rae the Doe`.
    pub comic_name: String,
}

impl ComicsKingdomShim {
    pub fn new(comic_id: impl Into<String>, comic_name: impl Into<String>) -> Self {
        Self {
            comic_id: comic_id.into(),
            comic_name: comic_name.into(),
        }
    }

    /// Landing page of the comic.
    pub fn comic_url(&self) -> String {
        Url::parse(BASE_URL)
            .and_then(|base| base.join(&self.comic_id))
            .map(String::from)
            .unwrap_or_else(|_| format!("{BASE_URL}{}", self.comic_id))
    }
}

#[async_trait]
impl Shim for ComicsKingdomShim {
    fn source_path(&self) -> String {
        format!("comics_kingdom/{}", self.comic_id.replace('-', "_"))
    }

    #[instrument(level = "info", skip_all, fields(comic = %self.comic_id))]
    async fn fetch_candidates(
        &self,
        fetcher: &dyn PageFetcher,
    ) -> Result<Vec<Candidate>, ShimError> {
        let page = fetcher.fetch_page(&self.comic_url()).await?;
        let canonical = resolve_first(&self.source_path(), canonical_links(&page))?;
        if canonical.is_ambiguous() {
            warn!(
                chosen = %canonical.identifier,
                rejected = ?canonical.rejected,
                "Multiple canonical URLs found"
            );
        }
        Ok(vec![Candidate::new(canonical.identifier)])
    }

    fn describe(&self, identifier: &str, _fetched: Option<&Candidate>) -> FeedItem {
        match trailing_date(identifier) {
            Some((token, date)) => FeedItem::new(format!("{} {token}", self.comic_name))
                .with_link(identifier)
                .with_published_at(Some(date)),
            None => {
                warn!(%identifier, "Strip URL does not end in a date");
                let token = trailing_token(identifier).unwrap_or(identifier);
                FeedItem::new(format!("{} {token}", self.comic_name)).with_link(identifier)
            }
        }
    }

    fn build_feed(
        &self,
        items: Vec<FeedItem>,
        self_url: Option<String>,
    ) -> Result<Feed, ShimError> {
        Ok(Feed::new(
            &self.comic_name,
            format!("Recent comic strips for {}", self.comic_name),
            self.comic_url(),
        )?
        .with_items(items)
        .with_self_url(self_url))
    }
}
