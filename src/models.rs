//! Data models for discovered items and the feeds built from them.
//!
//! - [`Candidate`]: one item identifier a shim discovered on its source page,
//!   plus whatever metadata the page offered alongside it
//! - [`FeedItem`]: an RSS 2.0 `<item>`
//! - [`Feed`]: an RSS 2.0 `<channel>` with its items
//!
//! A [`Feed`] is built once per shim run, serialized by
//! [`crate::outputs::rss`], and discarded. Nothing mutates it after
//! [`Feed::new`] and its `with_*` builders have run.

use crate::error::ShimError;
use chrono::{DateTime, Utc};

/// How many items a rendered feed carries. The cache itself is unbounded.
pub const MAX_FEED_ITEMS: usize = 10;

pub const DEFAULT_COPYRIGHT: &str = "CC0 1.0 Universal (CC0 1.0) Public Domain Dedication";
pub const DEFAULT_COPYRIGHT_URL: &str = "https://creativecommons.org/publicdomain/zero/1.0/";
pub const DEFAULT_DOCS: &str = "https://www.rssboard.org/rss-specification";
pub const DEFAULT_LANGUAGE: &str = "en-us";
pub const DEFAULT_TTL_MINUTES: u32 = 30;

/// Generator tag written into every feed.
pub fn generator_tag() -> String {
    format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// An item identifier discovered on a source page.
///
/// `identifier` is the canonical URL of the item and doubles as the dedup
/// key. The optional fields carry metadata that was visible on the page at
/// fetch time; sources that only expose a URL leave them empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub identifier: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Candidate {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: None,
            description: None,
            published_at: None,
        }
    }
}

/// An RSS 2.0 `<item>`.
///
/// When `link` is present it is emitted both as `<link>` and as a permalink
/// `<guid>`, so it must never change for an already-published item.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl FeedItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            link: None,
            published_at: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_published_at(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }
}

/// An RSS 2.0 `<channel>`.
///
/// Channel metadata starts out with stable defaults; `last_build_date` is
/// the wall-clock time at construction. `items` is newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    pub title: String,
    pub description: String,
    pub link: String,
    pub copyright: Option<String>,
    pub copyright_url: Option<String>,
    pub docs: Option<String>,
    pub generator: Option<String>,
    pub language: Option<String>,
    pub last_build_date: DateTime<Utc>,
    pub self_url: Option<String>,
    pub ttl_minutes: u32,
    pub items: Vec<FeedItem>,
}

impl Feed {
    /// Create a feed with default channel metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::Validation`] if `title`, `description` or `link`
    /// is empty.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        link: impl Into<String>,
    ) -> Result<Self, ShimError> {
        let feed = Self {
            title: title.into(),
            description: description.into(),
            link: link.into(),
            copyright: Some(DEFAULT_COPYRIGHT.to_string()),
            copyright_url: Some(DEFAULT_COPYRIGHT_URL.to_string()),
            docs: Some(DEFAULT_DOCS.to_string()),
            generator: Some(generator_tag()),
            language: Some(DEFAULT_LANGUAGE.to_string()),
            last_build_date: Utc::now(),
            self_url: None,
            ttl_minutes: DEFAULT_TTL_MINUTES,
            items: Vec::new(),
        };
        feed.validate()?;
        Ok(feed)
    }

    pub fn with_items(mut self, items: Vec<FeedItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_self_url(mut self, self_url: Option<String>) -> Self {
        self.self_url = self_url;
        self
    }

    #[cfg(test)]
    pub fn with_last_build_date(mut self, last_build_date: DateTime<Utc>) -> Self {
        self.last_build_date = last_build_date;
        self
    }

    /// The items that end up in the rendered document: the first
    /// [`MAX_FEED_ITEMS`] in feed order.
    pub fn rendered_items(&self) -> &[FeedItem] {
        let n = self.items.len().min(MAX_FEED_ITEMS);
        &self.items[..n]
    }

    /// Latest publish date among rendered items, if any item is dated.
    pub fn publish_date(&self) -> Option<DateTime<Utc>> {
        self.rendered_items()
            .iter()
            .filter_map(|item| item.published_at)
            .max()
    }

    /// Check that every required field is non-empty.
    pub fn validate(&self) -> Result<(), ShimError> {
        for (name, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("link", &self.link),
        ] {
            if value.trim().is_empty() {
                return Err(ShimError::Validation(format!("channel {name} is empty")));
            }
        }
        if let Some(pos) = self.items.iter().position(|i| i.title.trim().is_empty()) {
            return Err(ShimError::Validation(format!("item {pos} has an empty title")));
        }
        Ok(())
    }
}
