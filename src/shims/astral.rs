//! Astral blog shim.
//!
//! Scrapes the post index at <https://astral.sh/blog>. Every post card is a
//! link inside `div#Blog` carrying a title, a summary and a human-readable
//! date, so one poll can surface several new posts at once.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use super::Shim;
use crate::error::ShimError;
use crate::http::PageFetcher;
use crate::models::{Candidate, Feed, FeedItem};
use crate::utils::{collapse_whitespace, truncate_for_log};

pub const BLOG_URL: &str = "https://astral.sh/blog";

static BLOG_DIV: Lazy<Selector> = Lazy::new(|| Selector::parse("div#Blog").unwrap());
static POST_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static POST_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h3.text-h5").unwrap());
static POST_SUMMARY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p.body-m.text-comet").unwrap());
static POST_DATE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p.subtitle.text-comet").unwrap());

#[derive(Debug, Clone, Default)]
pub struct AstralShim;

fn text_of(post: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    post.select(selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
}

/// Parse dates like `March 7, 2024` as midnight UTC.
fn parse_post_date(text: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(text, "%B %d, %Y")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

/// Extract post candidates from the blog index, in page order.
///
/// Posts without a title are skipped; an unparseable date leaves the post
/// undated. Only a missing `div#Blog` fails the whole page.
fn parse_blog(html: &str, base: &Url) -> Result<Vec<Candidate>, String> {
    let document = Html::parse_document(html);
    let blog = document
        .select(&BLOG_DIV)
        .next()
        .ok_or_else(|| format!("{base} does not contain a <div> with id \"Blog\""))?;

    let mut candidates = Vec::new();
    for post in blog.select(&POST_LINK) {
        let Some(href) = post.value().attr("href") else {
            continue;
        };
        let Ok(link) = base.join(href) else {
            warn!(%href, "Skipping post with unresolvable href");
            continue;
        };
        let Some(title) = text_of(&post, &POST_TITLE) else {
            debug!(%link, "Skipping link without a post title");
            continue;
        };

        let published_at = match text_of(&post, &POST_DATE) {
            Some(date) => {
                let parsed = parse_post_date(&date);
                if parsed.is_none() {
                    warn!(%link, date = %truncate_for_log(&date, 60), "Unrecognized post date");
                }
                parsed
            }
            None => None,
        };

        candidates.push(Candidate {
            identifier: link.to_string(),
            title: Some(title),
            description: text_of(&post, &POST_SUMMARY),
            published_at,
        });
    }
    Ok(candidates)
}

#[async_trait]
impl Shim for AstralShim {
    fn source_path(&self) -> String {
        "astral".to_string()
    }

    #[instrument(level = "info", skip_all)]
    async fn fetch_candidates(
        &self,
        fetcher: &dyn PageFetcher,
    ) -> Result<Vec<Candidate>, ShimError> {
        let base = Url::parse(BLOG_URL).map_err(|e| ShimError::Fetch {
            url: BLOG_URL.to_string(),
            reason: e.to_string(),
        })?;
        let page = fetcher.fetch_page(BLOG_URL).await?;
        parse_blog(&page, &base).map_err(|reason| ShimError::extraction(self.source_path(), reason))
    }

    fn build_feed(
        &self,
        items: Vec<FeedItem>,
        self_url: Option<String>,
    ) -> Result<Feed, ShimError> {
        Ok(Feed::new("Astral Blog", "Recent blog posts from Astral", BLOG_URL)?
            .with_items(items)
            .with_self_url(self_url))
    }
}
