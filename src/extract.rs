//! HTML helpers shared by shims.
//!
//! Pages sometimes carry more than one canonical marker. Rather than fail,
//! extraction resolves to the first one and hands back the rest so the caller
//! can log them.

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::error::ShimError;

static CANONICAL_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"link[rel="canonical"][href]"#).unwrap());

/// A resolved identifier plus any distinct alternates that were passed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    pub identifier: String,
    pub rejected: Vec<String>,
}

impl Canonical {
    pub fn is_ambiguous(&self) -> bool {
        !self.rejected.is_empty()
    }
}

/// All `<link rel="canonical">` hrefs in document order.
pub fn canonical_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&CANONICAL_LINK)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect()
}

/// Pick the first of `found`.
///
/// Repeats of the same value are not ambiguity; only distinct alternates end
/// up in [`Canonical::rejected`].
///
/// # Errors
///
/// [`ShimError::Extraction`] if `found` is empty.
pub fn resolve_first(source_path: &str, found: Vec<String>) -> Result<Canonical, ShimError> {
    let mut distinct = found.into_iter().unique();
    let identifier = distinct
        .next()
        .ok_or_else(|| ShimError::extraction(source_path, "no canonical link on page"))?;
    Ok(Canonical {
        identifier,
        rejected: distinct.collect(),
    })
}
