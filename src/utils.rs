//! Utility functions for date formatting, string handling, and directory checks.
//!
//! - RFC-822 timestamps for RSS date fields
//! - Parsing of date tokens embedded in item URLs
//! - String truncation and whitespace collapsing for logs and scraped text
//! - Directory validation for the cache and feed roots

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::ShimError;

/// Wire format for RSS date fields, e.g. `Tue, 02 Jan 2024 00:00:00 +0000`.
pub const RFC822_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Format a timestamp for an RSS date field.
///
/// The output is computed from the timestamp itself and always carries the
/// `+0000` offset.
pub fn to_rfc822(date: &DateTime<Utc>) -> String {
    date.format(RFC822_FORMAT).to_string()
}

/// Parse a trailing `YYYY-MM-DD` token from an identifier.
///
/// Comic strip URLs end in the strip date, e.g.
/// `https://example.org/strip/2024-01-02`. Returns the token and the date
/// at midnight UTC, or `None` if the identifier does not end in a date.
///
/// # Examples
///
/// ```ignore
/// let (token, date) = trailing_date("https://example.org/strip/2024-01-02").unwrap();
/// assert_eq!(token, "2024-01-02");
/// ```
pub fn trailing_date(identifier: &str) -> Option<(&str, DateTime<Utc>)> {
    let token = trailing_token(identifier)?;
    let date = NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()?;
    Some((token, date.and_hms_opt(0, 0, 0)?.and_utc()))
}

/// The last ten characters of an identifier, where a date token lives.
///
/// Counts characters rather than bytes, so identifiers ending in non-ASCII
/// text are never split inside a code point.
///
/// # Arguments
///
/// * `identifier` - A candidate identifier, usually a URL
///
/// # Returns
///
/// The trailing ten-character slice, or `None` if the identifier is shorter.
pub fn trailing_token(identifier: &str) -> Option<&str> {
    let start = identifier.char_indices().rev().nth(9)?.0;
    Some(&identifier[start..])
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` bytes (backing off to a char boundary)
/// with an ellipsis and byte count appended.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of bytes to keep
///
/// # Returns
///
/// The original string if it fits, otherwise a truncated version with
/// `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then writes and removes a
/// probe file.
///
/// # Arguments
///
/// * `path` - Directory to create and check
///
/// # Errors
///
/// Returns [`ShimError::Persistence`] if the directory cannot be created or
/// is not writable.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), ShimError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| ShimError::persistence(path, e))?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Directory is writable");
            Ok(())
        }
        Err(e) => Err(ShimError::persistence(path, e)),
    }
}
