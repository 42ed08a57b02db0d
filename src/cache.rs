//! Persisted, order-preserving set of identifiers a source has already seen.
//!
//! The sequence is newest first by *first observation*: identifiers are only
//! ever prepended, never removed or reordered. Whatever order a source served
//! its items in is the order they are kept in forever.
//!
//! The cache file is a JSON array of strings, rewritten in full on every
//! change.

use itertools::Itertools;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument, warn};

use crate::error::ShimError;
use crate::outputs::files::write_atomic;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SeenIdentifiers {
    ids: Vec<String>,
}

impl SeenIdentifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the cache file, or start empty if it doesn't exist yet.
    ///
    /// Duplicate entries in a hand-edited file are dropped (first occurrence
    /// wins) so the no-duplicate invariant holds from the moment of loading.
    ///
    /// # Errors
    ///
    /// [`ShimError::Persistence`] if the file exists but can't be read, and
    /// [`ShimError::CacheFormat`] if it isn't a JSON array of strings.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, ShimError> {
        let text = match fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache file yet; starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(ShimError::persistence(path, e)),
        };
        let raw: Vec<String> =
            serde_json::from_str(&text).map_err(|source| ShimError::CacheFormat {
                path: path.to_path_buf(),
                source,
            })?;

        let total = raw.len();
        let seen = Self::from_ids(raw);
        if seen.len() != total {
            warn!(
                dropped = total - seen.len(),
                "Cache file contained duplicate identifiers"
            );
        }
        debug!(count = seen.len(), "Loaded cache");
        Ok(seen)
    }

    /// Build from an ordered list, keeping the first occurrence of each value.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = HashSet::new();
        let ids = ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &String| set.insert(id.clone()))
            .collect();
        Self { ids }
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.ids.iter().any(|id| id == candidate)
    }

    /// Prepend `candidate` if it hasn't been seen. Returns whether it was new.
    pub fn observe(&mut self, candidate: &str) -> bool {
        if self.contains(candidate) {
            return false;
        }
        self.ids.insert(0, candidate.to_string());
        true
    }

    /// Observe a batch in the order the source presented it.
    ///
    /// The new identifiers are prepended as a block that keeps the source's
    /// order, so the first new candidate ends up at the front. Returns the
    /// identifiers that were new.
    pub fn observe_all<'a, I>(&mut self, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let batch: Vec<&str> = candidates.into_iter().unique().collect();
        // Walk the batch backwards so the first candidate is prepended last.
        let mut fresh: Vec<String> = batch
            .into_iter()
            .rev()
            .filter(|candidate| self.observe(candidate))
            .map(str::to_string)
            .collect();
        fresh.reverse();
        fresh
    }

    /// Write the full sequence to `path`, replacing what was there.
    #[instrument(level = "debug", skip_all, fields(path = %path.display(), count = self.ids.len()))]
    pub async fn persist(&self, path: &Path) -> Result<(), ShimError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| {
            ShimError::CacheFormat {
                path: path.to_path_buf(),
                source,
            }
        })?;
        write_atomic(path, json.as_bytes()).await
    }

    /// The first `n` identifiers, newest first.
    pub fn newest(&self, n: usize) -> &[String] {
        &self.ids[..self.ids.len().min(n)]
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, rng};

    #[test]
    fn test_observe_prepends_new_identifier() {
        let mut seen = SeenIdentifiers::from_ids(["B", "A"]);
        assert!(seen.observe("C"));
        assert_eq!(seen.as_slice(), ["C", "B", "A"]);
    }

    #[test]
    fn test_observe_ignores_known_identifier() {
        let mut seen = SeenIdentifiers::from_ids(["B", "A"]);
        assert!(!seen.observe("A"));
        assert_eq!(seen.as_slice(), ["B", "A"]);
    }

    #[test]
    fn test_observe_all_keeps_source_order_for_batch() {
        let mut seen = SeenIdentifiers::from_ids(["B", "A"]);
        let fresh = seen.observe_all(["E", "D", "B", "D", "C"]);
        assert_eq!(fresh, ["E", "D", "C"]);
        assert_eq!(seen.as_slice(), ["E", "D", "C", "B", "A"]);
    }

    #[test]
    fn test_observe_all_with_nothing_new() {
        let mut seen = SeenIdentifiers::from_ids(["B", "A"]);
        assert!(seen.observe_all(["A", "B"]).is_empty());
        assert!(seen.observe_all(Vec::<&str>::new()).is_empty());
        assert_eq!(seen.as_slice(), ["B", "A"]);
    }

    #[test]
    fn test_from_ids_drops_duplicates() {
        let seen = SeenIdentifiers::from_ids(["A", "B", "A"]);
        assert_eq!(seen.as_slice(), ["A", "B"]);
    }

    #[test]
    fn test_random_observations_never_duplicate_or_drop() {
        let mut r = rng();
        let mut seen = SeenIdentifiers::new();
        let mut history: Vec<String> = Vec::new();
        for _ in 0..500 {
            let batch: Vec<String> = (0..r.random_range(0..4))
                .map(|_| format!("id-{}", r.random_range(0..60)))
                .collect();
            seen.observe_all(batch.iter().map(String::as_str));

            let unique: HashSet<&String> = seen.as_slice().iter().collect();
            assert_eq!(unique.len(), seen.len());
            // Previous sequence is always a suffix of the new one.
            assert!(seen.as_slice().ends_with(&history));
            history = seen.as_slice().to_vec();
        }
    }

    #[test]
    fn test_newest_is_bounded() {
        let seen = SeenIdentifiers::from_ids((0..10_000).map(|i| i.to_string()));
        assert_eq!(seen.newest(10).len(), 10);
        assert_eq!(seen.newest(10)[0], "0");
        assert!(SeenIdentifiers::new().newest(10).is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let seen = SeenIdentifiers::load(&dir.path().join("none.json"))
            .await
            .unwrap();
        assert!(seen.is_empty());
    }

    #[tokio::test]
    async fn test_persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comics_kingdom/strip.json");
        let seen = SeenIdentifiers::from_ids(["C", "B", "A"]);
        seen.persist(&path).await.unwrap();

        let raw: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, ["C", "B", "A"]);
        assert_eq!(SeenIdentifiers::load(&path).await.unwrap(), seen);
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"not": "a list"}"#).unwrap();
        let err = SeenIdentifiers::load(&path).await.unwrap_err();
        assert!(matches!(err, ShimError::CacheFormat { .. }));
    }
}
