//! The static list of sources this deployment polls.
//!
//! Source paths namespace cache and feed files, so two shims sharing a key
//! would overwrite each other's state. [`Registry::new`] refuses that, along
//! with keys that would escape the data directories.

use std::collections::HashSet;

use crate::error::ShimError;
use crate::shims::Shim;
use crate::shims::astral::AstralShim;
use crate::shims::comics_kingdom::ComicsKingdomShim;

/// Shims registered by default, in polling order.
pub fn default_shims() -> Vec<Box<dyn Shim>> {
    vec![
        Box::new(ComicsKingdomShim::new("rae-the-doe", "Rae the Doe")),
        Box::new(AstralShim),
    ]
}

/// Check a source path is safe to use as a relative file path.
///
/// Accepts `/`-separated segments of lowercase ASCII letters, digits, `_`
/// and `-`, with no empty, `.` or `..` segments.
pub fn is_safe_source_path(key: &str) -> bool {
    !key.is_empty()
        && key.split('/').all(|segment| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        })
}

/// Shims whose source paths are unique and filesystem-safe.
pub struct Registry {
    shims: Vec<Box<dyn Shim>>,
}

impl Registry {
    /// Validate every shim's source path.
    ///
    /// # Arguments
    ///
    /// * `shims` - Shims in the order they should be polled
    ///
    /// # Errors
    ///
    /// [`ShimError::InvalidSourcePath`] or [`ShimError::DuplicateSourcePath`]
    /// for the first offending key.
    pub fn new(shims: Vec<Box<dyn Shim>>) -> Result<Self, ShimError> {
        let mut keys = HashSet::new();
        for shim in &shims {
            let key = shim.source_path();
            if !is_safe_source_path(&key) {
                return Err(ShimError::InvalidSourcePath(key));
            }
            if !keys.insert(key.clone()) {
                return Err(ShimError::DuplicateSourcePath(key));
            }
        }
        Ok(Self { shims })
    }

    /// Source paths in polling order.
    pub fn keys(&self) -> Vec<String> {
        self.shims.iter().map(|s| s.source_path()).collect()
    }

    pub fn len(&self) -> usize {
        self.shims.len()
    }

    /// Hand the validated shims over, keeping registration order.
    pub fn into_shims(self) -> Vec<Box<dyn Shim>> {
        self.shims
    }
}
