//! Atomic file replacement.
//!
//! Cache and feed files are always rewritten in full. Content goes to a
//! sibling temp file first and is renamed over the target, so readers see
//! either the old document or the new one, never a partial write.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument, warn};

use crate::error::ShimError;

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

/// Replace `path` with `contents`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ShimError::Persistence`] if any step fails. The temp file is
/// removed on failure and the previous content of `path` is left in place.
#[instrument(level = "debug", skip_all, fields(path = %path.display(), bytes = contents.len()))]
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ShimError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ShimError::persistence(parent, e))?;
    }

    let tmp = temp_path(path);
    let result = async {
        fs::write(&tmp, contents).await?;
        fs::rename(&tmp, path).await
    }
    .await;

    match result {
        Ok(()) => {
            debug!("Replaced file");
            Ok(())
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&tmp).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(tmp = %tmp.display(), error = %cleanup, "Failed to remove temp file");
                }
            }
            Err(ShimError::persistence(path, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let tmp = temp_path(Path::new("/data/feeds/astral.rss"));
        assert_eq!(tmp, PathBuf::from("/data/feeds/.astral.rss.tmp"));
    }

    #[tokio::test]
    async fn test_write_atomic_creates_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/feed.rss");

        write_atomic(&path, b"first").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");

        write_atomic(&path, b"second").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_write_atomic_failure_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the target's place makes the rename fail.
        let path = dir.path().join("occupied");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let err = write_atomic(&path, b"data").await.unwrap_err();
        assert_eq!(err.kind(), "persistence");
        assert!(!temp_path(&path).exists());
        assert!(path.join("keep").exists());
    }
}
