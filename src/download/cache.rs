//! The on-disk storage root for fetched files.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::constants::DEFAULT_CACHE_DIR;
use super::error::FetchError;

/// Directory that holds one file per successful retrieval.
///
/// Passed explicitly to the [`Fetcher`](super::Fetcher) instead of living in a
/// global. [`ensure`](Self::ensure) may run any number of times from any
/// number of tasks; creation is recursive and therefore idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDir {
    root: PathBuf,
}

impl Default for CacheDir {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

impl CacheDir {
    /// Creates a handle for `root`. Nothing touches the filesystem yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Creates the directory (and parents) if missing.
    ///
    /// New directories get mode `0o755` on Unix.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Storage`] if the directory cannot be created or
    /// the path exists but is not a directory.
    pub async fn ensure(&self) -> Result<(), FetchError> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o755);

        builder
            .create(&self.root)
            .await
            .map_err(|e| FetchError::storage(self.root.clone(), e))?;
        debug!(path = %self.root.display(), "cache directory ready");
        Ok(())
    }
}
