use crate::storage::{FileSet, StorageResult};
use std::path::Path;

/// Persistent set of URLs already processed
///
/// Membership is checked before a URL is enqueued and again before it is
/// fetched, so a URL produces at most one record over the lifetime of the
/// backing file.
pub struct VisitedStore {
    urls: FileSet,
}

impl VisitedStore {
    pub fn open(path: &Path) -> StorageResult<Self> {
        let urls = FileSet::open(path)?;
        tracing::info!(
            "Loaded {} visited URLs from {}",
            urls.len()?,
            path.display()
        );
        Ok(Self { urls })
    }

    pub fn contains(&self, url: &str) -> StorageResult<bool> {
        self.urls.contains(url)
    }

    /// Marks a URL visited; returns false if it already was
    pub fn mark_visited(&self, url: &str) -> StorageResult<bool> {
        self.urls.insert(url)
    }

    pub fn len(&self) -> StorageResult<usize> {
        self.urls.len()
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        self.urls.is_empty()
    }

    pub fn sync(&self) -> StorageResult<()> {
        self.urls.sync()
    }
}
