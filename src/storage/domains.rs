use crate::storage::{FileSet, StorageResult};
use std::path::Path;

/// Persistent set of external top-level domains surfaced by the crawl
///
/// Purely for reporting: domains recorded here are never crawled.
pub struct DomainRegistry {
    domains: FileSet,
}

impl DomainRegistry {
    pub fn open(path: &Path) -> StorageResult<Self> {
        let domains = FileSet::open(path)?;
        tracing::info!(
            "Loaded {} discovered domains from {}",
            domains.len()?,
            path.display()
        );
        Ok(Self { domains })
    }

    /// Records a domain; returns true if it was new
    pub fn record(&self, domain: &str) -> StorageResult<bool> {
        let added = self.domains.insert(domain)?;
        if added {
            tracing::debug!("Discovered new domain: {}", domain);
        }
        Ok(added)
    }

    pub fn contains(&self, domain: &str) -> StorageResult<bool> {
        self.domains.contains(domain)
    }

    pub fn len(&self) -> StorageResult<usize> {
        self.domains.len()
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        self.domains.is_empty()
    }

    pub fn sync(&self) -> StorageResult<()> {
        self.domains.sync()
    }
}
