//! Durable crawl state
//!
//! Two append-only text files survive restarts:
//! - the visited-URL list (one URL per line)
//! - the discovered-domain list (one top-level domain per line)
//!
//! The frontier is not persisted; it is rebuilt from the seeds
//! on every engine start.

mod domains;
mod file_set;
mod visited;

pub use domains::DomainRegistry;
pub use file_set::FileSet;
pub use visited::VisitedStore;

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Entry cannot be stored as a single line: {0:?}")]
    InvalidEntry(String),

    #[error("Lock poisoned for {0}")]
    Poisoned(String),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
