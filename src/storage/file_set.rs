//! Append-only line set backed by a text file
//!
//! The file holds one entry per line and is only ever appended to. On open
//! the whole file is read into memory; an entry joins the in-memory set only
//! after its line has been written.

use crate::storage::{StorageError, StorageResult};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

struct Inner {
    entries: HashSet<String>,
    file: File,
}

/// A durable, monotone set of strings
pub struct FileSet {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl FileSet {
    /// Opens (creating if needed) the backing file and loads every entry
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::io(path, e))?;
            }
        }

        let entries = match std::fs::read_to_string(path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(StorageError::io(path, e)),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StorageError::io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(Inner { entries, file }),
        })
    }

    pub fn contains(&self, entry: &str) -> StorageResult<bool> {
        let inner = self.lock()?;
        Ok(inner.entries.contains(entry))
    }

    /// Adds an entry, appending it to the file first
    ///
    /// Returns false if the entry was already present. Entries containing a
    /// line break are rejected since they could not be read back.
    pub fn insert(&self, entry: &str) -> StorageResult<bool> {
        if entry.is_empty() || entry.contains(['\n', '\r']) {
            return Err(StorageError::InvalidEntry(entry.to_string()));
        }

        let mut inner = self.lock()?;
        if inner.entries.contains(entry) {
            return Ok(false);
        }

        // One write call per line keeps concurrent appenders from interleaving.
        inner
            .file
            .write_all(format!("{}\n", entry).as_bytes())
            .map_err(|e| StorageError::io(&self.path, e))?;
        inner.entries.insert(entry.to_string());
        Ok(true)
    }

    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.lock()?.entries.len())
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes the backing file to disk
    pub fn sync(&self) -> StorageResult<()> {
        let inner = self.lock()?;
        inner
            .file
            .sync_data()
            .map_err(|e| StorageError::io(&self.path, e))
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Poisoned(self.path.display().to_string()))
    }
}
