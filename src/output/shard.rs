//! Time-boxed JSON shard files
//!
//! A shard is a JSON array written incrementally: `[` on open, one record
//! per line followed by `,` on append, and on close the trailing separator
//! is stripped and `]` appended. Between those points the file is an
//! unterminated array; [`repair_shard`] finalizes files left that way by a
//! killed process.

use crate::output::record::CrawlRecord;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;

const OPENING: &[u8] = b"[\n";
const SEPARATOR: &[u8] = b",\n";
const CLOSING: &[u8] = b"\n]\n";

/// Errors that can occur while writing shards
#[derive(Debug, Error)]
pub enum ShardError {
    #[error("Shard IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Shard writer is closed")]
    Closed,

    #[error("Shard {0} is not a JSON array")]
    Corrupt(String),

    #[error("Shard writer lock poisoned")]
    Poisoned,
}

impl ShardError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type for shard operations
pub type ShardResult<T> = Result<T, ShardError>;

/// A single open shard file
#[derive(Debug)]
pub struct Shard {
    path: PathBuf,
    file: File,
    opened_at: Instant,
    records: usize,
    closed: bool,
}

impl Shard {
    /// Creates a new shard file and writes the array opening
    ///
    /// Fails if the file already exists.
    pub fn create(path: &Path, opened_at: Instant) -> std::io::Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        file.write_all(OPENING)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            opened_at,
            records: 0,
            closed: false,
        })
    }

    /// Appends one record followed by a separator, in a single write
    pub fn append(&mut self, record: &CrawlRecord) -> ShardResult<()> {
        if self.closed {
            return Err(ShardError::Closed);
        }
        let mut line = record.to_json_line()?.into_bytes();
        line.extend_from_slice(SEPARATOR);
        self.file
            .write_all(&line)
            .map_err(|e| ShardError::io(&self.path, e))?;
        self.records += 1;
        Ok(())
    }

    /// Finalizes the file into a valid JSON array; idempotent
    pub fn close(&mut self) -> ShardResult<()> {
        if self.closed {
            return Ok(());
        }
        finalize(&mut self.file).map_err(|e| ShardError::io(&self.path, e))?;
        self.closed = true;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn is_due(&self, now: Instant, interval: Duration) -> bool {
        now.saturating_duration_since(self.opened_at) >= interval
    }
}

/// Strips a dangling separator and appends the closing bracket
fn finalize(file: &mut File) -> std::io::Result<()> {
    let len = file.seek(SeekFrom::End(0))?;
    if len >= SEPARATOR.len() as u64 {
        let mut tail = [0u8; 2];
        file.seek(SeekFrom::End(-(SEPARATOR.len() as i64)))?;
        file.read_exact(&mut tail)?;
        if tail == SEPARATOR {
            file.set_len(len - SEPARATOR.len() as u64)?;
        }
    }
    file.seek(SeekFrom::End(0))?;
    file.write_all(CLOSING)?;
    file.sync_all()
}

/// Summary of a shard once it has been closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedShard {
    pub path: PathBuf,
    pub records: usize,
}

struct WriterState {
    current: Option<Shard>,
    next_seq: u32,
    closed: Vec<ClosedShard>,
    finished: bool,
}

/// Produces the sequence of time-boxed shards for one engine instance
///
/// Exactly one shard is open at a time. Appends are serialized through an
/// internal lock, so the writer can be shared between producers.
pub struct ShardWriter {
    dir: PathBuf,
    prefix: String,
    interval: Duration,
    state: Mutex<WriterState>,
}

impl ShardWriter {
    /// Creates the output directory if needed and opens the first shard
    pub fn open(dir: &Path, prefix: &str, interval: Duration) -> ShardResult<Self> {
        Self::open_at(dir, prefix, interval, Instant::now())
    }

    /// Like [`ShardWriter::open`] with an explicit opening instant
    pub fn open_at(
        dir: &Path,
        prefix: &str,
        interval: Duration,
        now: Instant,
    ) -> ShardResult<Self> {
        std::fs::create_dir_all(dir).map_err(|e| ShardError::io(dir, e))?;

        let writer = Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
            interval,
            state: Mutex::new(WriterState {
                current: None,
                next_seq: 0,
                closed: Vec::new(),
                finished: false,
            }),
        };

        {
            let mut state = writer.lock()?;
            let shard = writer.create_shard(&mut state, now)?;
            state.current = Some(shard);
        }

        Ok(writer)
    }

    /// Appends a record to the open shard, rotating first if it is due
    ///
    /// Returns the path of the shard that received the record.
    pub fn append(&self, record: &CrawlRecord) -> ShardResult<PathBuf> {
        self.append_at(record, Instant::now())
    }

    pub fn append_at(&self, record: &CrawlRecord, now: Instant) -> ShardResult<PathBuf> {
        let mut state = self.lock()?;
        self.rotate_locked(&mut state, now)?;

        let shard = state.current.as_mut().ok_or(ShardError::Closed)?;
        shard.append(record)?;
        Ok(shard.path().to_path_buf())
    }

    /// Closes the open shard and opens a new one if the interval has elapsed
    ///
    /// Returns true if a rotation happened.
    pub fn rotate_if_due(&self, now: Instant) -> ShardResult<bool> {
        let mut state = self.lock()?;
        self.rotate_locked(&mut state, now)
    }

    fn rotate_locked(&self, state: &mut WriterState, now: Instant) -> ShardResult<bool> {
        if state.finished {
            return Err(ShardError::Closed);
        }
        let due = state
            .current
            .as_ref()
            .map(|shard| shard.is_due(now, self.interval))
            .unwrap_or(true);
        if !due {
            return Ok(false);
        }

        if let Some(mut shard) = state.current.take() {
            shard.close()?;
            tracing::info!(
                "Closed shard {} ({} records)",
                shard.path().display(),
                shard.records()
            );
            state.closed.push(ClosedShard {
                path: shard.path().to_path_buf(),
                records: shard.records(),
            });
        }

        let shard = self.create_shard(state, now)?;
        state.current = Some(shard);
        Ok(true)
    }

    fn create_shard(&self, state: &mut WriterState, now: Instant) -> ShardResult<Shard> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        loop {
            let name = format!("{}_{}_{:03}.json", self.prefix, timestamp, state.next_seq);
            let path = self.dir.join(name);
            state.next_seq += 1;

            match Shard::create(&path, now) {
                Ok(shard) => {
                    tracing::info!("Opened shard {}", path.display());
                    return Ok(shard);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(ShardError::io(&path, e)),
            }
        }
    }

    /// Closes the open shard; later appends fail with [`ShardError::Closed`]
    ///
    /// Idempotent: a second call is a no-op returning None.
    pub fn close(&self) -> ShardResult<Option<ClosedShard>> {
        let mut state = self.lock()?;
        state.finished = true;

        let Some(mut shard) = state.current.take() else {
            return Ok(None);
        };
        shard.close()?;
        tracing::info!(
            "Closed shard {} ({} records)",
            shard.path().display(),
            shard.records()
        );

        let closed = ClosedShard {
            path: shard.path().to_path_buf(),
            records: shard.records(),
        };
        state.closed.push(closed.clone());
        Ok(Some(closed))
    }

    /// Shards closed so far by this writer, oldest first
    pub fn closed_shards(&self) -> Vec<ClosedShard> {
        self.lock()
            .map(|state| state.closed.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> ShardResult<MutexGuard<'_, WriterState>> {
        self.state.lock().map_err(|_| ShardError::Poisoned)
    }
}

/// Outcome of [`repair_shard`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// File already ended with the closing bracket
    AlreadyClosed,
    /// File was finalized; `dropped` counts partial or unparsable lines removed
    Repaired { records: usize, dropped: usize },
}

/// Finalizes a shard left open by a process that never closed it
pub fn repair_shard(path: &Path) -> ShardResult<RepairOutcome> {
    let content = std::fs::read_to_string(path).map_err(|e| ShardError::io(path, e))?;

    if serde_json::from_str::<Vec<serde_json::Value>>(&content).is_ok() {
        return Ok(RepairOutcome::AlreadyClosed);
    }
    let Some(body) = content.trim_start().strip_prefix('[') else {
        return Err(ShardError::Corrupt(path.display().to_string()));
    };

    // Anything after the last newline is a record cut off mid-write.
    let (complete, partial) = match body.rfind('\n') {
        Some(idx) => (&body[..idx], &body[idx + 1..]),
        None => ("", body),
    };
    let mut dropped = usize::from(!partial.trim().is_empty());

    let mut records = Vec::new();
    for line in complete.lines() {
        let candidate = line.trim().trim_end_matches(',');
        if candidate.is_empty() {
            continue;
        }
        if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
            records.push(candidate);
        } else {
            dropped += 1;
        }
    }

    let mut repaired = String::from("[\n");
    repaired.push_str(&records.join(",\n"));
    repaired.push_str("\n]\n");
    std::fs::write(path, repaired).map_err(|e| ShardError::io(path, e))?;

    Ok(RepairOutcome::Repaired {
        records: records.len(),
        dropped,
    })
}

/// Lists shard files for a prefix in a directory, sorted by name
pub fn list_shards(dir: &Path, prefix: &str) -> ShardResult<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ShardError::io(dir, e)),
    };

    let shard_prefix = format!("{}_", prefix);
    let mut shards: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(&shard_prefix) && name.ends_with(".json"))
                .unwrap_or(false)
        })
        .collect();
    shards.sort();
    Ok(shards)
}

/// Repairs every unterminated shard in `dir`; returns how many were fixed
pub fn repair_orphaned_shards(dir: &Path, prefix: &str) -> ShardResult<usize> {
    let mut repaired = 0;
    for path in list_shards(dir, prefix)? {
        match repair_shard(&path) {
            Ok(RepairOutcome::AlreadyClosed) => {}
            Ok(RepairOutcome::Repaired { records, dropped }) => {
                tracing::warn!(
                    "Repaired unterminated shard {} ({} records kept, {} dropped)",
                    path.display(),
                    records,
                    dropped
                );
                repaired += 1;
            }
            Err(ShardError::Corrupt(name)) => {
                tracing::warn!("Skipping shard {} that is not a JSON array", name);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(repaired)
}
