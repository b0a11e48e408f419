//! Plain-text checkpoint logs (one identifier per line)

use crate::storage::traits::{StorageError, StorageResult};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// An append-only log of identifiers, one per line
///
/// Used for the visited-page checkpoint and the indexed-id checkpoint.
/// Appends are written and flushed immediately.
pub struct LineLog {
    path: PathBuf,
    file: File,
}

impl LineLog {
    /// Opens a checkpoint for appending, creating it if needed
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;

        Ok(Self { path, file })
    }

    /// Reads every identifier in a checkpoint
    ///
    /// Lines are trimmed and blank lines ignored. A missing file reads as empty.
    pub fn load(path: &Path) -> StorageResult<HashSet<String>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(StorageError::io(path, e)),
        };

        let mut entries = HashSet::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| StorageError::io(path, e))?;
            let line = line.trim();
            if !line.is_empty() {
                entries.insert(line.to_string());
            }
        }
        Ok(entries)
    }

    /// Appends one identifier
    pub fn append(&mut self, entry: &str) -> StorageResult<()> {
        self.append_all(std::iter::once(entry))
    }

    /// Appends several identifiers with one write
    pub fn append_all<'a, I>(&mut self, entries: I) -> StorageResult<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut buffer = String::new();
        for entry in entries {
            buffer.push_str(entry.trim());
            buffer.push('\n');
        }
        if buffer.is_empty() {
            return Ok(());
        }

        self.file
            .write_all(buffer.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|e| StorageError::io(&self.path, e))
    }

    /// Empties the checkpoint, keeping the handle usable for appends
    pub fn truncate(&mut self) -> StorageResult<()> {
        self.file
            .set_len(0)
            .map_err(|e| StorageError::io(&self.path, e))
    }
}
