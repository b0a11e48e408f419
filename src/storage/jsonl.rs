//! Line-delimited JSON record logs
//!
//! Reading is tolerant: a line that does not decode is counted and skipped,
//! never fatal. Writing is write-through: every append is flushed before the
//! call returns.

use crate::storage::traits::{Record, StorageError, StorageResult};
use serde::de::DeserializeOwned;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Decodes one log line, or returns None if it is blank or malformed
///
/// # Example
///
/// ```
/// use reg_harvest::storage::{try_parse_record, DiscoveredSection};
///
/// let ok = try_parse_record::<DiscoveredSection>(r#"{"section_url":"https://a/b"}"#);
/// assert!(ok.is_some());
///
/// let broken = try_parse_record::<DiscoveredSection>(r#"{"section_url": "#);
/// assert!(broken.is_none());
/// ```
pub fn try_parse_record<T: DeserializeOwned>(line: &str) -> Option<T> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

/// The decoded contents of a record log
#[derive(Debug, Clone)]
pub struct LogScan<T> {
    /// Records in file order
    pub records: Vec<T>,

    /// Non-blank lines that failed to decode
    pub malformed: usize,
}

impl<T> Default for LogScan<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            malformed: 0,
        }
    }
}

/// Reads every decodable record from a log file
///
/// A missing file reads as an empty log.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> StorageResult<LogScan<T>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LogScan::default()),
        Err(e) => return Err(StorageError::io(path, e)),
    };

    let mut scan = LogScan::default();
    for chunk in BufReader::new(file).split(b'\n') {
        let bytes = chunk.map_err(|e| StorageError::io(path, e))?;
        let Ok(line) = String::from_utf8(bytes) else {
            scan.malformed += 1;
            continue;
        };
        if line.trim().is_empty() {
            continue;
        }
        match try_parse_record(&line) {
            Some(record) => scan.records.push(record),
            None => scan.malformed += 1,
        }
    }

    if scan.malformed > 0 {
        tracing::debug!(
            "Skipped {} malformed lines in {}",
            scan.malformed,
            path.display()
        );
    }

    Ok(scan)
}

/// An append-only log of JSON records
pub struct JsonlLog<T> {
    path: PathBuf,
    writer: BufWriter<File>,
    _record: PhantomData<T>,
}

impl<T: Record> JsonlLog<T> {
    /// Opens a log for appending, creating the file and its directory if needed
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

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            _record: PhantomData,
        })
    }

    /// Appends one record and flushes it to the file
    pub fn append(&mut self, record: &T) -> StorageResult<()> {
        self.write_line(record)?;
        self.flush()
    }

    /// Appends several records with a single flush at the end
    pub fn append_all(&mut self, records: &[T]) -> StorageResult<()> {
        for record in records {
            self.write_line(record)?;
        }
        self.flush()
    }

    /// Returns the path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, record: &T) -> StorageResult<()> {
        let line = serde_json::to_string(record)?;
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|e| StorageError::io(&self.path, e))
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.writer
            .flush()
            .map_err(|e| StorageError::io(&self.path, e))
    }
}
