//! Append-only audit log file
//!
//! A single JSONL file that only ever grows. Appends are serialized behind a
//! mutex and synced to disk before the call returns, so concurrent mutations
//! never interleave or truncate each other's records. Reads open their own
//! handle and stream from the start, so they never disturb the append
//! position.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::errors::{AuditError, AuditResult};
use super::record::AuditRecord;

/// Handle to an append-only audit log file.
///
/// The file (and its parent directory) is created lazily on first append, so
/// constructing a handle for reading never creates anything on disk.
pub struct AuditLog {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record as a newline-terminated JSON line, flushed and
    /// fsynced before returning.
    pub fn append(&self, record: &AuditRecord) -> AuditResult<()> {
        let line = serde_json::to_string(record)
            .map_err(|source| AuditError::Serialize { source })?;

        let mut guard = self.writer.lock().unwrap();
        if guard.is_none() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|e| AuditError::io(&self.path, e))?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| AuditError::io(&self.path, e))?;
            *guard = Some(BufWriter::new(file));
        }
        let writer = guard.as_mut().expect("audit writer initialized above");

        writeln!(writer, "{}", line).map_err(|e| AuditError::io(&self.path, e))?;
        writer.flush().map_err(|e| AuditError::io(&self.path, e))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| AuditError::io(&self.path, e))
    }

    /// Lazy, ordered sequence of all records from the start of the log.
    ///
    /// Each call re-reads from the beginning. A log file that does not exist
    /// yet yields an empty sequence.
    pub fn read_all(&self) -> AuditResult<AuditIter> {
        match File::open(&self.path) {
            Ok(file) => Ok(AuditIter {
                lines: Some(BufReader::new(file).lines()),
                line_no: 0,
                path: self.path.clone(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AuditIter {
                lines: None,
                line_no: 0,
                path: self.path.clone(),
            }),
            Err(e) => Err(AuditError::io(&self.path, e)),
        }
    }
}

/// Iterator over audit records in append order.
pub struct AuditIter {
    lines: Option<Lines<BufReader<File>>>,
    line_no: usize,
    path: PathBuf,
}

impl Iterator for AuditIter {
    type Item = AuditResult<AuditRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let lines = self.lines.as_mut()?;
        loop {
            let line = match lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(AuditError::io(&self.path, e))),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&line).map_err(|source| AuditError::Malformed {
                    line: self.line_no,
                    source,
                }),
            );
        }
    }
}
