//! Durable key-value store over an append-only record log
//!
//! One store = one directory holding a single `store.dat` log. The full key
//! set lives in an in-memory ordered index rebuilt by scanning the log at
//! open; values are read from disk on demand. Every append is fsynced before
//! the call returns.
//!
//! Writes require a read-write handle and `&mut self`, so one handle means
//! one writer. Read-only handles are `Sync` (the seek position is guarded by
//! a mutex) and can be shared across request-handling tasks.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::observability::Logger;

use super::errors::{StoreError, StoreResult};
use super::record::{DecodeError, LogRecord, MIN_RECORD_LEN};

const LOG_FILE_NAME: &str = "store.dat";

/// Location of one live record in the log file.
#[derive(Debug, Clone, Copy)]
struct RecordLocation {
    offset: u64,
    len: u32,
}

/// A group of mutations applied as one unit.
///
/// All records are encoded into a single buffer and reach the file through
/// one `write_all` followed by one fsync, so either every operation in the
/// batch is on disk or the tail is incomplete and gets truncated at the next
/// read-write open.
#[derive(Debug, Default)]
pub struct WriteBatch {
    records: Vec<LogRecord>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.records.push(LogRecord::put(key, value));
        self
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.records.push(LogRecord::tombstone(key));
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Ordered, durable key-value store.
pub struct KvStore {
    dir: PathBuf,
    log_path: PathBuf,
    read_only: bool,
    /// Append handle, present only on read-write stores.
    append_file: Option<File>,
    /// Shared handle for value reads; the mutex guards the seek position.
    read_file: Mutex<File>,
    /// Key -> location of the latest live record.
    index: BTreeMap<Vec<u8>, RecordLocation>,
    /// Length of the valid portion of the log.
    log_len: u64,
}

impl KvStore {
    /// Opens (or creates) a store directory for reading and writing.
    ///
    /// A truncated record at the log tail is removed before the store is
    /// handed out.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir).map_err(|e| StoreError::open(dir, e))?;
        let log_path = dir.join(LOG_FILE_NAME);

        // Ensure the log exists before scanning.
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| StoreError::open(&log_path, e))?;

        let scan = scan_log(&log_path)?;
        if scan.torn {
            Logger::warn(
                "store_tail_truncated",
                &[
                    ("path", &log_path.display().to_string()),
                    ("valid_len", &scan.valid_len.to_string()),
                ],
            );
            let file = OpenOptions::new()
                .write(true)
                .open(&log_path)
                .map_err(|e| StoreError::open(&log_path, e))?;
            file.set_len(scan.valid_len)
                .map_err(|e| StoreError::write(&log_path, e))?;
            file.sync_all().map_err(|e| StoreError::write(&log_path, e))?;
        }

        let append_file = OpenOptions::new()
            .append(true)
            .open(&log_path)
            .map_err(|e| StoreError::open(&log_path, e))?;
        let read_file = File::open(&log_path).map_err(|e| StoreError::open(&log_path, e))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            log_path,
            read_only: false,
            append_file: Some(append_file),
            read_file: Mutex::new(read_file),
            index: scan.index,
            log_len: scan.valid_len,
        })
    }

    /// Opens an existing store read-only; it must already exist.
    ///
    /// A torn tail left by a crashed writer is indexed up to the last
    /// complete record and otherwise ignored.
    pub fn open_read_only(dir: &Path) -> StoreResult<Self> {
        let log_path = dir.join(LOG_FILE_NAME);
        let read_file = File::open(&log_path).map_err(|e| StoreError::open(&log_path, e))?;

        let scan = scan_log(&log_path)?;
        if scan.torn {
            Logger::warn(
                "store_tail_ignored",
                &[
                    ("path", &log_path.display().to_string()),
                    ("valid_len", &scan.valid_len.to_string()),
                ],
            );
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            log_path,
            read_only: true,
            append_file: None,
            read_file: Mutex::new(read_file),
            index: scan.index,
            log_len: scan.valid_len,
        })
    }

    /// Returns the store directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    /// Reads the value for `key`, verifying the record checksum.
    ///
    /// `Ok(None)` means the key is absent; a present key with an empty value
    /// returns `Ok(Some(vec![]))`.
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let location = match self.index.get(key) {
            Some(location) => *location,
            None => return Ok(None),
        };

        let mut buf = vec![0u8; location.len as usize];
        {
            let mut file = self.read_file.lock().unwrap();
            file.seek(SeekFrom::Start(location.offset))
                .map_err(|e| StoreError::read(&self.log_path, e))?;
            file.read_exact(&mut buf)
                .map_err(|e| StoreError::read(&self.log_path, e))?;
        }

        let (record, _) = LogRecord::decode(&buf).map_err(|e| match e {
            DecodeError::Truncated => {
                StoreError::corrupt(location.offset, "record truncated mid-log")
            }
            DecodeError::Invalid(reason) => StoreError::corrupt(location.offset, reason),
        })?;

        if record.key != key {
            return Err(StoreError::corrupt(
                location.offset,
                "index points at a record for a different key",
            ));
        }
        if record.is_tombstone {
            return Err(StoreError::corrupt(
                location.offset,
                "index points at a tombstone",
            ));
        }

        Ok(Some(record.value))
    }

    /// Writes one key-value pair.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.apply(batch)
    }

    /// Deletes one key. Deleting an absent key is a no-op on the index but
    /// still writes a tombstone.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(key);
        self.apply(batch)
    }

    /// Applies a batch of mutations as one logical unit.
    pub fn apply(&mut self, batch: WriteBatch) -> StoreResult<()> {
        let append_file = match self.append_file.as_mut() {
            Some(file) => file,
            None => {
                return Err(StoreError::ReadOnly {
                    path: self.dir.clone(),
                })
            }
        };
        if batch.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::new();
        let mut locations = Vec::with_capacity(batch.records.len());
        for record in &batch.records {
            let offset = self.log_len + buf.len() as u64;
            record.encode_into(&mut buf);
            locations.push(RecordLocation {
                offset,
                len: record.encoded_len() as u32,
            });
        }

        append_file
            .write_all(&buf)
            .map_err(|e| StoreError::write(&self.log_path, e))?;
        append_file
            .sync_all()
            .map_err(|e| StoreError::write(&self.log_path, e))?;

        self.log_len += buf.len() as u64;
        for (record, location) in batch.records.iter().zip(locations) {
            if record.is_tombstone {
                self.index.remove(&record.key);
            } else {
                self.index.insert(record.key.clone(), location);
            }
        }

        Ok(())
    }

    /// All live keys in ascending byte order. Key-only; no values are read.
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.index.keys().map(|k| k.as_slice())
    }

    /// Live keys starting with `prefix`, in ascending byte order.
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a [u8]) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.index
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.as_slice())
    }
}

struct ScanOutcome {
    index: BTreeMap<Vec<u8>, RecordLocation>,
    valid_len: u64,
    torn: bool,
}

/// Scans the log sequentially, rebuilding the key index.
///
/// Stops at the first truncated record (crash residue at the tail) and
/// reports it via `torn`. A structurally invalid or checksum-failing record
/// is corruption and fails the scan.
fn scan_log(log_path: &Path) -> StoreResult<ScanOutcome> {
    let mut file = File::open(log_path).map_err(|e| StoreError::open(log_path, e))?;
    let file_len = file
        .metadata()
        .map_err(|e| StoreError::read(log_path, e))?
        .len();

    let mut index = BTreeMap::new();
    let mut offset: u64 = 0;

    while offset < file_len {
        let remaining = (file_len - offset) as usize;
        if remaining < MIN_RECORD_LEN {
            break; // torn tail
        }

        let mut len_buf = [0u8; 4];
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| StoreError::read(log_path, e))?;
        file.read_exact(&mut len_buf)
            .map_err(|e| StoreError::read(log_path, e))?;
        let record_len = u32::from_le_bytes(len_buf) as usize;

        if record_len < MIN_RECORD_LEN {
            return Err(StoreError::corrupt(
                offset,
                format!("record length {} below minimum", record_len),
            ));
        }
        if record_len > remaining {
            break; // torn tail
        }

        let mut buf = vec![0u8; record_len];
        buf[..4].copy_from_slice(&len_buf);
        file.read_exact(&mut buf[4..])
            .map_err(|e| StoreError::read(log_path, e))?;

        let (record, consumed) = LogRecord::decode(&buf).map_err(|e| match e {
            DecodeError::Truncated => StoreError::corrupt(offset, "record truncated mid-log"),
            DecodeError::Invalid(reason) => StoreError::corrupt(offset, reason),
        })?;
        debug_assert_eq!(consumed, record_len);

        if record.is_tombstone {
            index.remove(&record.key);
        } else {
            index.insert(
                record.key,
                RecordLocation {
                    offset,
                    len: record_len as u32,
                },
            );
        }
        offset += record_len as u64;
    }

    Ok(ScanOutcome {
        index,
        valid_len: offset,
        torn: offset < file_len,
    })
}
