//! Store error types

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the key-value store.
///
/// I/O failures and corruption are fatal for the failing call and are never
/// retried internally; callers decide whether to retry the whole operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store directory or log file could not be opened.
    #[error("failed to open store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading from the log file failed.
    #[error("store read failed at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Appending to the log file (or syncing it) failed.
    #[error("store write failed at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A complete record failed checksum or structural validation.
    #[error("store corruption at byte offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// A stored value is not what the caller's contract requires.
    #[error("invalid value for key {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// A mutation was attempted through a read-only handle.
    #[error("store at {path} is read-only")]
    ReadOnly { path: PathBuf },
}

impl StoreError {
    pub fn open(path: &Path, source: io::Error) -> Self {
        StoreError::Open {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn read(path: &Path, source: io::Error) -> Self {
        StoreError::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn write(path: &Path, source: io::Error) -> Self {
        StoreError::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        StoreError::Corrupt {
            offset,
            reason: reason.into(),
        }
    }
}
