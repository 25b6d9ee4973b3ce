//! Audit log error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for audit log operations
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors surfaced by the audit log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Opening, appending to, or syncing the log file failed.
    #[error("audit log I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A record could not be serialized for appending.
    #[error("failed to serialize audit record: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },

    /// A line in the log is not a valid audit record.
    #[error("malformed audit record at line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl AuditError {
    pub fn io(path: &std::path::Path, source: io::Error) -> Self {
        AuditError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
