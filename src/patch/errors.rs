//! Patch engine error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::audit::AuditError;
use crate::store::StoreError;

/// Result type for patch operations
pub type PatchResult<T> = Result<T, PatchError>;

/// Errors surfaced by the patch application engine.
///
/// Input errors are reported before any store mutation happens; store and
/// audit failures propagate from the underlying medium.
#[derive(Debug, Error)]
pub enum PatchError {
    /// An add/replace request arrived without a data source.
    #[error("no data source provided for add/replace of '{key}'")]
    MissingSource { key: String },

    /// An add/replace request arrived without a mode.
    #[error("no patch mode provided for add/replace of '{key}'")]
    MissingMode { key: String },

    /// A binary add/replace request arrived without a mimetype.
    #[error("binary patch of '{key}' requires a mimetype")]
    MissingMimetype { key: String },

    /// The data source file could not be read.
    #[error("failed to read data source {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_name_the_key() {
        let err = PatchError::MissingMimetype {
            key: "/img/a.png".to_string(),
        };
        assert!(err.to_string().contains("/img/a.png"));
    }
}
