//! CLI error types

use std::io;

use thiserror::Error;

use crate::audit::AuditError;
use crate::patch::PatchError;
use crate::store::StoreError;

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

/// Errors surfaced at the command level; all are fatal for the invocation.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
