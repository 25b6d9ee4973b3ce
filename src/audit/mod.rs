//! Audit trail for patchdb
//!
//! Every mutation appends one JSON record to a single append-only JSONL
//! file. Records are never updated or deleted; the log is the source of
//! truth for what happened, independent of current store state. Reading is
//! lazy and restartable, and a log that does not exist yet reads as empty.

mod errors;
mod export;
mod log;
mod record;

pub use errors::{AuditError, AuditResult};
pub use export::{escape_html, export_html, render_text};
pub use log::{AuditIter, AuditLog};
pub use record::{AuditAction, AuditRecord};
