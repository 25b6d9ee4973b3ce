//! Observability for patchdb
//!
//! Structured logging only. Operator-facing command output goes through
//! plain stdout in the CLI layer; this module is for diagnostics.

mod logger;

pub use logger::{Logger, Severity};
