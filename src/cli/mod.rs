//! CLI for patchdb
//!
//! Subcommands:
//! - apply-text: apply a text/HTML patch
//! - add-binary: add a binary (image, PDF) patch
//! - remove-patch: remove a patch by key
//! - list-patches: print the audit log
//! - export-audit-html: export the audit log as HTML
//! - serve: run the read-only content server

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{run, run_command, Config};
pub use errors::{CliError, CliResult};
