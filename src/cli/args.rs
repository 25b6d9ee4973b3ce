//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_AUDIT_LOG: &str = "audit/patch_log.jsonl";

/// patchdb - a durable patch overlay store for immutable archives
#[derive(Parser, Debug)]
#[command(name = "patchdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply a text/HTML patch
    ApplyText {
        /// Path to the patch store
        #[arg(long)]
        db: PathBuf,

        /// Key to patch
        #[arg(long)]
        key: String,

        /// Reason for the patch
        #[arg(long)]
        reason: String,

        /// File holding the replacement content
        #[arg(long)]
        file: PathBuf,

        /// Ignored for text patches; they serve with the default mimetype
        #[arg(long)]
        mimetype: Option<String>,

        /// Operator identity recorded in the audit log
        #[arg(long)]
        author: Option<String>,

        /// Path to the audit log
        #[arg(long, default_value = DEFAULT_AUDIT_LOG)]
        audit_log: PathBuf,
    },

    /// Add a binary (image, PDF) patch
    AddBinary {
        /// Path to the patch store
        #[arg(long)]
        db: PathBuf,

        /// Key to patch
        #[arg(long)]
        key: String,

        /// Reason for the patch
        #[arg(long)]
        reason: String,

        /// File holding the binary payload
        #[arg(long)]
        file: PathBuf,

        /// Mimetype to serve the payload with
        #[arg(long)]
        mimetype: String,

        /// Operator identity recorded in the audit log
        #[arg(long)]
        author: Option<String>,

        /// Path to the audit log
        #[arg(long, default_value = DEFAULT_AUDIT_LOG)]
        audit_log: PathBuf,
    },

    /// Remove a patch by key
    RemovePatch {
        /// Path to the patch store
        #[arg(long)]
        db: PathBuf,

        /// Key to remove
        #[arg(long)]
        key: String,

        /// Reason for the removal
        #[arg(long)]
        reason: String,

        /// Operator identity recorded in the audit log
        #[arg(long)]
        author: Option<String>,

        /// Path to the audit log
        #[arg(long, default_value = DEFAULT_AUDIT_LOG)]
        audit_log: PathBuf,
    },

    /// List the audit log
    ListPatches {
        /// Path to the audit log
        #[arg(long, default_value = DEFAULT_AUDIT_LOG)]
        audit_log: PathBuf,
    },

    /// Export the audit log as HTML
    ExportAuditHtml {
        /// Output HTML file
        #[arg(long)]
        output: PathBuf,

        /// Path to the audit log
        #[arg(long, default_value = DEFAULT_AUDIT_LOG)]
        audit_log: PathBuf,
    },

    /// Run the read-only content server
    Serve {
        /// Path to the configuration file
        #[arg(long, default_value = "./patchdb.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
