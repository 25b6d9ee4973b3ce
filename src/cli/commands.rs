//! CLI command implementations
//!
//! Mutation commands open the patch store read-write, run one engine call,
//! and print a confirmation naming the action, key, and mode. The audit-log
//! path is threaded explicitly into every mutation and export; there is no
//! ambient log location.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audit::{export_html, render_text, AuditLog, AuditRecord};
use crate::observability::Logger;
use crate::overlay::LayeredReader;
use crate::patch::{PatchAction, PatchEngine, PatchMode, PatchOutcome, PatchRequest, PatchStore};
use crate::server::{ContentServer, ContentState, ServerConfig};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Deployment configuration for the `serve` subcommand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Patch store directory (opened read-only by the server)
    pub patch_db: String,

    /// Base store directory (always read-only)
    pub base_db: String,

    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::Config(format!("invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.patch_db.is_empty() {
            return Err(CliError::Config("patch_db must not be empty".to_string()));
        }
        if self.base_db.is_empty() {
            return Err(CliError::Config("base_db must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Parse arguments and dispatch.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Dispatch one parsed subcommand.
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::ApplyText {
            db,
            key,
            reason,
            file,
            mimetype,
            author,
            audit_log,
        } => {
            if mimetype.is_some() {
                Logger::warn(
                    "mimetype_ignored",
                    &[
                        ("key", key.as_str()),
                        ("detail", "text patches serve with the default mimetype"),
                    ],
                );
            }
            let request = with_author(
                PatchRequest::new(key, PatchAction::Add, reason)
                    .with_mode(PatchMode::Text)
                    .with_source(file),
                author,
            );
            mutate(&db, &audit_log, request)
        }

        Command::AddBinary {
            db,
            key,
            reason,
            file,
            mimetype,
            author,
            audit_log,
        } => {
            let request = with_author(
                PatchRequest::new(key, PatchAction::Add, reason)
                    .with_mode(PatchMode::Binary)
                    .with_source(file)
                    .with_mimetype(mimetype),
                author,
            );
            mutate(&db, &audit_log, request)
        }

        Command::RemovePatch {
            db,
            key,
            reason,
            author,
            audit_log,
        } => {
            let request = with_author(PatchRequest::new(key, PatchAction::Remove, reason), author);
            mutate(&db, &audit_log, request)
        }

        Command::ListPatches { audit_log } => list_patches(&audit_log),

        Command::ExportAuditHtml { output, audit_log } => export_audit_html(&output, &audit_log),

        Command::Serve { config } => serve(&config),
    }
}

fn with_author(request: PatchRequest, author: Option<String>) -> PatchRequest {
    match author {
        Some(author) => request.with_author(author),
        None => request,
    }
}

/// Run one mutation through the engine and report the outcome.
fn mutate(db: &Path, audit_log: &Path, request: PatchRequest) -> CliResult<()> {
    let store = PatchStore::open(db)?;
    let audit = AuditLog::new(audit_log);
    let mut engine = PatchEngine::new(store, audit);

    let outcome = engine.apply(request)?;
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &PatchOutcome) {
    if let Some(warning) = &outcome.warning {
        Logger::warn("patch_anomaly", &[("detail", warning.as_str())]);
    }
    println!(
        "Patch {}: {} [mode: {}]",
        outcome.action, outcome.key, outcome.mode
    );
}

fn collect_records(audit_log: &Path) -> CliResult<Vec<AuditRecord>> {
    let log = AuditLog::new(audit_log);
    let records = log.read_all()?.collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

fn list_patches(audit_log: &Path) -> CliResult<()> {
    let records = collect_records(audit_log)?;
    if records.is_empty() {
        println!("No patches found.");
        return Ok(());
    }
    print!("{}", render_text(records));
    Ok(())
}

fn export_audit_html(output: &Path, audit_log: &Path) -> CliResult<()> {
    let records = collect_records(audit_log)?;
    let file = fs::File::create(output)?;
    let mut sink = BufWriter::new(file);
    export_html(records, &mut sink)?;
    println!("Exported audit log to {}", output.display());
    Ok(())
}

fn serve(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;

    let reader = LayeredReader::open(
        &PathBuf::from(&config.patch_db),
        &PathBuf::from(&config.base_db),
    )?;
    let state = Arc::new(ContentState::new(reader));
    let server = ContentServer::with_config(config.server, state);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.start())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_config_load_and_validate() {
        let temp = TempDir::new().unwrap();
        let path = write_file(
            temp.path(),
            "patchdb.json",
            br#"{"patch_db": "patch", "base_db": "base", "server": {"port": 8000}}"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.patch_db, "patch");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_config_rejects_empty_paths() {
        let temp = TempDir::new().unwrap();
        let path = write_file(
            temp.path(),
            "patchdb.json",
            br#"{"patch_db": "", "base_db": "base"}"#,
        );

        assert!(matches!(Config::load(&path), Err(CliError::Config(_))));
    }

    #[test]
    fn test_apply_text_command_end_to_end() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("patch");
        let audit_log = temp.path().join("audit/patch_log.jsonl");
        let source = write_file(temp.path(), "page.html", b"Hello World!");

        run_command(Command::ApplyText {
            db: db.clone(),
            key: "/docs/x.html".to_string(),
            reason: "fix typo".to_string(),
            file: source,
            mimetype: None,
            author: None,
            audit_log: audit_log.clone(),
        })
        .unwrap();

        let store = PatchStore::open_read_only(&db).unwrap();
        assert_eq!(
            store.get_content(b"/docs/x.html").unwrap(),
            Some(b"Hello World!".to_vec())
        );
        let records = collect_records(&audit_log).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "/docs/x.html");
    }

    #[test]
    fn test_list_patches_on_missing_log_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        run_command(Command::ListPatches {
            audit_log: temp.path().join("nonexistent.jsonl"),
        })
        .unwrap();
    }

    #[test]
    fn test_export_audit_html_writes_report() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("patch");
        let audit_log = temp.path().join("log.jsonl");
        let source = write_file(temp.path(), "page.html", b"content");

        run_command(Command::ApplyText {
            db,
            key: "/a".to_string(),
            reason: "because".to_string(),
            file: source,
            mimetype: None,
            author: None,
            audit_log: audit_log.clone(),
        })
        .unwrap();

        let output = temp.path().join("report.html");
        run_command(Command::ExportAuditHtml {
            output: output.clone(),
            audit_log,
        })
        .unwrap();

        let html = fs::read_to_string(&output).unwrap();
        assert!(html.contains("Patch Audit Log"));
        assert!(html.contains("/a"));
    }
}
