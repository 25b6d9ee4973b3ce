//! Patch application engine
//!
//! One `apply` call = one mutation = one audit record. The engine owns the
//! patch store mutably, so mutations within a process are serialized by
//! construction. Store writes happen first, then the audit append; the call
//! fails as a whole if either fails, and nothing is retried internally.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::audit::{AuditAction, AuditLog, AuditRecord};

use super::digest::content_digest;
use super::errors::{PatchError, PatchResult};
use super::store::PatchStore;

/// Requested mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchAction {
    Add,
    Replace,
    Remove,
}

impl PatchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchAction::Add => "add",
            PatchAction::Replace => "replace",
            PatchAction::Remove => "remove",
        }
    }
}

impl fmt::Display for PatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<PatchAction> for AuditAction {
    fn from(action: PatchAction) -> Self {
        match action {
            PatchAction::Add => AuditAction::Add,
            PatchAction::Replace => AuditAction::Replace,
            PatchAction::Remove => AuditAction::Remove,
        }
    }
}

/// Which sub-namespaces a mutation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchMode {
    /// Content only; mimetype defaults at read time.
    Text,
    /// Content plus a stored mimetype.
    Binary,
}

impl PatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchMode::Text => "text",
            PatchMode::Binary => "binary",
        }
    }
}

impl fmt::Display for PatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One mutation request.
#[derive(Debug, Clone)]
pub struct PatchRequest {
    pub key: String,
    pub action: PatchAction,
    pub reason: String,
    /// Required for add/replace; inferred for remove when absent.
    pub mode: Option<PatchMode>,
    /// File holding the payload; required for add/replace.
    pub source: Option<PathBuf>,
    /// Required for binary add/replace.
    pub mimetype: Option<String>,
    pub author: Option<String>,
}

impl PatchRequest {
    pub fn new(
        key: impl Into<String>,
        action: PatchAction,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            action,
            reason: reason.into(),
            mode: None,
            source: None,
            mimetype: None,
            author: None,
        }
    }

    pub fn with_mode(mut self, mode: PatchMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// What a successful mutation did, for the operator-facing caller.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub key: String,
    /// The action actually recorded (a requested add of an existing key is
    /// recorded as replace).
    pub action: PatchAction,
    pub mode: PatchMode,
    pub digest: Option<String>,
    /// Non-fatal anomaly the caller should surface to the operator.
    pub warning: Option<String>,
}

/// Applies mutations to the patch store and journals them.
pub struct PatchEngine {
    store: PatchStore,
    audit: AuditLog,
}

impl PatchEngine {
    pub fn new(store: PatchStore, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    pub fn store(&self) -> &PatchStore {
        &self.store
    }

    /// Applies one mutation and appends its audit record.
    pub fn apply(&mut self, request: PatchRequest) -> PatchResult<PatchOutcome> {
        match request.action {
            PatchAction::Remove => self.apply_remove(request),
            PatchAction::Add | PatchAction::Replace => self.apply_upsert(request),
        }
    }

    fn apply_upsert(&mut self, request: PatchRequest) -> PatchResult<PatchOutcome> {
        let key_bytes = request.key.as_bytes();

        let mode = request.mode.ok_or_else(|| PatchError::MissingMode {
            key: request.key.clone(),
        })?;
        let source = request.source.as_ref().ok_or_else(|| PatchError::MissingSource {
            key: request.key.clone(),
        })?;
        // Validate the mimetype requirement before touching the store.
        if mode == PatchMode::Binary && request.mimetype.is_none() {
            return Err(PatchError::MissingMimetype {
                key: request.key.clone(),
            });
        }

        let data = fs::read(source).map_err(|e| PatchError::Source {
            path: source.clone(),
            source: e,
        })?;

        // The audit vocabulary reflects what actually happened: creating a
        // fresh key is an add, overwriting an existing one is a replace,
        // whichever was requested.
        let action = if self.store.has_content(key_bytes) {
            PatchAction::Replace
        } else {
            PatchAction::Add
        };

        match mode {
            PatchMode::Binary => {
                let mimetype = request.mimetype.as_deref().unwrap_or_default();
                self.store.put_binary(key_bytes, &data, mimetype)?;
            }
            PatchMode::Text => {
                self.store.put_text(key_bytes, &data)?;
            }
        }

        let digest = content_digest(&data);
        let mut record = AuditRecord::new(request.key.as_str(), action.into(), request.reason.as_str())
            .with_digest(digest.clone());
        if mode == PatchMode::Binary {
            if let Some(mimetype) = &request.mimetype {
                record = record.with_mimetype(mimetype.as_str());
            }
        }
        if let Some(author) = &request.author {
            record = record.with_author(author.as_str());
        }
        self.audit.append(&record)?;

        Ok(PatchOutcome {
            key: request.key,
            action,
            mode,
            digest: Some(digest),
            warning: None,
        })
    }

    fn apply_remove(&mut self, request: PatchRequest) -> PatchResult<PatchOutcome> {
        let key_bytes = request.key.as_bytes();

        let mut warning = None;
        let mode = match request.mode {
            Some(mode) => mode,
            None => {
                // Infer from what the store holds: a stored mimetype means
                // the entry was added as binary.
                if self.store.has_mimetype(key_bytes) {
                    PatchMode::Binary
                } else if self.store.has_content(key_bytes) {
                    PatchMode::Text
                } else {
                    warning = Some(format!(
                        "key '{}' was never patched; defaulting to text mode",
                        request.key
                    ));
                    PatchMode::Text
                }
            }
        };

        // Removing an absent key is a no-op on the store but still audited.
        match mode {
            PatchMode::Binary => self.store.remove_binary(key_bytes)?,
            PatchMode::Text => self.store.remove_text(key_bytes)?,
        }

        let mut record =
            AuditRecord::new(request.key.as_str(), AuditAction::Remove, request.reason.as_str());
        if let Some(author) = &request.author {
            record = record.with_author(author.as_str());
        }
        self.audit.append(&record)?;

        Ok(PatchOutcome {
            key: request.key,
            action: PatchAction::Remove,
            mode,
            digest: None,
            warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn engine_in(temp: &TempDir) -> PatchEngine {
        let store = PatchStore::open(&temp.path().join("patch")).unwrap();
        let audit = AuditLog::new(temp.path().join("audit/patch_log.jsonl"));
        PatchEngine::new(store, audit)
    }

    fn source_file(temp: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = temp.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_text_add_stores_content_only() {
        let temp = TempDir::new().unwrap();
        let mut engine = engine_in(&temp);
        let source = source_file(&temp, "page.html", b"Hello World!");

        let outcome = engine
            .apply(
                PatchRequest::new("/docs/x.html", PatchAction::Add, "fix typo")
                    .with_mode(PatchMode::Text)
                    .with_source(&source),
            )
            .unwrap();

        assert_eq!(outcome.action, PatchAction::Add);
        assert_eq!(outcome.mode, PatchMode::Text);
        assert!(outcome.warning.is_none());
        assert_eq!(
            engine.store().get_content(b"/docs/x.html").unwrap(),
            Some(b"Hello World!".to_vec())
        );
        assert_eq!(engine.store().get_mimetype(b"/docs/x.html").unwrap(), None);
    }

    #[test]
    fn test_binary_add_keeps_pair_together() {
        let temp = TempDir::new().unwrap();
        let mut engine = engine_in(&temp);
        let source = source_file(&temp, "a.png", &[0x00, 0x01, 0x02]);

        engine
            .apply(
                PatchRequest::new("/img/a.png", PatchAction::Add, "restore image")
                    .with_mode(PatchMode::Binary)
                    .with_source(&source)
                    .with_mimetype("application/octet-stream"),
            )
            .unwrap();

        assert!(engine.store().has_content(b"/img/a.png"));
        assert_eq!(
            engine.store().get_mimetype(b"/img/a.png").unwrap(),
            Some("application/octet-stream".to_string())
        );
    }

    #[test]
    fn test_binary_add_without_mimetype_is_input_error() {
        let temp = TempDir::new().unwrap();
        let mut engine = engine_in(&temp);
        let source = source_file(&temp, "a.png", b"png");

        let result = engine.apply(
            PatchRequest::new("/img/a.png", PatchAction::Add, "restore")
                .with_mode(PatchMode::Binary)
                .with_source(&source),
        );
        assert!(matches!(result, Err(PatchError::MissingMimetype { .. })));
        // Input errors leave the store untouched.
        assert!(!engine.store().has_content(b"/img/a.png"));
    }

    #[test]
    fn test_unreadable_source_is_input_error() {
        let temp = TempDir::new().unwrap();
        let mut engine = engine_in(&temp);

        let result = engine.apply(
            PatchRequest::new("/docs/x.html", PatchAction::Add, "fix")
                .with_mode(PatchMode::Text)
                .with_source(temp.path().join("does-not-exist")),
        );
        assert!(matches!(result, Err(PatchError::Source { .. })));
        assert!(!engine.store().has_content(b"/docs/x.html"));
    }

    #[test]
    fn test_add_of_existing_key_recorded_as_replace() {
        let temp = TempDir::new().unwrap();
        let mut engine = engine_in(&temp);
        let first = source_file(&temp, "v1.html", b"one");
        let second = source_file(&temp, "v2.html", b"two");

        let outcome = engine
            .apply(
                PatchRequest::new("/docs/x.html", PatchAction::Add, "first")
                    .with_mode(PatchMode::Text)
                    .with_source(&first),
            )
            .unwrap();
        assert_eq!(outcome.action, PatchAction::Add);

        let outcome = engine
            .apply(
                PatchRequest::new("/docs/x.html", PatchAction::Add, "second")
                    .with_mode(PatchMode::Text)
                    .with_source(&second),
            )
            .unwrap();
        assert_eq!(outcome.action, PatchAction::Replace);
        assert_eq!(
            engine.store().get_content(b"/docs/x.html").unwrap(),
            Some(b"two".to_vec())
        );
    }

    #[test]
    fn test_remove_infers_binary_mode_from_mimetype() {
        let temp = TempDir::new().unwrap();
        let mut engine = engine_in(&temp);
        let source = source_file(&temp, "a.png", b"png");

        engine
            .apply(
                PatchRequest::new("/img/a.png", PatchAction::Add, "add")
                    .with_mode(PatchMode::Binary)
                    .with_source(&source)
                    .with_mimetype("image/png"),
            )
            .unwrap();

        let outcome = engine
            .apply(PatchRequest::new("/img/a.png", PatchAction::Remove, "takedown"))
            .unwrap();
        assert_eq!(outcome.mode, PatchMode::Binary);
        assert!(outcome.warning.is_none());
        assert!(!engine.store().has_content(b"/img/a.png"));
        assert!(!engine.store().has_mimetype(b"/img/a.png"));
    }

    #[test]
    fn test_remove_infers_text_mode_from_content() {
        let temp = TempDir::new().unwrap();
        let mut engine = engine_in(&temp);
        let source = source_file(&temp, "page.html", b"text");

        engine
            .apply(
                PatchRequest::new("/docs/x.html", PatchAction::Add, "add")
                    .with_mode(PatchMode::Text)
                    .with_source(&source),
            )
            .unwrap();

        let outcome = engine
            .apply(PatchRequest::new("/docs/x.html", PatchAction::Remove, "undo"))
            .unwrap();
        assert_eq!(outcome.mode, PatchMode::Text);
        assert!(outcome.warning.is_none());
    }

    #[test]
    fn test_remove_of_unpatched_key_warns_and_succeeds() {
        let temp = TempDir::new().unwrap();
        let mut engine = engine_in(&temp);

        let outcome = engine
            .apply(PatchRequest::new(
                "/never/patched",
                PatchAction::Remove,
                "cleanup",
            ))
            .unwrap();
        assert_eq!(outcome.mode, PatchMode::Text);
        assert!(outcome.warning.is_some());
        assert_eq!(outcome.action, PatchAction::Remove);
    }

    #[test]
    fn test_digest_matches_stored_bytes() {
        let temp = TempDir::new().unwrap();
        let mut engine = engine_in(&temp);
        let source = source_file(&temp, "abc.txt", b"abc");

        let outcome = engine
            .apply(
                PatchRequest::new("/abc", PatchAction::Add, "r")
                    .with_mode(PatchMode::Text)
                    .with_source(&source),
            )
            .unwrap();
        assert_eq!(
            outcome.digest.as_deref(),
            Some("900150983cd24fb0d6963f7d28e17f72")
        );
    }
}
