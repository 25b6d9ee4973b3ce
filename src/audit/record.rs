//! Audit record wire format
//!
//! One JSON object per line, UTF-8. Absent optional fields are omitted from
//! the wire, never emitted as null.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a mutation did to the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Add,
    Replace,
    Remove,
    /// Legacy vocabulary found in older exported logs. Accepted when
    /// reading; never emitted by the engine.
    #[serde(rename = "added_or_modified")]
    AddedOrModified,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Add => "add",
            AuditAction::Replace => "replace",
            AuditAction::Remove => "remove",
            AuditAction::AddedOrModified => "added_or_modified",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable entry in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// The key that was patched.
    pub key: String,
    /// What happened to it.
    pub action: AuditAction,
    /// Operator-supplied justification.
    pub reason: String,
    /// Capture time, UTC.
    pub timestamp: DateTime<Utc>,
    /// MD5 hex digest of the stored bytes; add/replace only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Mimetype of the stored bytes; binary mutations only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    /// Operator identity, when supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl AuditRecord {
    /// Creates a record stamped with the current UTC time.
    pub fn new(
        key: impl Into<String>,
        action: AuditAction,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            action,
            reason: reason.into(),
            timestamp: Utc::now(),
            digest: None,
            mimetype: None,
            author: None,
        }
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
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
