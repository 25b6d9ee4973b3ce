//! Human-readable renderings of the audit trail
//!
//! Pure transforms over the record sequence produced by `AuditLog::read_all`;
//! nothing here touches the log itself.

use std::io::{self, Write};

use super::record::AuditRecord;

/// Renders records as a plain-text list, one block per patch.
pub fn render_text(records: impl IntoIterator<Item = AuditRecord>) -> String {
    let mut out = String::new();
    for (i, record) in records.into_iter().enumerate() {
        out.push_str(&format!("Patch #{}\n", i + 1));
        out.push_str(&format!("  Key      : {}\n", record.key));
        out.push_str(&format!("  Action   : {}\n", record.action));
        out.push_str(&format!("  Reason   : {}\n", record.reason));
        out.push_str(&format!("  Timestamp: {}\n", record.timestamp.to_rfc3339()));
        if let Some(digest) = &record.digest {
            out.push_str(&format!("  Digest   : {}\n", digest));
        }
        if let Some(mimetype) = &record.mimetype {
            out.push_str(&format!("  Mimetype : {}\n", mimetype));
        }
        if let Some(author) = &record.author {
            out.push_str(&format!("  Author   : {}\n", author));
        }
        out.push_str("  ---\n");
    }
    out
}

/// Writes records as a static HTML report.
///
/// Key, reason, mimetype, and author are operator-controlled text and are
/// escaped before interpolation.
pub fn export_html<W: Write>(
    records: impl IntoIterator<Item = AuditRecord>,
    sink: &mut W,
) -> io::Result<()> {
    writeln!(
        sink,
        "<html><head><title>Patch Audit Report</title></head><body>"
    )?;
    writeln!(sink, "<h1>Patch Audit Log</h1><ul>")?;
    for record in records {
        writeln!(
            sink,
            "<li><strong>{}</strong>: {}<br>",
            escape_html(&record.key),
            escape_html(&record.reason)
        )?;
        write!(
            sink,
            "Action: {} | Time: {}",
            record.action,
            record.timestamp.to_rfc3339()
        )?;
        if let Some(mimetype) = &record.mimetype {
            write!(sink, " | Mimetype: {}", escape_html(mimetype))?;
        }
        if let Some(author) = &record.author {
            write!(sink, " | Author: {}", escape_html(author))?;
        }
        writeln!(sink, "</li>")?;
    }
    write!(sink, "</ul></body></html>")?;
    Ok(())
}

/// Escapes text for interpolation into HTML element content or attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}
