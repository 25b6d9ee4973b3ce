//! patchdb - a durable patch overlay store for immutable archives
//!
//! A read path merges a mutable patch store over an immutable base store so
//! that patch entries transparently shadow base entries; a write path
//! applies audited add/replace/remove mutations to the patch store. Every
//! mutation lands in an append-only JSONL audit trail that makes it
//! attributable and replayable.

pub mod audit;
pub mod cli;
pub mod observability;
pub mod overlay;
pub mod patch;
pub mod server;
pub mod store;
