//! Key-value store medium for patchdb
//!
//! An ordered, durable, persistent key-value store backed by a single
//! append-only record log with an in-memory key index.
//!
//! # Design
//!
//! - Append-only log file, no in-place updates
//! - CRC32 on every record, verified on every read
//! - Deletes are tombstones; latest record for a key wins
//! - Key index rebuilt by scanning the log at open; values stay on disk
//! - `WriteBatch` groups several mutations into one write + one fsync
//! - A truncated record at the log tail (crash mid-append) is recovered:
//!   read-write opens truncate it away, read-only opens index up to it.
//!   A bad checksum on a complete record is corruption and is never ignored.

mod errors;
mod kv;
mod record;

pub use errors::{StoreError, StoreResult};
pub use kv::{KvStore, WriteBatch};
pub use record::LogRecord;
