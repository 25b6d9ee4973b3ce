//! Patch application for patchdb
//!
//! The patch store partitions one physical key-value store into content and
//! mimetype sub-namespaces sharing the key domain. The engine applies
//! add/replace/remove mutations against those namespaces, fingerprints the
//! written bytes, and journals every mutation to the audit log.

mod digest;
mod engine;
mod errors;
mod store;

pub use digest::content_digest;
pub use engine::{PatchAction, PatchEngine, PatchMode, PatchOutcome, PatchRequest};
pub use errors::{PatchError, PatchResult};
pub use store::PatchStore;
