//! Content fingerprints for audit records

use md5::{Digest, Md5};

/// MD5 hex digest over the exact bytes written to the content namespace.
///
/// MD5 is a fingerprint for change tracking here, not an integrity or
/// security boundary; the store's own checksums cover integrity.
pub fn content_digest(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
