//! Content/mimetype split over one physical store
//!
//! The patch store holds two logical sub-namespaces addressed by the same
//! key: content bytes under the `c-` prefix and mimetype strings under the
//! `m-` prefix. A key present in the mimetype namespace is always present in
//! the content namespace; binary writes and removes keep that invariant by
//! touching both namespaces through a single write batch.

use std::path::Path;

use crate::store::{KvStore, StoreError, StoreResult, WriteBatch};

const CONTENT_PREFIX: &[u8] = b"c-";
const MIMETYPE_PREFIX: &[u8] = b"m-";

fn content_key(key: &[u8]) -> Vec<u8> {
    let mut prefixed = Vec::with_capacity(CONTENT_PREFIX.len() + key.len());
    prefixed.extend_from_slice(CONTENT_PREFIX);
    prefixed.extend_from_slice(key);
    prefixed
}

fn mimetype_key(key: &[u8]) -> Vec<u8> {
    let mut prefixed = Vec::with_capacity(MIMETYPE_PREFIX.len() + key.len());
    prefixed.extend_from_slice(MIMETYPE_PREFIX);
    prefixed.extend_from_slice(key);
    prefixed
}

/// The mutable overlay store, partitioned into content and mimetype
/// namespaces.
pub struct PatchStore {
    kv: KvStore,
}

impl PatchStore {
    /// Opens (or creates) the patch store read-write.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        Ok(Self {
            kv: KvStore::open(dir)?,
        })
    }

    /// Opens an existing patch store read-only (for the content server).
    pub fn open_read_only(dir: &Path) -> StoreResult<Self> {
        Ok(Self {
            kv: KvStore::open_read_only(dir)?,
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.kv.is_read_only()
    }

    pub fn path(&self) -> &Path {
        self.kv.path()
    }

    pub fn get_content(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.kv.get(&content_key(key))
    }

    /// The stored mimetype, if the key was patched as binary.
    pub fn get_mimetype(&self, key: &[u8]) -> StoreResult<Option<String>> {
        match self.kv.get(&mimetype_key(key))? {
            Some(raw) => {
                let mimetype = String::from_utf8(raw).map_err(|_| StoreError::InvalidValue {
                    key: String::from_utf8_lossy(key).into_owned(),
                    reason: "mimetype is not valid UTF-8".to_string(),
                })?;
                Ok(Some(mimetype))
            }
            None => Ok(None),
        }
    }

    pub fn has_content(&self, key: &[u8]) -> bool {
        self.kv.contains_key(&content_key(key))
    }

    pub fn has_mimetype(&self, key: &[u8]) -> bool {
        self.kv.contains_key(&mimetype_key(key))
    }

    /// Writes a text entry: content only, mimetype defaults at read time.
    pub fn put_text(&mut self, key: &[u8], content: &[u8]) -> StoreResult<()> {
        self.kv.put(content_key(key), content.to_vec())
    }

    /// Writes a binary entry: content and mimetype land in one batch so a
    /// reader never sees one without the other.
    pub fn put_binary(&mut self, key: &[u8], content: &[u8], mimetype: &str) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(content_key(key), content.to_vec());
        batch.put(mimetype_key(key), mimetype.as_bytes().to_vec());
        self.kv.apply(batch)
    }

    /// Removes a text entry (content namespace only).
    pub fn remove_text(&mut self, key: &[u8]) -> StoreResult<()> {
        self.kv.delete(content_key(key))
    }

    /// Removes a binary entry from both namespaces in one batch.
    pub fn remove_binary(&mut self, key: &[u8]) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(content_key(key));
        batch.delete(mimetype_key(key));
        self.kv.apply(batch)
    }

    /// Keys present in the content namespace, prefix stripped, ascending.
    pub fn content_keys(&self) -> impl Iterator<Item = &[u8]> {
        self.kv
            .keys_with_prefix(CONTENT_PREFIX)
            .map(|key| &key[CONTENT_PREFIX.len()..])
    }
}
