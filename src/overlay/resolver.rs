//! Patch-over-base read resolver
//!
//! Presence in the patch store fully shadows the base store for a key, even
//! when the patch content is empty. The base dataset carries no mimetype
//! metadata, so base hits always serve with the default mimetype. A miss in
//! both layers is an explicit `None`, distinct from zero-length content.

use std::collections::BTreeSet;
use std::path::Path;

use crate::patch::PatchStore;
use crate::store::{KvStore, StoreResult};

/// Mimetype used when no stored mimetype applies.
pub const DEFAULT_MIMETYPE: &str = "text/plain";

/// The logical value a reader sees for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub content: Vec<u8>,
    /// Stored mimetype; `None` means the default applies at serve time.
    pub mimetype: Option<String>,
}

impl Resolved {
    pub fn mimetype_or_default(&self) -> &str {
        self.mimetype.as_deref().unwrap_or(DEFAULT_MIMETYPE)
    }
}

/// Read-side composition of a patch store over a base store.
pub struct LayeredReader {
    patch: PatchStore,
    base: KvStore,
}

impl LayeredReader {
    pub fn new(patch: PatchStore, base: KvStore) -> Self {
        Self { patch, base }
    }

    /// Opens both stores read-only; both must exist.
    pub fn open(patch_dir: &Path, base_dir: &Path) -> StoreResult<Self> {
        Ok(Self {
            patch: PatchStore::open_read_only(patch_dir)?,
            base: KvStore::open_read_only(base_dir)?,
        })
    }

    /// Resolves a key through the patch layer, falling back to the base.
    ///
    /// The mimetype namespace is consulted only when content came from the
    /// patch layer; a patch entry with content but no stored mimetype
    /// resolves with `mimetype: None` rather than failing.
    pub fn resolve(&self, key: &[u8]) -> StoreResult<Option<Resolved>> {
        if let Some(content) = self.patch.get_content(key)? {
            let mimetype = self.patch.get_mimetype(key)?;
            return Ok(Some(Resolved { content, mimetype }));
        }

        match self.base.get(key)? {
            Some(content) => Ok(Some(Resolved {
                content,
                mimetype: None,
            })),
            None => Ok(None),
        }
    }

    /// Sorted union of keys present in either layer.
    ///
    /// Iterates key indexes only; no values are loaded.
    pub fn all_keys(&self) -> Vec<Vec<u8>> {
        let mut keys: BTreeSet<Vec<u8>> = self.base.keys().map(|k| k.to_vec()).collect();
        for key in self.patch.content_keys() {
            keys.insert(key.to_vec());
        }
        keys.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn reader_with(
        temp: &TempDir,
        base_entries: &[(&[u8], &[u8])],
        setup: impl FnOnce(&mut PatchStore),
    ) -> LayeredReader {
        let base_dir = temp.path().join("base");
        {
            let mut base = KvStore::open(&base_dir).unwrap();
            for (key, value) in base_entries {
                base.put(key.to_vec(), value.to_vec()).unwrap();
            }
        }
        let mut patch = PatchStore::open(&temp.path().join("patch")).unwrap();
        setup(&mut patch);
        LayeredReader::new(patch, KvStore::open_read_only(&base_dir).unwrap())
    }

    #[test]
    fn test_patch_shadows_base() {
        let temp = TempDir::new().unwrap();
        let reader = reader_with(&temp, &[(b"/a", b"base copy")], |patch| {
            patch.put_text(b"/a", b"patched copy").unwrap();
        });

        let resolved = reader.resolve(b"/a").unwrap().unwrap();
        assert_eq!(resolved.content, b"patched copy");
    }

    #[test]
    fn test_fallback_to_base_with_default_mimetype() {
        let temp = TempDir::new().unwrap();
        let reader = reader_with(&temp, &[(b"/a", b"base copy")], |_| {});

        let resolved = reader.resolve(b"/a").unwrap().unwrap();
        assert_eq!(resolved.content, b"base copy");
        assert_eq!(resolved.mimetype, None);
        assert_eq!(resolved.mimetype_or_default(), DEFAULT_MIMETYPE);
    }

    #[test]
    fn test_miss_is_distinct_from_empty_content() {
        let temp = TempDir::new().unwrap();
        let reader = reader_with(&temp, &[], |patch| {
            patch.put_text(b"/empty", b"").unwrap();
        });

        assert_eq!(
            reader.resolve(b"/empty").unwrap(),
            Some(Resolved {
                content: Vec::new(),
                mimetype: None
            })
        );
        assert_eq!(reader.resolve(b"/missing").unwrap(), None);
    }

    #[test]
    fn test_empty_patch_content_still_shadows_base() {
        let temp = TempDir::new().unwrap();
        let reader = reader_with(&temp, &[(b"/a", b"base copy")], |patch| {
            patch.put_text(b"/a", b"").unwrap();
        });

        let resolved = reader.resolve(b"/a").unwrap().unwrap();
        assert!(resolved.content.is_empty());
    }

    #[test]
    fn test_patch_mimetype_used_for_patch_hits() {
        let temp = TempDir::new().unwrap();
        let reader = reader_with(&temp, &[], |patch| {
            patch.put_binary(b"/img", b"png bytes", "image/png").unwrap();
        });

        let resolved = reader.resolve(b"/img").unwrap().unwrap();
        assert_eq!(resolved.mimetype.as_deref(), Some("image/png"));
        assert_eq!(resolved.mimetype_or_default(), "image/png");
    }

    #[test]
    fn test_all_keys_sorted_union() {
        let temp = TempDir::new().unwrap();
        let reader = reader_with(&temp, &[(b"/b", b"2"), (b"/d", b"4")], |patch| {
            patch.put_text(b"/a", b"1").unwrap();
            patch.put_text(b"/b", b"also 2").unwrap();
            patch.put_binary(b"/c", b"3", "image/png").unwrap();
        });

        let keys = reader.all_keys();
        assert_eq!(
            keys,
            vec![
                b"/a".to_vec(),
                b"/b".to_vec(),
                b"/c".to_vec(),
                b"/d".to_vec()
            ]
        );
    }
}
