//! In-memory blob store
//!
//! Backs tests and host-side tooling. Cloning a [`MemoryBlobStore`] yields a
//! second handle onto the same namespace, the way reopening a flash namespace
//! does on device.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{check_key, BlobError, BlobResult, BlobStore};

#[derive(Debug, Default)]
struct Inner {
    blobs: HashMap<String, Vec<u8>>,
    commits: u64,
    recovers: u64,
}

/// In-memory [`BlobStore`] over a shared map.
#[derive(Clone, Debug, Default)]
pub struct MemoryBlobStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryBlobStore {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored, metadata included.
    pub fn blob_count(&self) -> usize {
        self.inner.read().blobs.len()
    }

    /// Number of `commit` calls since creation.
    pub fn commit_count(&self) -> u64 {
        self.inner.read().commits
    }

    /// Number of `recover` calls since creation.
    pub fn recover_count(&self) -> u64 {
        self.inner.read().recovers
    }

    /// Raw read of a stored blob, bypassing the store contract.
    ///
    /// Test hook: lets integration tests inspect (or corrupt) what the table
    /// layer actually persisted.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.read().blobs.get(key).cloned()
    }

    /// Raw overwrite of a stored blob, bypassing the store contract.
    pub fn raw_set(&self, key: &str, value: Vec<u8>) {
        self.inner.write().blobs.insert(key.to_string(), value);
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> BlobResult<Vec<u8>> {
        self.inner
            .read()
            .blobs
            .get(key)
            .cloned()
            .ok_or(BlobError::NotFound)
    }

    fn set(&self, key: &str, value: &[u8]) -> BlobResult<()> {
        check_key(key)?;
        self.inner
            .write()
            .blobs
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn erase(&self, key: &str) -> BlobResult<()> {
        match self.inner.write().blobs.remove(key) {
            Some(_) => Ok(()),
            None => Err(BlobError::NotFound),
        }
    }

    fn erase_all(&self) -> BlobResult<()> {
        self.inner.write().blobs.clear();
        Ok(())
    }

    fn commit(&self) -> BlobResult<()> {
        self.inner.write().commits += 1;
        Ok(())
    }

    fn recover(&self) -> BlobResult<()> {
        self.inner.write().recovers += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_roundtrip() {
        let store = MemoryBlobStore::new();
        store.set("rec_1", b"hello").unwrap();
        assert_eq!(store.get("rec_1").unwrap(), b"hello");
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = MemoryBlobStore::new();
        assert!(matches!(store.get("rec_1"), Err(BlobError::NotFound)));
    }

    #[test]
    fn test_erase_removes_blob() {
        let store = MemoryBlobStore::new();
        store.set("rec_1", b"x").unwrap();
        store.erase("rec_1").unwrap();
        assert!(matches!(store.get("rec_1"), Err(BlobError::NotFound)));
    }

    #[test]
    fn test_erase_missing_is_not_found() {
        let store = MemoryBlobStore::new();
        assert!(matches!(store.erase("rec_1"), Err(BlobError::NotFound)));
    }

    #[test]
    fn test_erase_all_clears_namespace() {
        let store = MemoryBlobStore::new();
        store.set("rec_1", b"a").unwrap();
        store.set("_meta_fp", b"b").unwrap();
        store.erase_all().unwrap();
        assert_eq!(store.blob_count(), 0);
    }

    #[test]
    fn test_key_length_enforced() {
        let store = MemoryBlobStore::new();
        let long_key = "k".repeat(16);
        assert!(matches!(
            store.set(&long_key, b"x"),
            Err(BlobError::KeyTooLong { .. })
        ));
    }

    #[test]
    fn test_clone_shares_namespace() {
        let store = MemoryBlobStore::new();
        let handle = store.clone();
        store.set("rec_1", b"shared").unwrap();
        assert_eq!(handle.get("rec_1").unwrap(), b"shared");
    }
}
