//! Flat blob storage contract
//!
//! Everything the record store persists goes through [`BlobStore`]: a
//! namespace-scoped, flat key -> bytes store with `get`/`set`/`erase`
//! semantics and a `commit` durability barrier. The store has no ordering, no
//! scans, and no multi-key transactions; the table layer builds its linked
//! structure entirely out of these primitives.
//!
//! An implementation *is* an open handle onto one namespace. Two shipped
//! implementations:
//!
//! - [`MemoryBlobStore`] - in-process map, cloning yields a second handle
//!   onto the same namespace (useful for tests and host-side tooling)
//! - [`FileBlobStore`] - one file per key under a namespace directory, with
//!   fsync-backed durability
//!
//! [`FaultStore`] wraps any store and injects write failures for testing the
//! store's documented partial-write behavior.

mod fault;
mod file;
mod memory;

use thiserror::Error;

pub use fault::FaultStore;
pub use file::FileBlobStore;
pub use memory::MemoryBlobStore;

/// Maximum key length the store accepts, in bytes.
///
/// This is the historical limit of the embedded flash store the record layout
/// was designed for; all key derivation in the table layer is bounded by it.
pub const MAX_KEY_LEN: usize = 15;

/// Result type for blob store operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors surfaced by a blob store
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found")]
    NotFound,

    #[error("key too long: {key:?} exceeds {MAX_KEY_LEN} bytes")]
    KeyTooLong { key: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store failure: {0}")]
    Backend(String),
}

/// A namespace-scoped flat blob store.
///
/// Methods take `&self`; implementations use interior mutability. This lets
/// the table layer serialize writers with its own mutex while leaving reads
/// unguarded, matching the concurrency model documented on
/// [`crate::table::Table`].
pub trait BlobStore {
    /// Read the blob stored under `key`.
    ///
    /// Returns [`BlobError::NotFound`] if no blob exists under that key.
    fn get(&self, key: &str) -> BlobResult<Vec<u8>>;

    /// Write (or overwrite) the blob under `key`.
    ///
    /// Returns [`BlobError::KeyTooLong`] if `key` exceeds [`MAX_KEY_LEN`].
    fn set(&self, key: &str, value: &[u8]) -> BlobResult<()>;

    /// Erase the blob under `key`.
    ///
    /// Returns [`BlobError::NotFound`] if no blob exists under that key.
    fn erase(&self, key: &str) -> BlobResult<()>;

    /// Erase every blob in the namespace, the table metadata included.
    fn erase_all(&self) -> BlobResult<()>;

    /// Durability barrier: persist everything written since the last commit.
    fn commit(&self) -> BlobResult<()>;

    /// Best-effort recovery after a failed multi-blob sequence.
    ///
    /// This reopens or revalidates the handle; it does **not** undo writes
    /// that already landed. The table layer calls it before surfacing a
    /// mid-sequence failure to the caller.
    fn recover(&self) -> BlobResult<()> {
        Ok(())
    }
}

/// Validate a key against [`MAX_KEY_LEN`]. Shared by implementations.
pub(crate) fn check_key(key: &str) -> BlobResult<()> {
    if key.len() > MAX_KEY_LEN {
        return Err(BlobError::KeyTooLong {
            key: key.to_string(),
        });
    }
    Ok(())
}
