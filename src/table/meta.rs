//! Table metadata
//!
//! One metadata blob per table, keyed `_meta_<namespace>`:
//!
//! ```text
//! +------------------+
//! | count            | (u32 LE, live records)
//! +------------------+
//! | head key         | ([u8; 15], zero-padded; all-zero = empty table)
//! +------------------+
//! | checksum         | (u32 LE, CRC32 of all preceding bytes)
//! +------------------+
//! ```
//!
//! A missing metadata blob is not a fault: an empty table is a valid steady
//! state, and `load` returns the zero default for it.

use crate::blobstore::{BlobError, BlobStore, MAX_KEY_LEN};

use super::errors::{TableError, TableResult};
use super::key::StoreKey;

const META_LEN: usize = 4 + MAX_KEY_LEN + 4;

/// In-memory form of the metadata blob.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct TableMeta {
    pub count: u32,
    pub head: Option<StoreKey>,
}

impl TableMeta {
    /// Load the metadata blob, or the zero default if none exists yet.
    pub fn load<S: BlobStore>(store: &S, meta_key: &StoreKey) -> TableResult<Self> {
        let blob = match store.get(meta_key.as_str()) {
            Ok(blob) => blob,
            Err(BlobError::NotFound) => return Ok(Self::default()),
            Err(e) => return Err(TableError::Store(e)),
        };
        Self::decode(meta_key, &blob)
    }

    /// Overwrite the metadata blob.
    pub fn save<S: BlobStore>(&self, store: &S, meta_key: &StoreKey) -> TableResult<()> {
        store.set(meta_key.as_str(), &self.encode())?;
        Ok(())
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(META_LEN);
        buf.extend_from_slice(&self.count.to_le_bytes());
        buf.extend_from_slice(&StoreKey::encode_field(self.head.as_ref()));
        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        buf
    }

    fn decode(meta_key: &StoreKey, blob: &[u8]) -> TableResult<Self> {
        let corrupt = |reason: String| TableError::CorruptRecord {
            key: meta_key.to_string(),
            reason,
        };

        if blob.len() != META_LEN {
            return Err(corrupt(format!(
                "metadata blob is {} bytes, expected {META_LEN}",
                blob.len()
            )));
        }

        let crc_offset = META_LEN - 4;
        let stored_crc = u32::from_le_bytes([
            blob[crc_offset],
            blob[crc_offset + 1],
            blob[crc_offset + 2],
            blob[crc_offset + 3],
        ]);
        let computed_crc = crc32fast::hash(&blob[..crc_offset]);
        if stored_crc != computed_crc {
            return Err(corrupt(format!(
                "checksum mismatch: computed {computed_crc:08x}, stored {stored_crc:08x}"
            )));
        }

        let count = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]);
        let mut head_field = [0u8; MAX_KEY_LEN];
        head_field.copy_from_slice(&blob[4..crc_offset]);
        let head = StoreKey::decode_field(&head_field).map_err(corrupt)?;

        Ok(Self { count, head })
    }
}
