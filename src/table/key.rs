//! Typed store keys
//!
//! Every blob the record store touches is keyed by a [`StoreKey`]: a short
//! ASCII identifier bounded by the store's key-length limit. Keys are pure
//! functions of their inputs:
//!
//! - record key: `rec_<decimal id>` (collision-free over `u32` ids)
//! - metadata key: `_meta_<namespace>`
//!
//! Chain links (`next`/`prev`) and the metadata head are `Option<StoreKey>`;
//! on the wire a missing link is a zero-filled fixed-width field.

use std::fmt;

use crate::blobstore::MAX_KEY_LEN;

const RECORD_PREFIX: &str = "rec_";
const META_PREFIX: &str = "_meta_";

/// Longest decimal rendering of a u32 id ("4294967295").
const MAX_ID_DIGITS: usize = 10;

// Record keys for any u32 id must fit the store's key limit.
const _: () = assert!(RECORD_PREFIX.len() + MAX_ID_DIGITS <= MAX_KEY_LEN);

/// Longest namespace for which the metadata key still fits the store limit.
pub const MAX_NAMESPACE_LEN: usize = MAX_KEY_LEN - META_PREFIX.len();

/// A store key held inline, never longer than [`MAX_KEY_LEN`] bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StoreKey {
    buf: [u8; MAX_KEY_LEN],
    len: u8,
}

impl StoreKey {
    /// The key under which the record with `id` is stored.
    pub fn record(id: u32) -> Self {
        // Fits by the const assertion above: "rec_" + at most 10 digits.
        let text = format!("{RECORD_PREFIX}{id}");
        let mut buf = [0u8; MAX_KEY_LEN];
        buf[..text.len()].copy_from_slice(text.as_bytes());
        Self {
            buf,
            len: text.len() as u8,
        }
    }

    /// The metadata key for `namespace`, or `None` if the namespace is too
    /// long for the key to fit the store limit.
    pub fn meta(namespace: &str) -> Option<Self> {
        if namespace.len() > MAX_NAMESPACE_LEN {
            return None;
        }
        Self::from_ascii(&format!("{META_PREFIX}{namespace}"))
    }

    fn from_ascii(text: &str) -> Option<Self> {
        if text.is_empty() || text.len() > MAX_KEY_LEN || !text.is_ascii() {
            return None;
        }
        let mut buf = [0u8; MAX_KEY_LEN];
        buf[..text.len()].copy_from_slice(text.as_bytes());
        Some(Self {
            buf,
            len: text.len() as u8,
        })
    }

    /// Key text, as passed to the blob store.
    pub fn as_str(&self) -> &str {
        // Constructors only admit ASCII, so this cannot fail.
        std::str::from_utf8(&self.buf[..self.len as usize]).unwrap_or_default()
    }

    /// Fixed-width wire form: key bytes followed by zero padding.
    pub(crate) fn encode_field(key: Option<&StoreKey>) -> [u8; MAX_KEY_LEN] {
        match key {
            Some(k) => k.buf,
            None => [0u8; MAX_KEY_LEN],
        }
    }

    /// Parse a fixed-width wire field. All-zero means no key.
    ///
    /// Returns `Err` with a reason when the field holds bytes that no
    /// constructor could have produced.
    pub(crate) fn decode_field(field: &[u8; MAX_KEY_LEN]) -> Result<Option<StoreKey>, String> {
        let len = field.iter().position(|&b| b == 0).unwrap_or(MAX_KEY_LEN);
        if len == 0 {
            // Padding after the terminator must also be zero.
            if field.iter().any(|&b| b != 0) {
                return Err("garbage after empty key field".to_string());
            }
            return Ok(None);
        }
        if field[len..].iter().any(|&b| b != 0) {
            return Err("garbage after key terminator".to_string());
        }
        let text = std::str::from_utf8(&field[..len])
            .map_err(|_| "key field is not ASCII".to_string())?;
        StoreKey::from_ascii(text)
            .map(Some)
            .ok_or_else(|| format!("invalid key field {text:?}"))
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreKey({:?})", self.as_str())
    }
}
