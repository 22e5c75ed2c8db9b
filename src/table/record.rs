//! Record codec
//!
//! One record is one blob:
//!
//! ```text
//! +------------------+
//! | id               | (u32 LE)
//! +------------------+
//! | version          | (u8, schema tag)
//! +------------------+
//! | payload size     | (u16 LE)
//! +------------------+
//! | next key         | ([u8; 15], zero-padded; all-zero = none)
//! +------------------+
//! | prev key         | ([u8; 15], zero-padded; all-zero = none)
//! +------------------+
//! | payload          | (fixed length per table)
//! +------------------+
//! | checksum         | (u32 LE, CRC32 of all preceding bytes)
//! +------------------+
//! ```
//!
//! The payload length is fixed at table-open time; encoding rejects a payload
//! of any other length. Decoding rejects blobs shorter than the header or
//! whose checksum does not match, both as [`TableError::CorruptRecord`].

use crate::blobstore::MAX_KEY_LEN;

use super::errors::{TableError, TableResult};
use super::key::StoreKey;

/// Fixed header length: id + version + size + next + prev.
pub(crate) const HEADER_LEN: usize = 4 + 1 + 2 + MAX_KEY_LEN + MAX_KEY_LEN;

/// CRC32 trailer length.
const CRC_LEN: usize = 4;

/// Largest payload a table may be configured to store, in bytes.
pub const MAX_PAYLOAD_SIZE: usize = 512;

/// A decoded record: chain header plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Record {
    pub id: u32,
    pub version: u8,
    pub size: u16,
    pub next: Option<StoreKey>,
    pub prev: Option<StoreKey>,
    pub payload: Vec<u8>,
}

impl Record {
    /// Serialize to the blob form, enforcing the fixed payload length.
    pub fn encode(&self) -> TableResult<Vec<u8>> {
        if self.payload.len() != self.size as usize {
            return Err(TableError::PayloadSizeMismatch {
                expected: self.size,
                got: self.payload.len(),
            });
        }

        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len() + CRC_LEN);
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.push(self.version);
        buf.extend_from_slice(&self.size.to_le_bytes());
        buf.extend_from_slice(&StoreKey::encode_field(self.next.as_ref()));
        buf.extend_from_slice(&StoreKey::encode_field(self.prev.as_ref()));
        buf.extend_from_slice(&self.payload);

        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    /// Deserialize a blob read back under `key`, verifying the checksum.
    pub fn decode(key: &StoreKey, blob: &[u8]) -> TableResult<Self> {
        let corrupt = |reason: String| TableError::CorruptRecord {
            key: key.to_string(),
            reason,
        };

        if blob.len() < HEADER_LEN + CRC_LEN {
            return Err(corrupt(format!(
                "blob is {} bytes, header alone needs {}",
                blob.len(),
                HEADER_LEN + CRC_LEN
            )));
        }

        let crc_offset = blob.len() - CRC_LEN;
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

        let id = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]);
        let version = blob[4];
        let size = u16::from_le_bytes([blob[5], blob[6]]);

        let mut next_field = [0u8; MAX_KEY_LEN];
        next_field.copy_from_slice(&blob[7..7 + MAX_KEY_LEN]);
        let mut prev_field = [0u8; MAX_KEY_LEN];
        prev_field.copy_from_slice(&blob[7 + MAX_KEY_LEN..HEADER_LEN]);

        let next = StoreKey::decode_field(&next_field).map_err(&corrupt)?;
        let prev = StoreKey::decode_field(&prev_field).map_err(&corrupt)?;

        let payload = blob[HEADER_LEN..crc_offset].to_vec();
        if payload.len() != size as usize {
            return Err(corrupt(format!(
                "header claims a {size}-byte payload, blob carries {}",
                payload.len()
            )));
        }

        Ok(Self {
            id,
            version,
            size,
            next,
            prev,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record {
            id: 7,
            version: 1,
            size: 4,
            next: Some(StoreKey::record(5)),
            prev: None,
            payload: b"abcd".to_vec(),
        }
    }

    #[test]
    fn test_roundtrip() {
        let record = sample();
        let blob = record.encode().unwrap();
        let decoded = Record::decode(&StoreKey::record(7), &blob).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_roundtrip_with_both_links_empty() {
        let record = Record {
            next: None,
            prev: None,
            ..sample()
        };
        let blob = record.encode().unwrap();
        let decoded = Record::decode(&StoreKey::record(7), &blob).unwrap();
        assert_eq!(decoded.next, None);
        assert_eq!(decoded.prev, None);
    }

    #[test]
    fn test_encode_rejects_wrong_payload_length() {
        let record = Record {
            payload: b"abc".to_vec(),
            ..sample()
        };
        assert!(matches!(
            record.encode(),
            Err(TableError::PayloadSizeMismatch {
                expected: 4,
                got: 3
            })
        ));
    }

    #[test]
    fn test_decode_rejects_short_blob() {
        let err = Record::decode(&StoreKey::record(7), &[0u8; 10]).unwrap_err();
        assert!(matches!(err, TableError::CorruptRecord { .. }));
    }

    #[test]
    fn test_decode_detects_bit_flip() {
        let mut blob = sample().encode().unwrap();
        let mid = blob.len() / 2;
        blob[mid] ^= 0xFF;
        let err = Record::decode(&StoreKey::record(7), &blob).unwrap_err();
        match err {
            TableError::CorruptRecord { reason, .. } => {
                assert!(reason.contains("checksum mismatch"), "{reason}")
            }
            other => panic!("expected CorruptRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        let mut blob = sample().encode().unwrap();
        // Drop one payload byte and re-seal the checksum so only the length
        // check can catch it.
        blob.truncate(blob.len() - CRC_LEN);
        blob.remove(HEADER_LEN);
        let crc = crc32fast::hash(&blob);
        blob.extend_from_slice(&crc.to_le_bytes());

        let err = Record::decode(&StoreKey::record(7), &blob).unwrap_err();
        match err {
            TableError::CorruptRecord { reason, .. } => {
                assert!(reason.contains("payload"), "{reason}")
            }
            other => panic!("expected CorruptRecord, got {other:?}"),
        }
    }
}
