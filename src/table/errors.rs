//! Record store error types

use thiserror::Error;

use crate::blobstore::BlobError;

/// Result type for record store operations
pub type TableResult<T> = Result<T, TableError>;

/// Errors surfaced by record store operations
#[derive(Debug, Error)]
pub enum TableError {
    // Lookup errors
    #[error("record not found")]
    NotFound,

    #[error("record {0} already exists")]
    AlreadyExists(u32),

    // Versioning errors
    #[error("version mismatch: stored {stored}, table expects {expected}, no migrator configured")]
    VersionMismatch { stored: u8, expected: u8 },

    #[error(transparent)]
    Migration(#[from] MigrationError),

    // Validation errors (checked before any store I/O)
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("payload is {got} bytes, table stores fixed {expected}-byte payloads")]
    PayloadSizeMismatch { expected: u16, got: usize },

    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("table version must be non-zero")]
    InvalidVersionZero,

    // Integrity errors
    #[error("corrupt record at {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    // Concurrency errors
    #[error("timed out waiting for the table lock")]
    LockTimeout,

    // Store errors
    #[error("store failure: {0}")]
    Store(#[from] BlobError),
}

/// Error returned by a [`crate::table::Migrator`] when it cannot convert an
/// old-version payload.
#[derive(Debug, Error)]
#[error("migration from version {from_version} failed: {reason}")]
pub struct MigrationError {
    pub from_version: u8,
    pub reason: String,
}

impl MigrationError {
    pub fn new(from_version: u8, reason: impl Into<String>) -> Self {
        Self {
            from_version,
            reason: reason.into(),
        }
    }
}
