//! latchdb - a durable, ordered, versioned record store built on flat
//! key-value storage
//!
//! The underlying store offers only `get`/`set`/`erase` on opaque byte blobs
//! keyed by short strings: no ranges, no ordered scans, no multi-key
//! transactions. On top of that primitive, latchdb synthesizes an
//! insertion-ordered collection with O(1)-class insert-at-head, arbitrary
//! delete, forward traversal, a live count, and lazy schema migration of
//! stored payloads.
//!
//! # Architecture
//!
//! ```text
//! caller
//!   |
//!   v
//! Table handle ----- per-table mutex (bounded-timeout, writers only)
//!   |
//!   +-- metadata manager    one blob per table: count + head key
//!   +-- list engine         doubly-linked chain encoded in record blobs
//!   +-- versioning engine   read-through migration + bulk upgrade sweep
//!   +-- record codec        header + fixed payload + CRC32 trailer
//!   |
//!   v
//! BlobStore               flat namespace-scoped key -> bytes store
//! ```
//!
//! Each record is one blob whose key is derived from its numeric id; the
//! records of a table form a doubly linked list threaded through `next`/`prev`
//! key fields inside the blobs, rooted at the metadata blob's head key. New
//! records always become the head, so traversal order is LIFO.
//!
//! Multi-blob mutations are **not atomic**: a store failure partway through an
//! insert or delete can leave the chain inconsistent. See [`table::Table`] for
//! the exact guarantee.

pub mod blobstore;
pub mod table;

pub use blobstore::{BlobError, BlobResult, BlobStore, FileBlobStore, MemoryBlobStore};
pub use table::{Migrator, Table, TableConfig, TableError, TableResult};

/// Current version of latchdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
