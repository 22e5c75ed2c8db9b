//! Record store subsystem
//!
//! An insertion-ordered, versioned record collection synthesized on top of a
//! flat [`crate::blobstore::BlobStore`]. Records form a doubly linked list
//! threaded through key fields inside the blobs themselves; one metadata blob
//! per table roots the chain and carries the live count.
//!
//! # Invariants maintained
//!
//! - The `next`/`prev` links across a table's records form exactly one
//!   doubly linked, acyclic chain of length `count`, rooted at the metadata
//!   head key.
//! - At most one record has no `prev` (the head) and at most one has no
//!   `next` (the tail); both are absent together iff the table is empty.
//! - A record's key is a pure, collision-free function of its id, within the
//!   store's key-length limit.
//! - A record's stored version may lag the table's configured version until
//!   the record is next rewritten or a bulk upgrade runs (lazy migration).
//!
//! The weak multi-blob durability guarantee is documented on
//! [`Table`](handle::Table).

mod errors;
mod handle;
mod key;
mod meta;
mod migrate;
mod record;

pub use errors::{MigrationError, TableError, TableResult};
pub use handle::{Records, Table, TableConfig, DEFAULT_LOCK_TIMEOUT};
pub use key::{StoreKey, MAX_NAMESPACE_LEN};
pub use migrate::Migrator;
pub use record::MAX_PAYLOAD_SIZE;
