//! Schema migration strategy
//!
//! A table's payload layout may evolve; stored records keep the version tag
//! they were written with. A [`Migrator`] converts an old-version payload to
//! the table's current layout. It runs in two places with different
//! persistence side effects:
//!
//! - **read-through** (`get`/`get_next`): the migrated payload is returned to
//!   the caller, the stored blob is left untouched
//! - **bulk sweep** (`upgrade`): every stale record is migrated and rewritten
//!   in place
//!
//! Without a migrator, touching a stale record fails with
//! [`super::TableError::VersionMismatch`].

use super::errors::MigrationError;

/// Converts an old-version payload to the table's current layout.
///
/// The returned payload must be exactly the table's configured payload size;
/// the table layer rejects anything else before persisting it.
pub trait Migrator: Send + Sync {
    fn migrate(&self, old_version: u8, payload: &[u8]) -> Result<Vec<u8>, MigrationError>;
}

impl<F> Migrator for F
where
    F: Fn(u8, &[u8]) -> Result<Vec<u8>, MigrationError> + Send + Sync,
{
    fn migrate(&self, old_version: u8, payload: &[u8]) -> Result<Vec<u8>, MigrationError> {
        self(old_version, payload)
    }
}
