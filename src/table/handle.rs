//! Table handle: the record store's public surface
//!
//! A [`Table`] bundles one blob-store namespace with the table's fixed
//! payload size, schema version, optional migrator, and its write lock.
//! Multiple tables on distinct namespaces are fully independent.
//!
//! # Concurrency
//!
//! Mutating operations (`insert`, `delete`, `update`, `drop_table`,
//! `upgrade`) hold the table's mutex for their full duration, acquired with a
//! bounded timeout ([`TableError::LockTimeout`] on expiry, table state
//! untouched). Reads (`get`, `get_next`, `get_count`) take no lock: a read
//! racing a writer can observe a transiently inconsistent metadata/record
//! pair. That is the status quo of the system this store was built for and is
//! accepted, not corrected silently.
//!
//! # Durability
//!
//! Insert and delete touch up to three blobs (target, one or two neighbors,
//! metadata) and the store offers no cross-blob atomicity. The metadata blob
//! is always written last, so a failure before that point leaves the previous
//! metadata intact; the worst outcome is an orphaned or half-linked record
//! blob. On a mid-sequence failure the table calls the store's best-effort
//! [`BlobStore::recover`] - which reopens the handle and undoes nothing - and
//! surfaces the original error. Retry and repair policy belong to the caller.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::blobstore::{BlobError, BlobStore};

use super::errors::{MigrationError, TableError, TableResult};
use super::key::{StoreKey, MAX_NAMESPACE_LEN};
use super::meta::TableMeta;
use super::migrate::Migrator;
use super::record::{Record, MAX_PAYLOAD_SIZE};

/// Default bound on waiting for the table lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-table configuration, fixed at open time.
#[derive(Clone)]
pub struct TableConfig {
    /// Blob-store namespace the table lives in.
    pub namespace: String,
    /// Fixed payload length for every record in the table.
    pub payload_size: u16,
    /// Current schema version; stored records may lag behind it.
    pub version: u8,
    /// Converts stale payloads to the current version. Without one, touching
    /// a stale record fails with [`TableError::VersionMismatch`].
    pub migrator: Option<Arc<dyn Migrator>>,
    /// Bound on waiting for the table's write lock.
    pub lock_timeout: Duration,
}

impl std::fmt::Debug for TableConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableConfig")
            .field("namespace", &self.namespace)
            .field("payload_size", &self.payload_size)
            .field("version", &self.version)
            .field("migrator", &self.migrator.as_ref().map(|_| "dyn Migrator"))
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}

impl TableConfig {
    pub fn new(namespace: impl Into<String>, payload_size: u16, version: u8) -> Self {
        Self {
            namespace: namespace.into(),
            payload_size,
            version,
            migrator: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_migrator(mut self, migrator: Arc<dyn Migrator>) -> Self {
        self.migrator = Some(migrator);
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

/// One independent record collection over a blob-store namespace.
#[derive(Debug)]
pub struct Table<S: BlobStore> {
    store: S,
    config: TableConfig,
    meta_key: StoreKey,
    guard: Mutex<()>,
}

impl<S: BlobStore> Table<S> {
    /// Open a table over `store`, validating the configuration.
    ///
    /// Validation happens before any store I/O: the namespace must be
    /// non-empty, at most [`MAX_NAMESPACE_LEN`] bytes of `[a-z0-9_]`, the
    /// payload size bounded by [`MAX_PAYLOAD_SIZE`], and the version
    /// non-zero (zero is the wire encoding of "no key", so it can never be a
    /// valid schema tag).
    pub fn open(store: S, config: TableConfig) -> TableResult<Self> {
        if config.namespace.is_empty() {
            return Err(TableError::InvalidNamespace("empty".to_string()));
        }
        if !config
            .namespace
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        {
            return Err(TableError::InvalidNamespace(format!(
                "{:?} contains characters outside [a-z0-9_]",
                config.namespace
            )));
        }
        if config.version == 0 {
            return Err(TableError::InvalidVersionZero);
        }
        if config.payload_size as usize > MAX_PAYLOAD_SIZE {
            return Err(TableError::PayloadTooLarge {
                size: config.payload_size as usize,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let meta_key = StoreKey::meta(&config.namespace).ok_or_else(|| {
            TableError::InvalidNamespace(format!(
                "{:?} exceeds {MAX_NAMESPACE_LEN} bytes",
                config.namespace
            ))
        })?;

        Ok(Self {
            store,
            config,
            meta_key,
            guard: Mutex::new(()),
        })
    }

    /// The table's configuration.
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// The underlying blob store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the handle, returning the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }

    // -------------------------------------------------------------------------
    // Mutating operations (guarded)
    // -------------------------------------------------------------------------

    /// Insert a new record; it becomes the head of the table.
    ///
    /// Iteration order is LIFO (reverse chronological) by design. Fails with
    /// [`TableError::AlreadyExists`] if `id` is already present.
    pub fn insert(&self, id: u32, payload: &[u8]) -> TableResult<()> {
        let _guard = self.lock()?;
        self.check_payload(payload)?;

        let key = StoreKey::record(id);
        match self.store.get(key.as_str()) {
            Ok(_) => return Err(TableError::AlreadyExists(id)),
            Err(BlobError::NotFound) => {}
            Err(e) => return Err(TableError::Store(e)),
        }

        let mut meta = TableMeta::load(&self.store, &self.meta_key)?;

        let record = Record {
            id,
            version: self.config.version,
            size: self.config.payload_size,
            next: meta.head,
            prev: None,
            payload: payload.to_vec(),
        };
        self.write_record(&key, &record)?;

        // Back-patch the previous head's prev link. From here on a failure
        // can leave the chain inconsistent; recover before surfacing.
        if let Some(head_key) = meta.head {
            let result = self.load_record(&head_key).and_then(|mut head| {
                head.prev = Some(key);
                self.write_record(&head_key, &head)
            });
            if let Err(e) = result {
                return Err(self.fail_with_recovery("insert", e));
            }
        }

        meta.head = Some(key);
        meta.count += 1;
        if let Err(e) = meta.save(&self.store, &self.meta_key) {
            return Err(self.fail_with_recovery("insert", e));
        }

        self.store.commit()?;
        debug!(namespace = %self.config.namespace, id, "inserted record");
        Ok(())
    }

    /// Delete a record, relinking its neighbors.
    ///
    /// Handles all four link shapes: middle (both neighbors), head-only,
    /// tail-only, and singleton (deleting the sole record empties the table).
    pub fn delete(&self, id: u32) -> TableResult<()> {
        let _guard = self.lock()?;

        let key = StoreKey::record(id);
        let mut meta = TableMeta::load(&self.store, &self.meta_key)?;
        let record = self.load_record(&key)?;

        if let Some(prev_key) = record.prev {
            let result = self.load_record(&prev_key).and_then(|mut prev| {
                prev.next = record.next;
                self.write_record(&prev_key, &prev)
            });
            if let Err(e) = result {
                return Err(self.fail_with_recovery("delete", e));
            }
        } else if meta.head == Some(key) {
            // Target was the head; traversal now starts at its successor.
            meta.head = record.next;
        }

        if let Some(next_key) = record.next {
            let result = self.load_record(&next_key).and_then(|mut next| {
                next.prev = record.prev;
                self.write_record(&next_key, &next)
            });
            if let Err(e) = result {
                return Err(self.fail_with_recovery("delete", e));
            }
        }

        if let Err(e) = self.store.erase(key.as_str()) {
            return Err(self.fail_with_recovery("delete", TableError::Store(e)));
        }

        meta.count = meta.count.saturating_sub(1);
        if let Err(e) = meta.save(&self.store, &self.meta_key) {
            return Err(self.fail_with_recovery("delete", e));
        }

        self.store.commit()?;
        debug!(namespace = %self.config.namespace, id, "deleted record");
        Ok(())
    }

    /// Rewrite a record's payload in place, stamping the current version.
    ///
    /// Links and chain position are untouched. This (together with
    /// [`Table::upgrade`]) is the path by which a lazily-migrated record
    /// becomes current on storage.
    pub fn update(&self, id: u32, payload: &[u8]) -> TableResult<()> {
        let _guard = self.lock()?;
        self.check_payload(payload)?;

        let key = StoreKey::record(id);
        let mut record = self.load_record(&key)?;
        record.payload = payload.to_vec();
        record.version = self.config.version;
        record.size = self.config.payload_size;
        self.write_record(&key, &record)?;

        self.store.commit()?;
        debug!(namespace = %self.config.namespace, id, "updated record");
        Ok(())
    }

    /// Erase every record in the table and reset the count to zero.
    pub fn drop_table(&self) -> TableResult<()> {
        let _guard = self.lock()?;
        // The metadata blob lives in the same namespace, so this clears it
        // too; the next load sees the zero default.
        self.store.erase_all()?;
        self.store.commit()?;
        debug!(namespace = %self.config.namespace, "dropped table");
        Ok(())
    }

    /// Eagerly migrate every stale record in the table, in place.
    ///
    /// Traverses from the head; each record whose version lags the table's
    /// is run through the migrator and rewritten. The first failure aborts
    /// the sweep and surfaces - records already rewritten stay rewritten
    /// (the sweep is not transactional; see the module docs).
    pub fn upgrade(&self) -> TableResult<()> {
        let _guard = self.lock()?;

        let meta = TableMeta::load(&self.store, &self.meta_key)?;
        let mut cursor = meta.head;
        let mut visited: u32 = 0;
        let mut migrated: u32 = 0;

        while let Some(key) = cursor {
            if visited >= meta.count {
                // A well-formed chain has exactly `count` records; anything
                // longer is a cycle or a count that lost track.
                return Err(TableError::CorruptRecord {
                    key: key.to_string(),
                    reason: format!("chain exceeds recorded count {}", meta.count),
                });
            }

            let mut record = self.load_record(&key)?;
            cursor = record.next;
            visited += 1;

            if record.version != self.config.version {
                record.payload = self.migrate_payload(record.version, &record.payload)?;
                record.version = self.config.version;
                record.size = self.config.payload_size;
                if let Err(e) = self.write_record(&key, &record) {
                    return Err(self.fail_with_recovery("upgrade", e));
                }
                migrated += 1;
            }
        }

        self.store.commit()?;
        debug!(
            namespace = %self.config.namespace,
            visited, migrated, "upgrade sweep finished"
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Read operations (unguarded)
    // -------------------------------------------------------------------------

    /// Read a record's payload. Stale-version records go through the
    /// migrator (read-through only: the stored blob is not rewritten).
    pub fn get(&self, id: u32) -> TableResult<Vec<u8>> {
        let record = self.load_record(&StoreKey::record(id))?;
        self.resolve_payload(record)
    }

    /// Step the forward traversal: `id == 0` returns the head record,
    /// otherwise the successor of `id`. [`TableError::NotFound`] signals the
    /// end of the list (or an unknown `id`).
    pub fn get_next(&self, id: u32) -> TableResult<(u32, Vec<u8>)> {
        let target = if id == 0 {
            let meta = TableMeta::load(&self.store, &self.meta_key)?;
            meta.head.ok_or(TableError::NotFound)?
        } else {
            let record = self.load_record(&StoreKey::record(id))?;
            record.next.ok_or(TableError::NotFound)?
        };

        let record = self.load_record(&target)?;
        let record_id = record.id;
        Ok((record_id, self.resolve_payload(record)?))
    }

    /// Number of live records, from the metadata blob.
    pub fn get_count(&self) -> TableResult<u32> {
        Ok(TableMeta::load(&self.store, &self.meta_key)?.count)
    }

    /// Iterate the table head-to-tail (most recent first).
    ///
    /// Thin sugar over [`Table::get_next`]; each step is a fresh store read,
    /// so a concurrent writer can be observed mid-mutation, exactly as with
    /// manual traversal.
    pub fn iter(&self) -> Records<'_, S> {
        Records {
            table: self,
            cursor: 0,
            done: false,
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn lock(&self) -> TableResult<MutexGuard<'_, ()>> {
        self.guard
            .try_lock_for(self.config.lock_timeout)
            .ok_or(TableError::LockTimeout)
    }

    fn check_payload(&self, payload: &[u8]) -> TableResult<()> {
        if payload.len() != self.config.payload_size as usize {
            return Err(TableError::PayloadSizeMismatch {
                expected: self.config.payload_size,
                got: payload.len(),
            });
        }
        Ok(())
    }

    fn load_record(&self, key: &StoreKey) -> TableResult<Record> {
        let blob = match self.store.get(key.as_str()) {
            Ok(blob) => blob,
            Err(BlobError::NotFound) => return Err(TableError::NotFound),
            Err(e) => return Err(TableError::Store(e)),
        };
        Record::decode(key, &blob)
    }

    fn write_record(&self, key: &StoreKey, record: &Record) -> TableResult<()> {
        self.store.set(key.as_str(), &record.encode()?)?;
        Ok(())
    }

    /// Run the migrator, enforcing the fixed payload length on its output.
    fn migrate_payload(&self, stored_version: u8, payload: &[u8]) -> TableResult<Vec<u8>> {
        let migrator = self
            .config
            .migrator
            .as_deref()
            .ok_or(TableError::VersionMismatch {
                stored: stored_version,
                expected: self.config.version,
            })?;
        let migrated = migrator.migrate(stored_version, payload)?;
        if migrated.len() != self.config.payload_size as usize {
            return Err(TableError::Migration(MigrationError::new(
                stored_version,
                format!(
                    "migrator produced {} bytes, table stores {}",
                    migrated.len(),
                    self.config.payload_size
                ),
            )));
        }
        Ok(migrated)
    }

    fn resolve_payload(&self, record: Record) -> TableResult<Vec<u8>> {
        if record.version == self.config.version {
            return Ok(record.payload);
        }
        self.migrate_payload(record.version, &record.payload)
    }

    /// Mid-sequence failure: ask the store to recover its handle
    /// (best-effort, undoes nothing) and surface the original error.
    fn fail_with_recovery(&self, op: &str, err: TableError) -> TableError {
        warn!(
            namespace = %self.config.namespace,
            op,
            error = %err,
            "store failed mid-sequence; chain may be inconsistent"
        );
        if let Err(recover_err) = self.store.recover() {
            warn!(
                namespace = %self.config.namespace,
                error = %recover_err,
                "store recovery failed"
            );
        }
        err
    }
}

/// Forward iterator over a table, yielding `(id, payload)` head-to-tail.
///
/// Store errors end the iteration after being yielded once.
pub struct Records<'a, S: BlobStore> {
    table: &'a Table<S>,
    cursor: u32,
    done: bool,
}

impl<S: BlobStore> Iterator for Records<'_, S> {
    type Item = TableResult<(u32, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.table.get_next(self.cursor) {
            Ok((id, payload)) => {
                self.cursor = id;
                Some(Ok((id, payload)))
            }
            Err(TableError::NotFound) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blobstore::MemoryBlobStore;

    fn open_table(payload_size: u16) -> Table<MemoryBlobStore> {
        Table::open(
            MemoryBlobStore::new(),
            TableConfig::new("fp", payload_size, 1),
        )
        .unwrap()
    }

    #[test]
    fn test_open_rejects_long_namespace() {
        let err = Table::open(
            MemoryBlobStore::new(),
            TableConfig::new("fingerprint", 4, 1),
        )
        .unwrap_err();
        assert!(matches!(err, TableError::InvalidNamespace(_)));
    }

    #[test]
    fn test_open_rejects_bad_namespace_characters() {
        let err = Table::open(MemoryBlobStore::new(), TableConfig::new("../fp", 4, 1)).unwrap_err();
        assert!(matches!(err, TableError::InvalidNamespace(_)));
    }

    #[test]
    fn test_open_rejects_version_zero() {
        let err = Table::open(MemoryBlobStore::new(), TableConfig::new("fp", 4, 0)).unwrap_err();
        assert!(matches!(err, TableError::InvalidVersionZero));
    }

    #[test]
    fn test_open_rejects_oversized_payload() {
        let err = Table::open(
            MemoryBlobStore::new(),
            TableConfig::new("fp", (MAX_PAYLOAD_SIZE + 1) as u16, 1),
        )
        .unwrap_err();
        assert!(matches!(err, TableError::PayloadTooLarge { .. }));
    }

    #[test]
    fn test_insert_validates_payload_before_io() {
        let table = open_table(4);
        let err = table.insert(1, b"toolong").unwrap_err();
        assert!(matches!(
            err,
            TableError::PayloadSizeMismatch {
                expected: 4,
                got: 7
            }
        ));
        // Nothing was written, not even metadata.
        assert_eq!(table.get_count().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let table = open_table(4);
        table.insert(1, b"aaaa").unwrap();
        assert!(matches!(
            table.insert(1, b"bbbb"),
            Err(TableError::AlreadyExists(1))
        ));
        assert_eq!(table.get_count().unwrap(), 1);
    }

    #[test]
    fn test_iter_yields_lifo() {
        let table = open_table(1);
        table.insert(1, b"a").unwrap();
        table.insert(2, b"b").unwrap();
        table.insert(3, b"c").unwrap();

        let ids: Vec<u32> = table.iter().map(|r| r.unwrap().0).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_lock_timeout_surfaces() {
        let table = Table::open(
            MemoryBlobStore::new(),
            TableConfig::new("fp", 1, 1).with_lock_timeout(Duration::from_millis(10)),
        )
        .unwrap();

        let _held = table.guard.lock();
        assert!(matches!(table.insert(1, b"a"), Err(TableError::LockTimeout)));
    }
}
