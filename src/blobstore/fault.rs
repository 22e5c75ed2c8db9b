//! Write-failure injection for durability testing
//!
//! [`FaultStore`] wraps any [`BlobStore`] and fails the Nth mutating call
//! (`set`/`erase`) with [`BlobError::Backend`]. The table layer's multi-blob
//! mutations are not atomic; this wrapper is how the tests pin down exactly
//! what a mid-sequence failure leaves behind.

use parking_lot::Mutex;

use super::{BlobError, BlobResult, BlobStore};

#[derive(Default)]
struct FaultState {
    /// Mutating calls remaining before the next one fails. `None` = armed off.
    fail_after: Option<u32>,
    recovers: u64,
}

/// A [`BlobStore`] wrapper that injects a failure into the Nth mutating call.
pub struct FaultStore<S> {
    inner: S,
    state: Mutex<FaultState>,
}

impl<S: BlobStore> FaultStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            state: Mutex::new(FaultState::default()),
        }
    }

    /// Arm the store to fail the `n`th mutating call from now (1-based).
    pub fn fail_after(&self, n: u32) {
        assert!(n > 0, "fail_after is 1-based");
        self.state.lock().fail_after = Some(n - 1);
    }

    /// Disarm any pending injected failure.
    pub fn clear(&self) {
        self.state.lock().fail_after = None;
    }

    /// Number of `recover` calls observed.
    pub fn recover_count(&self) -> u64 {
        self.state.lock().recovers
    }

    /// Access the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn tick(&self) -> BlobResult<()> {
        let mut state = self.state.lock();
        match state.fail_after {
            Some(0) => {
                state.fail_after = None;
                Err(BlobError::Backend("injected write failure".to_string()))
            }
            Some(n) => {
                state.fail_after = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<S: BlobStore> BlobStore for FaultStore<S> {
    fn get(&self, key: &str) -> BlobResult<Vec<u8>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> BlobResult<()> {
        self.tick()?;
        self.inner.set(key, value)
    }

    fn erase(&self, key: &str) -> BlobResult<()> {
        self.tick()?;
        self.inner.erase(key)
    }

    fn erase_all(&self) -> BlobResult<()> {
        self.tick()?;
        self.inner.erase_all()
    }

    fn commit(&self) -> BlobResult<()> {
        self.inner.commit()
    }

    fn recover(&self) -> BlobResult<()> {
        self.state.lock().recovers += 1;
        self.inner.recover()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blobstore::MemoryBlobStore;

    #[test]
    fn test_fails_exactly_the_armed_call() {
        let store = FaultStore::new(MemoryBlobStore::new());
        store.fail_after(2);
        store.set("a", b"1").unwrap();
        assert!(matches!(store.set("b", b"2"), Err(BlobError::Backend(_))));
        // Disarmed after firing once.
        store.set("b", b"2").unwrap();
    }

    #[test]
    fn test_reads_never_injected() {
        let store = FaultStore::new(MemoryBlobStore::new());
        store.set("a", b"1").unwrap();
        store.fail_after(1);
        assert_eq!(store.get("a").unwrap(), b"1");
    }

    #[test]
    fn test_recover_counted() {
        let store = FaultStore::new(MemoryBlobStore::new());
        store.recover().unwrap();
        assert_eq!(store.recover_count(), 1);
    }
}
