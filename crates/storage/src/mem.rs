//! In-memory keyed store with per-transaction write buffers
//!
//! # Design
//!
//! - One committed table (`FxHashMap<KeyId, V>`) visible to everyone
//! - One write buffer per registered transaction
//! - `read` sees the transaction's own buffered writes first
//! - `commit` applies the buffer to the committed table and clears it;
//!   `rollback` discards it
//!
//! Both `commit` and `rollback` leave the transaction registered. The
//! timestamp strategies commit incrementally after almost every write, so
//! tearing the id down here would invalidate a live transaction mid-flight.
//! `InvalidTransactionId` therefore means "never registered".

use lockstep_core::{Error, KeyId, Result, Storage, TxnId};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

struct Inner<V> {
    committed: FxHashMap<KeyId, V>,
    pending: FxHashMap<TxnId, FxHashMap<KeyId, V>>,
}

/// In-memory storage collaborator.
///
/// # Example
///
/// ```
/// use lockstep_core::{KeyId, Storage, TxnId};
/// use lockstep_storage::MemStore;
///
/// let store = MemStore::new();
/// let txn = TxnId::new(1);
/// store.register(txn).unwrap();
/// store.write(txn, KeyId::new(10), "v1").unwrap();
/// store.commit(txn).unwrap();
/// assert_eq!(store.committed(KeyId::new(10)), Some("v1"));
/// ```
pub struct MemStore<V> {
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> MemStore<V> {
    /// Create an empty store.
    pub fn new() -> Self {
        MemStore {
            inner: Mutex::new(Inner {
                committed: FxHashMap::default(),
                pending: FxHashMap::default(),
            }),
        }
    }

    /// Committed value of a key, ignoring every uncommitted buffer.
    ///
    /// Test hook: lets callers assert what the store would survive with.
    pub fn committed(&self, key: KeyId) -> Option<V> {
        self.inner.lock().committed.get(&key).cloned()
    }

    /// Whether the transaction has been registered.
    pub fn is_registered(&self, txn: TxnId) -> bool {
        self.inner.lock().pending.contains_key(&txn)
    }

    /// Number of keys in the committed table.
    pub fn len(&self) -> usize {
        self.inner.lock().committed.len()
    }

    /// Check if the committed table is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().committed.is_empty()
    }
}

impl<V: Clone> Default for MemStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> Storage for MemStore<V> {
    type Value = V;

    fn register(&self, txn: TxnId) -> Result<()> {
        self.inner.lock().pending.entry(txn).or_default();
        Ok(())
    }

    fn read(&self, txn: TxnId, key: KeyId) -> Result<Option<V>> {
        let inner = self.inner.lock();
        let buffer = inner
            .pending
            .get(&txn)
            .ok_or(Error::InvalidTransactionId(txn))?;
        match buffer.get(&key) {
            Some(value) => Ok(Some(value.clone())),
            None => Ok(inner.committed.get(&key).cloned()),
        }
    }

    fn write(&self, txn: TxnId, key: KeyId, value: V) -> Result<()> {
        let mut inner = self.inner.lock();
        let buffer = inner
            .pending
            .get_mut(&txn)
            .ok_or(Error::InvalidTransactionId(txn))?;
        buffer.insert(key, value);
        Ok(())
    }

    fn commit(&self, txn: TxnId) -> Result<()> {
        let mut inner = self.inner.lock();
        let buffer = inner
            .pending
            .get_mut(&txn)
            .ok_or(Error::InvalidTransactionId(txn))?;
        let writes = std::mem::take(buffer);
        trace!(txn = %txn, writes = writes.len(), "applying commit");
        for (key, value) in writes {
            inner.committed.insert(key, value);
        }
        Ok(())
    }

    fn rollback(&self, txn: TxnId) -> Result<()> {
        let mut inner = self.inner.lock();
        let buffer = inner
            .pending
            .get_mut(&txn)
            .ok_or(Error::InvalidTransactionId(txn))?;
        let discarded = std::mem::take(buffer);
        trace!(txn = %txn, discarded = discarded.len(), "rolling back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_txn_is_rejected_everywhere() {
        let store: MemStore<i64> = MemStore::new();
        let ghost = TxnId::new(99);
        let key = KeyId::new(1);
        assert_eq!(
            store.read(ghost, key),
            Err(Error::InvalidTransactionId(ghost))
        );
        assert_eq!(
            store.write(ghost, key, 1),
            Err(Error::InvalidTransactionId(ghost))
        );
        assert_eq!(store.commit(ghost), Err(Error::InvalidTransactionId(ghost)));
        assert_eq!(
            store.rollback(ghost),
            Err(Error::InvalidTransactionId(ghost))
        );
    }

    #[test]
    fn writes_are_invisible_until_commit() {
        let store = MemStore::new();
        let (t1, t2) = (TxnId::new(1), TxnId::new(2));
        let key = KeyId::new(10);
        store.register(t1).unwrap();
        store.register(t2).unwrap();

        store.write(t1, key, "draft").unwrap();
        // t1 sees its own buffer, t2 sees nothing
        assert_eq!(store.read(t1, key).unwrap(), Some("draft"));
        assert_eq!(store.read(t2, key).unwrap(), None);
        assert_eq!(store.committed(key), None);
        // a buffered write does not count as a committed key
        assert!(store.is_empty());

        store.commit(t1).unwrap();
        assert_eq!(store.read(t2, key).unwrap(), Some("draft"));
        assert_eq!(store.committed(key), Some("draft"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn rollback_discards_the_buffer() {
        let store = MemStore::new();
        let txn = TxnId::new(1);
        let key = KeyId::new(10);
        store.register(txn).unwrap();
        store.write(txn, key, 5).unwrap();
        store.rollback(txn).unwrap();
        assert_eq!(store.read(txn, key).unwrap(), None);
        assert_eq!(store.committed(key), None);
        // still registered: the id stays valid after rollback
        assert!(store.is_registered(txn));
    }

    #[test]
    fn commit_clears_the_buffer_but_keeps_the_txn() {
        let store = MemStore::new();
        let txn = TxnId::new(1);
        store.register(txn).unwrap();
        store.write(txn, KeyId::new(1), 1).unwrap();
        store.commit(txn).unwrap();
        // incremental use: the same txn keeps writing after a commit
        store.write(txn, KeyId::new(2), 2).unwrap();
        store.commit(txn).unwrap();
        assert_eq!(store.committed(KeyId::new(1)), Some(1));
        assert_eq!(store.committed(KeyId::new(2)), Some(2));
    }
}
