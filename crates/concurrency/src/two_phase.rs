//! Strict two-phase locking controller
//!
//! Per-key reader/writer locks, held from first touch until commit or
//! rollback. The growing phase runs until the commit point; every release
//! happens in one batch at transaction end, never interleaved with further
//! acquisitions. That batch release is what makes the discipline *strict*.
//!
//! # Blocking
//!
//! `read` and `write` block the calling thread, unbounded, until the
//! conflicting holder commits or rolls back. There is no deadlock
//! detection and no timeout: a cycle of mutual waits stalls the involved
//! callers. This is documented behavior, not a bug.
//!
//! # No upgrade path
//!
//! A transaction that reads a key and then writes it acquires two
//! independent lock holds. Since the shared hold is kept until commit, the
//! exclusive acquisition on the same key blocks against the transaction's
//! own read lock; callers that intend to write a key should write it
//! first or avoid the read.

use crate::controller::ConcurrencyController;
use dashmap::DashMap;
use lockstep_core::{KeyId, Result, Storage, TxnId};
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{Mutex, RawRwLock, RwLock};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, trace};

type SharedGuard = ArcRwLockReadGuard<RawRwLock, ()>;
type ExclusiveGuard = ArcRwLockWriteGuard<RawRwLock, ()>;

/// Locks held by one transaction, released as a batch at transaction end.
///
/// Shared guards are declared first so they drop before the exclusive
/// guards (struct fields drop in declaration order).
#[derive(Default)]
struct HoldSet {
    shared: SmallVec<[SharedGuard; 4]>,
    exclusive: SmallVec<[ExclusiveGuard; 4]>,
}

/// Strict two-phase locking controller.
///
/// # Example
///
/// ```
/// use lockstep_concurrency::{ConcurrencyController, StrictTwoPhase};
/// use lockstep_core::{KeyId, TxnId};
/// use lockstep_storage::MemStore;
///
/// let ctrl = StrictTwoPhase::new(MemStore::new());
/// let txn = TxnId::new(1);
/// ctrl.register(txn).unwrap();
/// ctrl.write(txn, KeyId::new(7), 42).unwrap();
/// ctrl.commit(txn).unwrap();
/// ```
pub struct StrictTwoPhase<S> {
    store: S,
    /// Per-key lock, created lazily on first reference. The DashMap entry
    /// API guarantees exactly-once creation under concurrent first touch.
    locks: DashMap<KeyId, Arc<RwLock<()>>>,
    /// Hold sets per transaction. Guards are stowed here after a
    /// successful acquire and dropped together at commit/rollback.
    holds: Mutex<FxHashMap<TxnId, HoldSet>>,
}

impl<S: Storage> StrictTwoPhase<S> {
    /// Construct a controller wrapping the given storage collaborator.
    pub fn new(store: S) -> Self {
        StrictTwoPhase {
            store,
            locks: DashMap::new(),
            holds: Mutex::new(FxHashMap::default()),
        }
    }

    /// Shared access to the wrapped store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of (shared, exclusive) holds the transaction currently has.
    pub fn held(&self, txn: TxnId) -> (usize, usize) {
        self.holds
            .lock()
            .get(&txn)
            .map(|h| (h.shared.len(), h.exclusive.len()))
            .unwrap_or((0, 0))
    }

    /// Fetch the key's lock, creating it on first reference.
    ///
    /// The clone matters: the DashMap shard lock is released before the
    /// caller blocks on the returned RwLock.
    fn lock_for(&self, key: KeyId) -> Arc<RwLock<()>> {
        self.locks.entry(key).or_default().clone()
    }

    /// Drop every lock the transaction holds, shared first, then
    /// exclusive. Called on every exit path from the transaction's
    /// lifetime, including storage-layer failure.
    fn release_all(&self, txn: TxnId) {
        if let Some(held) = self.holds.lock().remove(&txn) {
            debug!(
                txn = %txn,
                shared = held.shared.len(),
                exclusive = held.exclusive.len(),
                "releasing all locks"
            );
            drop(held);
        }
    }
}

impl<S: Storage> ConcurrencyController<S::Value> for StrictTwoPhase<S> {
    fn register(&self, txn: TxnId) -> Result<()> {
        self.store.register(txn)
    }

    fn read(&self, txn: TxnId, key: KeyId) -> Result<Option<S::Value>> {
        let lock = self.lock_for(key);
        trace!(txn = %txn, key = %key, "acquiring shared lock");
        // Recursive acquisition: a transaction re-reading a key it already
        // holds must not queue behind a waiting writer.
        let guard = lock.read_arc_recursive();
        match self.store.read(txn, key) {
            Ok(value) => {
                // Held until commit/rollback; never released after the
                // read returns.
                self.holds.lock().entry(txn).or_default().shared.push(guard);
                Ok(value)
            }
            // The storage never saw this transaction; there is no
            // transaction end coming, so the guard drops here.
            Err(e) => Err(e),
        }
    }

    fn write(&self, txn: TxnId, key: KeyId, value: S::Value) -> Result<()> {
        let lock = self.lock_for(key);
        trace!(txn = %txn, key = %key, "acquiring exclusive lock");
        let guard = lock.write_arc();
        match self.store.write(txn, key, value) {
            Ok(()) => {
                self.holds
                    .lock()
                    .entry(txn)
                    .or_default()
                    .exclusive
                    .push(guard);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn commit(&self, txn: TxnId) -> Result<()> {
        let result = self.store.commit(txn);
        // Lock release must not be skipped on a storage-layer failure.
        self.release_all(txn);
        result
    }

    fn rollback(&self, txn: TxnId) -> Result<()> {
        let result = self.store.rollback(txn);
        self.release_all(txn);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::Error;
    use lockstep_storage::MemStore;

    #[test]
    fn unknown_txn_leaves_no_lock_behind() {
        let ctrl = StrictTwoPhase::new(MemStore::<i64>::new());
        let ghost = TxnId::new(42);
        let key = KeyId::new(1);
        assert_eq!(
            ctrl.read(ghost, key),
            Err(Error::InvalidTransactionId(ghost))
        );
        assert_eq!(ctrl.held(ghost), (0, 0));

        // the failed read left the key unlocked
        let txn = TxnId::new(1);
        ctrl.register(txn).unwrap();
        ctrl.write(txn, key, 1).unwrap();
        ctrl.commit(txn).unwrap();
    }

    #[test]
    fn shared_locks_are_compatible() {
        let ctrl = StrictTwoPhase::new(MemStore::<i64>::new());
        let (t1, t2) = (TxnId::new(1), TxnId::new(2));
        let key = KeyId::new(7);
        ctrl.register(t1).unwrap();
        ctrl.register(t2).unwrap();

        // both readers proceed without either committing
        assert_eq!(ctrl.read(t1, key).unwrap(), None);
        assert_eq!(ctrl.read(t2, key).unwrap(), None);
        assert_eq!(ctrl.held(t1), (1, 0));
        assert_eq!(ctrl.held(t2), (1, 0));

        ctrl.commit(t1).unwrap();
        ctrl.commit(t2).unwrap();
    }

    #[test]
    fn locks_accumulate_until_commit() {
        let ctrl = StrictTwoPhase::new(MemStore::new());
        let txn = TxnId::new(1);
        ctrl.register(txn).unwrap();
        ctrl.read(txn, KeyId::new(1)).unwrap();
        ctrl.read(txn, KeyId::new(2)).unwrap();
        ctrl.write(txn, KeyId::new(3), 30).unwrap();
        assert_eq!(ctrl.held(txn), (2, 1));

        ctrl.commit(txn).unwrap();
        assert_eq!(ctrl.held(txn), (0, 0));
        assert_eq!(ctrl.store().committed(KeyId::new(3)), Some(30));
    }

    #[test]
    fn rereading_a_key_does_not_self_block() {
        let ctrl = StrictTwoPhase::new(MemStore::<i64>::new());
        let txn = TxnId::new(1);
        let key = KeyId::new(5);
        ctrl.register(txn).unwrap();
        ctrl.read(txn, key).unwrap();
        ctrl.read(txn, key).unwrap();
        assert_eq!(ctrl.held(txn), (2, 0));
        ctrl.rollback(txn).unwrap();
    }

    #[test]
    fn rollback_releases_locks_and_discards_writes() {
        let ctrl = StrictTwoPhase::new(MemStore::new());
        let txn = TxnId::new(1);
        let key = KeyId::new(9);
        ctrl.register(txn).unwrap();
        ctrl.write(txn, key, 99).unwrap();
        ctrl.rollback(txn).unwrap();
        assert_eq!(ctrl.held(txn), (0, 0));
        assert_eq!(ctrl.store().committed(key), None);

        // the key is lockable again
        let t2 = TxnId::new(2);
        ctrl.register(t2).unwrap();
        ctrl.write(t2, key, 1).unwrap();
        ctrl.commit(t2).unwrap();
        assert_eq!(ctrl.store().committed(key), Some(1));
    }
}
