//! Timestamp ordering with Thomas' Write Rule
//!
//! Identical read rule to [`TimestampOrdering`]; the write rule differs in
//! one branch. When the only violated condition is a newer write mark (and
//! no later reader has seen the key), the obsolete write is silently
//! dropped: no storage mutation, no mark change, no abort. The transaction
//! continues as if the write had succeeded.
//!
//! A newer *read* mark still aborts; a later reader has already observed a
//! value this write would contradict.
//!
//! [`TimestampOrdering`]: crate::TimestampOrdering

use crate::controller::ConcurrencyController;
use crate::timestamp::{TimestampTables, WriteCheck};
use lockstep_core::{Error, KeyId, Result, Storage, Timestamp, TxnId};
use parking_lot::Mutex;
use tracing::debug;

/// Timestamp ordering controller applying Thomas' Write Rule.
///
/// # Example
///
/// ```
/// use lockstep_concurrency::{ConcurrencyController, ThomasWriteRule};
/// use lockstep_core::{KeyId, TxnId};
/// use lockstep_storage::MemStore;
///
/// let ctrl = ThomasWriteRule::new(MemStore::new());
/// let txn = TxnId::new(1);
/// ctrl.register(txn).unwrap();
/// ctrl.write(txn, KeyId::new(7), 42).unwrap();
/// ctrl.commit(txn).unwrap();
/// ```
pub struct ThomasWriteRule<S> {
    store: S,
    tables: Mutex<TimestampTables>,
}

impl<S: Storage> ThomasWriteRule<S> {
    /// Construct a controller wrapping the given storage collaborator.
    pub fn new(store: S) -> Self {
        ThomasWriteRule {
            store,
            tables: Mutex::new(TimestampTables::new()),
        }
    }

    /// Shared access to the wrapped store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The transaction's current logical timestamp, if registered.
    pub fn timestamp_of(&self, txn: TxnId) -> Option<Timestamp> {
        self.tables.lock().timestamp_of(txn)
    }

    /// The key's read high-water mark, if any read has been recorded.
    pub fn read_timestamp(&self, key: KeyId) -> Option<Timestamp> {
        self.tables.lock().read_mark(key)
    }

    /// The key's write high-water mark, if any write has been recorded.
    pub fn write_timestamp(&self, key: KeyId) -> Option<Timestamp> {
        self.tables.lock().write_mark(key)
    }
}

impl<S: Storage> ConcurrencyController<S::Value> for ThomasWriteRule<S> {
    fn register(&self, txn: TxnId) -> Result<()> {
        self.store.register(txn)?;
        self.tables.lock().assign(txn);
        Ok(())
    }

    fn read(&self, txn: TxnId, key: KeyId) -> Result<Option<S::Value>> {
        // The guard is held across the storage forward so the value
        // returned is the one the freshly recorded mark describes.
        let mut tables = self.tables.lock();
        tables.apply_read(txn, key)?;
        self.store.read(txn, key)
    }

    fn write(&self, txn: TxnId, key: KeyId, value: S::Value) -> Result<()> {
        // Unlike the basic strategy, no branch reassigns the transaction's
        // timestamp, and only the Current branch commits in storage. The
        // storage forward stays inside the critical section so admitted
        // writes reach storage in mark order.
        let mut tables = self.tables.lock();
        match tables.check_write(txn, key)? {
            WriteCheck::Unmarked => {
                let ts = tables.require(txn)?;
                tables.raise_write_mark(key, ts);
                self.store.write(txn, key, value)
            }
            WriteCheck::Current => {
                let ts = tables.require(txn)?;
                tables.raise_write_mark(key, ts);
                self.store.write(txn, key, value)?;
                self.store.commit(txn)
            }
            WriteCheck::LateRead => {
                debug!(txn = %txn, key = %key, "write rejected");
                self.store.rollback(txn)?;
                Err(Error::Abort(txn))
            }
            // Thomas' Write Rule: the write is obsolete and no reader has
            // seen an intervening value; drop it and carry on.
            WriteCheck::StaleWrite => {
                debug!(txn = %txn, key = %key, "obsolete write ignored");
                Ok(())
            }
        }
    }

    fn commit(&self, txn: TxnId) -> Result<()> {
        let result = self.store.commit(txn);
        self.tables.lock().remove(txn);
        result
    }

    fn rollback(&self, txn: TxnId) -> Result<()> {
        let result = self.store.rollback(txn);
        self.tables.lock().remove(txn);
        result
    }
}
