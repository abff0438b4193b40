//! Basic timestamp ordering controller
//!
//! Every registered transaction carries a logical timestamp issued from a
//! strictly increasing counter; every key carries a read and a write
//! high-water mark. Each request is validated against the marks and either
//! proceeds or aborts. Nothing ever blocks.
//!
//! Two behaviors are reproduced from the system this reimplements rather
//! than from the textbook protocol:
//! - a transaction is issued a *new* timestamp after almost every
//!   successful read or write, and
//! - every successful write is committed in storage immediately.
//!
//! High-water marks are only ever raised (`max` with the existing value),
//! which keeps the per-key mark sequences non-decreasing even when an old
//! transaction takes the unconditional first-touch branch.

use crate::controller::ConcurrencyController;
use lockstep_core::{Error, KeyId, Result, Storage, Timestamp, TxnId};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

/// Outcome of validating a write against a key's high-water marks.
///
/// The basic strategy and Thomas' Write Rule agree on everything except
/// how `StaleWrite` is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteCheck {
    /// The key has no write mark or no read mark yet; unconditionally
    /// allowed.
    Unmarked,
    /// A later transaction already read this key; never forgivable.
    LateRead,
    /// A later transaction already wrote this key (and the read check
    /// passed). The basic strategy aborts; Thomas' rule drops the write.
    StaleWrite,
    /// The transaction's timestamp is current with respect to both marks.
    Current,
}

/// Timestamp bookkeeping shared by the timestamp strategies.
///
/// Held behind one mutex so that every check-then-update sequence on the
/// transaction table and the per-key marks is a single critical section.
/// The controllers keep that section open across the storage forward of
/// an admitted operation; a mark and the stored value it describes never
/// come apart.
pub(crate) struct TimestampTables {
    /// Next timestamp to issue.
    clock: Timestamp,
    txns: FxHashMap<TxnId, Timestamp>,
    read_marks: FxHashMap<KeyId, Timestamp>,
    write_marks: FxHashMap<KeyId, Timestamp>,
}

impl TimestampTables {
    pub(crate) fn new() -> Self {
        TimestampTables {
            clock: 0,
            txns: FxHashMap::default(),
            read_marks: FxHashMap::default(),
            write_marks: FxHashMap::default(),
        }
    }

    /// Issue the transaction a fresh timestamp, initial or replacement.
    pub(crate) fn assign(&mut self, txn: TxnId) -> Timestamp {
        let ts = self.clock;
        self.clock += 1;
        let old = self.txns.insert(txn, ts);
        trace!(txn = %txn, ts, old = ?old, "timestamp assigned");
        ts
    }

    pub(crate) fn timestamp_of(&self, txn: TxnId) -> Option<Timestamp> {
        self.txns.get(&txn).copied()
    }

    /// Timestamp of a registered transaction, or `InvalidTransactionId`.
    pub(crate) fn require(&self, txn: TxnId) -> Result<Timestamp> {
        self.timestamp_of(txn)
            .ok_or(Error::InvalidTransactionId(txn))
    }

    /// Forget the transaction; no further reassignment occurs for it.
    pub(crate) fn remove(&mut self, txn: TxnId) {
        self.txns.remove(&txn);
    }

    pub(crate) fn read_mark(&self, key: KeyId) -> Option<Timestamp> {
        self.read_marks.get(&key).copied()
    }

    pub(crate) fn write_mark(&self, key: KeyId) -> Option<Timestamp> {
        self.write_marks.get(&key).copied()
    }

    /// Raise the key's read mark. Marks never go backwards.
    pub(crate) fn raise_read_mark(&mut self, key: KeyId, ts: Timestamp) {
        let mark = self.read_marks.entry(key).or_insert(ts);
        *mark = (*mark).max(ts);
    }

    /// Raise the key's write mark. Marks never go backwards.
    pub(crate) fn raise_write_mark(&mut self, key: KeyId, ts: Timestamp) {
        let mark = self.write_marks.entry(key).or_insert(ts);
        *mark = (*mark).max(ts);
    }

    /// Validate a read and record its effects.
    ///
    /// One atomic unit: the abort decision and every mark/timestamp update
    /// happen under the caller's lock on these tables. A rejected read
    /// alters no timestamp.
    pub(crate) fn apply_read(&mut self, txn: TxnId, key: KeyId) -> Result<()> {
        let ts = self.require(txn)?;
        match self.write_mark(key) {
            // Never written: unconditionally allowed. Record the current
            // timestamp as the read mark, then reissue.
            None => {
                self.raise_read_mark(key, ts);
                self.assign(txn);
            }
            // The transaction is in the past relative to a write it
            // should have seen.
            Some(write_mark) if ts < write_mark => {
                debug!(txn = %txn, key = %key, ts, write_mark, "read rejected");
                return Err(Error::Abort(txn));
            }
            // Ahead of the last write: reissue, and the read mark rises
            // to the new timestamp.
            Some(write_mark) if ts > write_mark => {
                let fresh = self.assign(txn);
                self.raise_read_mark(key, fresh);
            }
            // Equal: proceed without reassignment.
            Some(_) => {}
        }
        Ok(())
    }

    /// Classify a write against the key's marks without mutating anything.
    pub(crate) fn check_write(&self, txn: TxnId, key: KeyId) -> Result<WriteCheck> {
        let ts = self.require(txn)?;
        let (read_mark, write_mark) = (self.read_mark(key), self.write_mark(key));
        let check = match (read_mark, write_mark) {
            (None, _) | (_, None) => WriteCheck::Unmarked,
            (Some(r), _) if r > ts => WriteCheck::LateRead,
            (_, Some(w)) if w > ts => WriteCheck::StaleWrite,
            _ => WriteCheck::Current,
        };
        trace!(txn = %txn, key = %key, ts, ?check, "write classified");
        Ok(check)
    }
}

/// Basic timestamp ordering controller.
///
/// Non-blocking: every call resolves immediately to success or
/// [`Error::Abort`].
///
/// # Example
///
/// ```
/// use lockstep_concurrency::{ConcurrencyController, TimestampOrdering};
/// use lockstep_core::{KeyId, TxnId};
/// use lockstep_storage::MemStore;
///
/// let ctrl = TimestampOrdering::new(MemStore::new());
/// let txn = TxnId::new(1);
/// ctrl.register(txn).unwrap();
/// ctrl.write(txn, KeyId::new(7), 42).unwrap();
/// ctrl.commit(txn).unwrap();
/// ```
pub struct TimestampOrdering<S> {
    store: S,
    tables: Mutex<TimestampTables>,
}

impl<S: Storage> TimestampOrdering<S> {
    /// Construct a controller wrapping the given storage collaborator.
    pub fn new(store: S) -> Self {
        TimestampOrdering {
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

impl<S: Storage> ConcurrencyController<S::Value> for TimestampOrdering<S> {
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
        // The storage forward stays inside the critical section: once a
        // writer has raised the mark, no competing writer reaches storage
        // until its value has landed, so surviving writes hit storage in
        // mark order.
        let mut tables = self.tables.lock();
        match tables.check_write(txn, key)? {
            WriteCheck::Unmarked | WriteCheck::Current => {
                let ts = tables.require(txn)?;
                tables.raise_write_mark(key, ts);
                // Committed in storage immediately; commit() at
                // transaction end only finishes bookkeeping.
                self.store.write(txn, key, value)?;
                self.store.commit(txn)?;
                tables.assign(txn);
                Ok(())
            }
            WriteCheck::LateRead | WriteCheck::StaleWrite => {
                debug!(txn = %txn, key = %key, "write rejected");
                self.store.rollback(txn)?;
                Err(Error::Abort(txn))
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
