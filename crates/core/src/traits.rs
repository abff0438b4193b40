//! Storage collaborator boundary
//!
//! The controllers consume, and never implement, a raw keyed store. The
//! store has no concurrency semantics of its own; every serializability
//! guarantee comes from the controller sitting in front of it.

use crate::error::Result;
use crate::types::{KeyId, TxnId};

/// Raw keyed read/write/commit/rollback primitive.
///
/// All operations fail with [`Error::InvalidTransactionId`] when the
/// transaction was never registered.
///
/// [`Error::InvalidTransactionId`]: crate::Error::InvalidTransactionId
pub trait Storage: Send + Sync {
    /// The type of data item values.
    type Value;

    /// Make a transaction known to the store.
    fn register(&self, txn: TxnId) -> Result<()>;

    /// Read the value of a data item, or `None` if the key has never been
    /// written.
    fn read(&self, txn: TxnId, key: KeyId) -> Result<Option<Self::Value>>;

    /// Write the value of a data item on behalf of a transaction.
    fn write(&self, txn: TxnId, key: KeyId, value: Self::Value) -> Result<()>;

    /// Finalize the transaction's writes.
    fn commit(&self, txn: TxnId) -> Result<()>;

    /// Revert the transaction's uncommitted writes.
    fn rollback(&self, txn: TxnId) -> Result<()>;
}
