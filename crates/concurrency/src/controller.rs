//! Controller contract
//!
//! The common operation set every strategy must honor. All strategies are
//! variants of this single contract; a caller holds a
//! `dyn ConcurrencyController<V>` and never learns which one is in force.
//!
//! Failure taxonomy (see [`lockstep_core::Error`]):
//! - `InvalidTransactionId` when the transaction was never registered
//! - `Abort` when the strategy's conflict rule forbids the operation
//!
//! The lock strategy additionally *blocks* the calling thread while a
//! conflicting lock is held; blocking is not an error and has no timeout.

use lockstep_core::{KeyId, Result, TxnId};

/// Common operation set for every concurrency-control strategy.
pub trait ConcurrencyController<V>: Send + Sync {
    /// Make a transaction known to the strategy and its storage
    /// collaborator.
    ///
    /// Timestamp strategies assign the transaction's initial logical
    /// timestamp here.
    fn register(&self, txn: TxnId) -> Result<()>;

    /// Handle a read request.
    ///
    /// Returns the stored value (or `None` for a never-written key) once
    /// the strategy permits the read.
    fn read(&self, txn: TxnId, key: KeyId) -> Result<Option<V>>;

    /// Handle a write request.
    fn write(&self, txn: TxnId, key: KeyId, value: V) -> Result<()>;

    /// Finalize the transaction in storage, then perform strategy-specific
    /// cleanup (lock release, timestamp teardown).
    fn commit(&self, txn: TxnId) -> Result<()>;

    /// Revert the transaction in storage, then perform the same cleanup as
    /// commit.
    fn rollback(&self, txn: TxnId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_is_object_safe() {
        fn _assert_object_safe(_: &dyn ConcurrencyController<i64>) {}
    }
}
