//! # Lockstep
//!
//! Serializable concurrency control over a shared keyed store.
//!
//! Lockstep sits between a transaction's read/write requests and a raw
//! storage collaborator, deciding whether each request may proceed, must
//! block, or must abort the transaction. Three strategies implement one
//! contract:
//!
//! - [`StrictTwoPhase`]: per-key reader/writer locks, strict two-phase
//!   discipline. Conflicting requests block until the holder finishes.
//! - [`TimestampOrdering`]: logical timestamps validated against per-key
//!   high-water marks. Conflicting requests abort; nothing ever blocks.
//! - [`ThomasWriteRule`]: timestamp ordering that silently drops obsolete
//!   writes instead of aborting.
//!
//! ## Quick Start
//!
//! ```
//! use lockstep::{controller, KeyId, MemStore, Strategy, TxnId};
//!
//! let ctrl = controller(Strategy::StrictTwoPhaseLocking, MemStore::new());
//!
//! let txn = TxnId::new(1);
//! ctrl.register(txn)?;
//! ctrl.write(txn, KeyId::new(10), "value")?;
//! assert_eq!(ctrl.read(txn, KeyId::new(10))?, Some("value"));
//! ctrl.commit(txn)?;
//! # Ok::<(), lockstep::Error>(())
//! ```
//!
//! Callers are agnostic to the strategy in force; an abort means the
//! transaction is finished-in-failure and any retry needs a fresh id.

#![warn(missing_docs)]

// Re-export the contract and strategies
pub use lockstep_concurrency::{
    ConcurrencyController, StrictTwoPhase, ThomasWriteRule, TimestampOrdering,
};

// Re-export core types
pub use lockstep_core::{Error, KeyId, Result, Storage, Timestamp, TxnId};

// Re-export the reference store
pub use lockstep_storage::MemStore;

/// Concurrency-control strategy, chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Strict two-phase locking: blocks, never aborts.
    StrictTwoPhaseLocking,
    /// Basic timestamp ordering: aborts, never blocks.
    TimestampOrdering,
    /// Timestamp ordering with Thomas' Write Rule: like
    /// [`Strategy::TimestampOrdering`], but obsolete writes are dropped
    /// instead of aborting.
    ThomasWriteRule,
}

/// Build a controller for the chosen strategy around a storage
/// collaborator.
pub fn controller<S>(strategy: Strategy, store: S) -> Box<dyn ConcurrencyController<S::Value>>
where
    S: Storage + 'static,
    S::Value: 'static,
{
    match strategy {
        Strategy::StrictTwoPhaseLocking => Box::new(StrictTwoPhase::new(store)),
        Strategy::TimestampOrdering => Box::new(TimestampOrdering::new(store)),
        Strategy::ThomasWriteRule => Box::new(ThomasWriteRule::new(store)),
    }
}
