//! Reference storage collaborator for lockstep
//!
//! This crate implements [`MemStore`], a deliberately minimal in-memory
//! keyed store behind the core [`Storage`] trait:
//! - committed table shared by all transactions
//! - per-transaction write buffers, applied on commit, discarded on rollback
//! - no persistence, no concurrency semantics of its own
//!
//! [`Storage`]: lockstep_core::Storage

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod mem;

pub use mem::MemStore;
