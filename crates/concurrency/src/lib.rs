//! Concurrency-control strategies for lockstep
//!
//! This crate implements the controller contract and its three strategies:
//! - [`StrictTwoPhase`]: per-key reader/writer locks, strict two-phase
//!   discipline (blocks, never aborts)
//! - [`TimestampOrdering`]: basic timestamp ordering (aborts, never blocks)
//! - [`ThomasWriteRule`]: timestamp ordering that silently drops obsolete
//!   writes instead of aborting
//!
//! A caller picks one strategy at construction, wraps a [`Storage`]
//! collaborator with it, and issues every read and write through the
//! controller. Callers are agnostic to which strategy is in force.
//!
//! [`Storage`]: lockstep_core::Storage

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod controller;
pub mod thomas;
pub mod timestamp;
pub mod two_phase;

pub use controller::ConcurrencyController;
pub use thomas::ThomasWriteRule;
pub use timestamp::TimestampOrdering;
pub use two_phase::StrictTwoPhase;
