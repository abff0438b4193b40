//! Core types for lockstep
//!
//! This crate defines the fundamental pieces shared by every strategy:
//! - [`TxnId`], [`KeyId`], [`Timestamp`]: identifiers and logical clocks
//! - [`Error`] / [`Result`]: the two-variant error taxonomy
//! - [`Storage`]: the storage collaborator boundary

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::Storage;
pub use types::{KeyId, Timestamp, TxnId};
