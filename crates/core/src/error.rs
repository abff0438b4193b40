//! Error taxonomy for controller and storage operations
//!
//! There are exactly two failure kinds:
//! - [`Error::InvalidTransactionId`]: caller misuse, the transaction was
//!   never registered. Propagated immediately, no recovery.
//! - [`Error::Abort`]: an expected concurrency outcome. The caller must
//!   treat the transaction as finished-in-failure and retry, if at all,
//!   under a fresh transaction id.
//!
//! The core never retries internally and never converts one kind into the
//! other.

use crate::types::TxnId;
use thiserror::Error;

/// All lockstep errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The given transaction id is unknown
    #[error("invalid transaction id: {0}")]
    InvalidTransactionId(TxnId),

    /// The operation cannot be permitted under the active strategy's
    /// conflict rule; the transaction must abort
    #[error("transaction {0} aborted")]
    Abort(TxnId),
}

/// Result type for lockstep operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is an abort.
    ///
    /// Aborts are retryable, but only under a fresh transaction id.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Abort(_))
    }

    /// Check if this error is caller misuse (unknown transaction id).
    pub fn is_invalid_txn(&self) -> bool {
        matches!(self, Error::InvalidTransactionId(_))
    }
}
