//! Identifier types
//!
//! This module defines the fundamental identifiers used throughout the
//! system:
//! - [`TxnId`]: identifies one transaction
//! - [`KeyId`]: identifies one data item in the keyed store
//! - [`Timestamp`]: logical timestamp issued by the timestamp strategies

/// Logical timestamp issued from a strictly increasing counter.
///
/// Timestamps are never wall-clock time; they only order transactions
/// relative to each other.
pub type Timestamp = u64;

/// Unique identifier for a transaction
///
/// TxnId is chosen by the caller and must be registered with a controller
/// before the transaction issues any reads or writes.
///
/// # Examples
///
/// ```
/// use lockstep_core::types::TxnId;
///
/// let id = TxnId::new(7);
/// assert_eq!(id.get(), 7);
/// assert_eq!(id.to_string(), "7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxnId(u64);

impl TxnId {
    /// Create a TxnId from a raw integer
    pub fn new(id: u64) -> Self {
        TxnId(id)
    }

    /// Get the raw integer value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TxnId {
    fn from(id: u64) -> Self {
        TxnId(id)
    }
}

impl std::fmt::Display for TxnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a data item
///
/// Each KeyId names one slot in the shared keyed store. Under the lock
/// strategy a KeyId owns one reader/writer lock; under the timestamp
/// strategies it owns a read and a write high-water mark.
///
/// # Examples
///
/// ```
/// use lockstep_core::types::KeyId;
///
/// let key = KeyId::new(42);
/// assert_eq!(key.get(), 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u64);

impl KeyId {
    /// Create a KeyId from a raw integer
    pub fn new(id: u64) -> Self {
        KeyId(id)
    }

    /// Get the raw integer value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for KeyId {
    fn from(id: u64) -> Self {
        KeyId(id)
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
