//! Error types for the storage core.

use thiserror::Error;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in the storage core
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error from the underlying heap file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Buffer pool has no unpinned frame to evict
    #[error("buffer pool exhausted: all frames pinned")]
    BufferPoolExhausted,

    /// A slotted page does not have enough free space for the operation
    #[error("page full: need {needed} bytes but only {available} available")]
    PageFull { needed: usize, available: usize },

    /// An encoded pair exceeds the per-node maximum
    #[error("pair too large: {size} bytes (max: {max})")]
    PairTooLarge { size: usize, max: usize },

    /// A key that must stay unique is already present
    #[error("key already exists")]
    KeyExists,

    /// Stored bytes could not be decoded
    #[error("corruption detected: {0}")]
    Corruption(String),
}

impl StorageError {
    /// Create a corruption error with a message
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }
}
