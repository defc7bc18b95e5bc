//! Store error types

use thiserror::Error;

/// Main store error type
#[derive(Debug, Error)]
pub enum StoreError {
    /// Caller supplied a zero-length key
    #[error("empty key")]
    EmptyKey,

    /// Key exceeds the configured limit
    #[error("key length {len} exceeds limit {limit}")]
    KeyTooLarge { len: usize, limit: usize },

    /// Value exceeds the configured limit
    #[error("value length {len} exceeds limit {limit}")]
    ValueTooLarge { len: usize, limit: usize },

    /// Underlying write, flush, or read failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Undecodable record found mid-log during replay, with well-formed
    /// records after it. The engine refuses to start on this.
    #[error("corrupt log: undecodable record at offset {offset} followed by valid records")]
    CorruptLog { offset: u64 },
}

/// Store result type alias
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Check if the operation left no trace in the store
    ///
    /// Validation errors never touch the log or the index. An `Io` error
    /// is ambiguous: the append may or may not have reached stable storage,
    /// so callers should retry idempotently.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::EmptyKey
                | StoreError::KeyTooLarge { .. }
                | StoreError::ValueTooLarge { .. }
        )
    }
}
