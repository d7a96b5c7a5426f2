//! Storage error types.
//!
//! Defined in `dialecta-core` so the engine can classify failures from any
//! store backend without string matching. The engine never retries: a
//! storage failure aborts the operation and propagates unchanged.

use thiserror::Error;

/// Errors that can occur when talking to a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A persisted record could not be decoded.
    #[error("corrupt {entity} record: {detail}")]
    Corrupt { entity: String, detail: String },

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Returns `true` if retrying the same request could succeed.
    ///
    /// The engine itself never retries; callers owning a retry policy can
    /// use this to decide.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
