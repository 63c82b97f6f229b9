//! Error types for the sync engine.

use thiserror::Error;

/// Errors that can abort a sync cycle.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Remote connection or query error
    #[error("remote error: {0}")]
    Remote(#[from] libsql::Error),

    /// A bounded remote operation exceeded its timeout
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// The cycle was cancelled at a checkpoint
    #[error("sync cancelled")]
    Cancelled,

    /// Local store error
    #[error("local store error: {0}")]
    Store(#[from] crate::error::Error),
}

impl SyncError {
    /// Returns true if this failure is a cooperative cancellation
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
