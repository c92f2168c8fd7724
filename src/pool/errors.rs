//! pool::errors
//!
//! Error taxonomy for claim, release and resolve.
//!
//! # Design
//!
//! Publish conflicts never appear here: the coordinator recovers them by
//! resyncing, and only surfaces [`PoolError::LockContention`] once the retry
//! budget is spent. Every variant carries a stable code for machine callers.
//!
//! # Example
//!
//! ```
//! use lockpool::pool::PoolError;
//!
//! let err = PoolError::NoLocksAvailable { pool: "aws".to_string() };
//! assert_eq!(err.code(), "NoLocksAvailable");
//! assert!(err.to_string().contains("aws"));
//! ```

use thiserror::Error;

use crate::store::StoreError;

/// Errors from pool operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The shared store could not be reached.
    #[error("store unreachable: {0}")]
    StoreUnreachable(String),

    /// The pool directory does not exist.
    #[error("pool '{pool}' not found")]
    PoolNotFound { pool: String },

    /// The pool has no unclaimed locks.
    #[error("no locks available in pool '{pool}'")]
    NoLocksAvailable { pool: String },

    /// The lock to release is not in the claimed set.
    #[error("lock '{lock}' is not claimed in pool '{pool}'")]
    LockNotClaimed { pool: String, lock: String },

    /// A lock entry's payload could not be read.
    #[error("lock entry '{path}' is unreadable: {reason}")]
    CorruptEntry { path: String, reason: String },

    /// Every attempt lost a publish race.
    #[error("gave up on pool '{pool}' after {attempts} contended attempts")]
    LockContention { pool: String, attempts: u32 },

    /// The version is not a single claim or release of this pool.
    #[error("version {version} is not a single lock transition ({found} found)")]
    AmbiguousVersion { version: String, found: usize },

    /// The version is unknown to the store.
    #[error("version {0} not found")]
    VersionNotFound(String),

    /// The operation was cancelled or timed out.
    #[error("operation cancelled")]
    Cancelled,

    /// Unexpected store failure.
    #[error("store failure: {0}")]
    StoreFailure(String),
}

impl PoolError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            PoolError::StoreUnreachable(_) => "StoreUnreachable",
            PoolError::PoolNotFound { .. } => "PoolNotFound",
            PoolError::NoLocksAvailable { .. } => "NoLocksAvailable",
            PoolError::LockNotClaimed { .. } => "LockNotClaimed",
            PoolError::CorruptEntry { .. } => "CorruptEntry",
            PoolError::LockContention { .. } => "LockContention",
            PoolError::AmbiguousVersion { .. } => "AmbiguousVersion",
            PoolError::VersionNotFound(_) => "VersionNotFound",
            PoolError::Cancelled => "Cancelled",
            PoolError::StoreFailure(_) => "StoreFailure",
        }
    }
}

impl From<StoreError> for PoolError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unreachable(message) => PoolError::StoreUnreachable(message),
            StoreError::VersionNotFound(version) => PoolError::VersionNotFound(version),
            other => PoolError::StoreFailure(other.to_string()),
        }
    }
}
