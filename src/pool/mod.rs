//! pool
//!
//! Lock pool coordination over a [`VersionedTreeStore`](crate::store::VersionedTreeStore).
//!
//! # Modules
//!
//! - [`coordinator`] - Claim and release with bounded conflict retry
//! - [`resolver`] - Recover the lock behind a version
//! - [`check`] - Versions of a pool since a known one
//! - [`retry`] - Retry budget and backoff
//! - [`cancel`] - Cooperative cancellation
//! - [`errors`] - Error taxonomy with stable codes
//!
//! # Invariants
//!
//! - At any published version a lock is in exactly one of `unclaimed` and `claimed`
//! - Payloads are moved, never rewritten
//! - Publish conflicts are retried locally and never surface as such

pub mod cancel;
pub mod check;
pub mod coordinator;
pub mod errors;
pub mod resolver;
pub mod retry;

pub use cancel::CancelToken;
pub use check::list_versions;
pub use coordinator::{ClaimResult, LockPoolCoordinator};
pub use errors::PoolError;
pub use resolver::{ClaimResolver, Transition};
pub use retry::{Backoff, RetryPolicy};
