//! store
//!
//! The versioned tree store the pool coordinates through.
//!
//! # Design
//!
//! A store is a private working copy of a replicated tree. Reads and
//! mutations happen locally; only [`VersionedTreeStore::publish`] talks to
//! the shared replica, and it refuses snapshots whose base is no longer the
//! replica's head. That refusal is the only synchronisation primitive the
//! pool needs.
//!
//! # Implementations
//!
//! - [`GitTreeStore`] - a bare git workspace pushing to a remote branch
//! - [`MemoryStore`] - an in-memory replica for tests and simulations
//!
//! # Example
//!
//! ```
//! use lockpool::store::{MemoryRemote, PublishOutcome, VersionedTreeStore};
//!
//! let remote = MemoryRemote::new();
//! remote.commit_files("setup", &[("pool/unclaimed/a", "payload")]);
//!
//! let mut store = remote.handle();
//! let head = store.sync().unwrap();
//! store.move_entry("pool/unclaimed/a", "pool/claimed/a").unwrap();
//! let version = store.snapshot("claiming: a").unwrap();
//!
//! assert_eq!(store.publish(&version).unwrap(), PublishOutcome::Published);
//! assert_eq!(store.read("pool/claimed/a", &version).unwrap(), b"payload".to_vec());
//! # let _ = head;
//! ```

pub mod git_store;
pub mod memory;

pub use git_store::{GitStoreOptions, GitTreeStore};
pub use memory::{MemoryRemote, MemoryStore, StoreOperation};

use thiserror::Error;

use crate::core::types::Oid;

/// Errors from store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The shared replica could not be reached (network, auth, bad URL).
    #[error("store unreachable: {0}")]
    Unreachable(String),

    /// The replica has no such branch.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// A tree path does not exist.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// A tree path exists but is not a regular file.
    #[error("not a file: {0}")]
    NotAFile(String),

    /// The version is unknown to the store.
    #[error("version not found: {0}")]
    VersionNotFound(String),

    /// A snapshot was requested without any staged change.
    #[error("nothing staged to snapshot")]
    NothingStaged,

    /// Any other failure inside the store.
    #[error("store failure: {0}")]
    Internal(String),
}

/// Result of publishing a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The replica's head is now the published version.
    Published,
    /// The replica advanced past the snapshot's base; nothing was published.
    Conflict,
}

/// Paths changed by a version relative to its parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl TreeDiff {
    /// Check whether any changed path starts with `prefix`.
    pub fn touches(&self, prefix: &str) -> bool {
        self.added
            .iter()
            .chain(&self.removed)
            .chain(&self.modified)
            .any(|path| path.starts_with(prefix))
    }
}

/// Versions found by a history walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    /// Matching versions, newest first.
    pub versions: Vec<Oid>,
    /// Whether the walk met the requested stop version.
    pub reached_stop: bool,
}

/// A private working copy of a replicated, versioned tree.
///
/// Mutating operations only affect the local copy until a snapshot is
/// published. All calls block.
pub trait VersionedTreeStore {
    /// Fetch the replica head and reset the local copy to it.
    ///
    /// Discards staged changes and unpublished snapshots. Returns the head.
    fn sync(&mut self) -> Result<Oid, StoreError>;

    /// List the entry names under `path` at the local head.
    ///
    /// Returns `None` if the path does not exist.
    fn list(&self, path: &str) -> Result<Option<Vec<String>>, StoreError>;

    /// Stage a rename of the file at `src` to `dst`.
    fn move_entry(&mut self, src: &str, dst: &str) -> Result<(), StoreError>;

    /// Commit staged changes on top of the local head.
    fn snapshot(&mut self, message: &str) -> Result<Oid, StoreError>;

    /// Try to make `version` the replica's head.
    fn publish(&mut self, version: &Oid) -> Result<PublishOutcome, StoreError>;

    /// Read the file at `path` as of `version`.
    fn read(&self, path: &str, version: &Oid) -> Result<Vec<u8>, StoreError>;

    /// Compare `version` with its parent.
    fn diff(&self, version: &Oid) -> Result<TreeDiff, StoreError>;

    /// Walk history from the local head, newest first, collecting versions
    /// whose diff touches `prefix`, until `stop_at` (exclusive) or the root.
    fn history(&self, prefix: &str, stop_at: Option<&Oid>) -> Result<History, StoreError>;
}
