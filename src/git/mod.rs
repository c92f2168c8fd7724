//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. No other module should import
//! `git2`, and nothing shells out to the git CLI.
//!
//! # Responsibilities
//!
//! - Bare workspace setup with a single `origin` remote
//! - Fetch and non-forced push of one branch
//! - Tree reads (list a directory, read a file) at a commit
//! - Tree rewrites (rename an entry) and commit creation
//! - First-parent diffs and history walks
//!
//! # Invariants
//!
//! - Pushes are never forced; a rejected push is reported, not retried here
//! - All operations return strong types (`Oid`)

mod interface;

pub use interface::{Git, GitError, Identity, PathChange, PushOutcome, RemoteAuth, ORIGIN};
