//! lockpool - git-backed lock pools
//!
//! A pool is a directory in a git repository with two subdirectories,
//! `unclaimed` and `claimed`. Each file is a lock. Claiming moves a file
//! from `unclaimed` to `claimed` in a commit; whoever pushes first wins.
//! The commit id is the version a claimant keeps to find its lock later.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to pool)
//! - [`resource`] - Request/response envelopes validated at the boundary
//! - [`pool`] - Claim, release and resolve with optimistic concurrency
//! - [`store`] - The versioned tree store (git-backed and in-memory)
//! - [`git`] - Single interface for all Git operations
//! - [`core`] - Domain types, path routing and configuration
//! - [`ui`] - Diagnostics and JSON output
//!
//! # Correctness Invariants
//!
//! 1. A lock is in exactly one of `unclaimed` and `claimed` at every published version
//! 2. Lock payloads are moved, never rewritten
//! 3. Every successful claim yields a version that resolves back to the same lock
//! 4. No unpublished change outlives the invocation that made it

pub mod cli;
pub mod core;
pub mod git;
pub mod pool;
pub mod resource;
pub mod store;
pub mod ui;
