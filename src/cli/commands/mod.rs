//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Reads and validates its request (stdin JSON or flags)
//! 2. Opens a per-invocation [`workspace::Workspace`]
//! 3. Calls into [`crate::pool`]
//! 4. Writes the JSON response to stdout
//!
//! Handlers never touch the repository except through the store.

mod check;
mod completion;
mod direct;
mod get;
mod put;
mod workspace;

pub use check::check;
pub use completion::completion;
pub use direct::{claim, release, resolve, LockOutput};
pub use get::get;
pub use put::put;
pub use workspace::Workspace;

use crate::cli::args::Command;
use crate::cli::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        // Resource protocol
        Command::Check => check::check(ctx),
        Command::In { destination } => get::get(ctx, &destination),
        Command::Out { sources } => put::put(ctx, &sources),

        // Direct commands
        Command::Claim {
            repo,
            retry,
            destination,
        } => direct::claim(ctx, &repo, &retry, destination.as_deref()),
        Command::Release { repo, retry, lock } => direct::release(ctx, &repo, &retry, &lock),
        Command::Resolve {
            repo,
            reference,
            destination,
        } => direct::resolve(ctx, &repo, &reference, destination.as_deref()),

        Command::Completion { shell } => completion::completion(shell),
    }
}
