//! cli::commands::workspace
//!
//! Per-invocation store workspace shared by all handlers.
//!
//! Every run gets a fresh temporary directory holding a bare repository.
//! Nothing is reused between runs, so a crashed run never leaves state
//! behind for the next one.

use std::fs;

use anyhow::{Context as _, Result};
use tempfile::TempDir;

use crate::cli::args::{RepoArgs, RetryArgs};
use crate::cli::Context;
use crate::core::types::PoolName;
use crate::git::Identity;
use crate::pool::RetryPolicy;
use crate::resource::Source;
use crate::store::{GitStoreOptions, GitTreeStore};
use crate::ui::output;

/// A store together with the directory backing it.
///
/// The directory is removed when this is dropped.
#[derive(Debug)]
pub struct Workspace {
    _dir: TempDir,
    pub store: GitTreeStore,
}

impl Workspace {
    /// Open a store for `source` in a new temporary directory.
    pub fn open(ctx: &Context, source: &Source) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("pool-resource")
            .tempdir()
            .context("failed to create workspace")?;
        output::debug(
            format!("workspace at {}", dir.path().display()),
            ctx.verbosity,
        );

        let options = GitStoreOptions {
            uri: source.uri.clone(),
            branch: source.branch.clone(),
            private_key: source.private_key.clone(),
            identity: Identity {
                name: ctx.config.identity_name().to_string(),
                email: ctx.config.identity_email().to_string(),
            },
        };
        let store = GitTreeStore::open(dir.path(), options)
            .with_context(|| format!("failed to prepare repository for '{}'", source.uri))?;

        Ok(Self { _dir: dir, store })
    }
}

/// Retry policy: configuration, then source fields.
pub fn retry_policy(ctx: &Context, source: &Source) -> Result<RetryPolicy> {
    let base = ctx
        .config
        .retry_policy()
        .context("invalid retry configuration")?;
    Ok(source.retry_policy(base)?)
}

/// Build a source from direct-command flags.
pub fn source_from_args(repo: &RepoArgs, retry: Option<&RetryArgs>) -> Result<Source> {
    let pool = repo
        .pool
        .as_deref()
        .map(PoolName::new)
        .transpose()
        .context("invalid --pool")?;
    let private_key = repo
        .private_key
        .as_ref()
        .map(|path| {
            fs::read_to_string(path)
                .with_context(|| format!("failed to read private key '{}'", path.display()))
        })
        .transpose()?;

    let source = Source {
        uri: repo.uri.clone(),
        branch: repo.branch.clone(),
        pool,
        private_key,
        retry_delay: retry.and_then(|r| r.retry_delay.clone()),
        max_attempts: retry.and_then(|r| r.max_attempts),
        wait_for_lock: retry.and_then(|r| r.wait_for_lock.then_some(true)),
    };
    source.validate()?;
    Ok(source)
}
