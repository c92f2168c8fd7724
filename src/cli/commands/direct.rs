//! cli::commands::direct
//!
//! Direct commands: `pool claim`, `pool release`, `pool resolve`.
//!
//! These take flags instead of a JSON request and print a flat JSON object,
//! for humans and shell scripts.

use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Serialize;

use crate::cli::args::{RepoArgs, RetryArgs};
use crate::cli::Context;
use crate::core::types::{LockName, Oid};
use crate::pool::{ClaimResolver, ClaimResult, LockPoolCoordinator};
use crate::resource::write_lock_files;
use crate::ui::output;

use super::workspace::{retry_policy, source_from_args, Workspace};

/// Flat description of a lock for direct commands.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LockOutput {
    pub lock_name: String,
    pub pool_name: String,
    /// Payload, when it is text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl LockOutput {
    fn new(result: &ClaimResult, with_version: bool) -> Self {
        Self {
            lock_name: result.lock_name.to_string(),
            pool_name: result.pool_name.to_string(),
            content: result.content_str().map(String::from),
            version: with_version.then(|| result.version.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReleaseOutput {
    version: String,
}

/// `pool claim`
pub fn claim(
    ctx: &Context,
    repo: &RepoArgs,
    retry: &RetryArgs,
    destination: Option<&Path>,
) -> Result<()> {
    let source = source_from_args(repo, Some(retry))?;
    let pool = source.require_pool()?;
    let policy = retry_policy(ctx, &source)?;

    let workspace = Workspace::open(ctx, &source)?;
    let mut coordinator = LockPoolCoordinator::new(workspace.store, rand::rng())
        .with_policy(policy)
        .with_cancel(ctx.cancel.clone())
        .with_verbosity(ctx.verbosity);

    let result = coordinator
        .claim(pool)
        .with_context(|| format!("failed to claim a lock from pool '{pool}'"))?;
    if let Some(dir) = destination {
        write_lock_files(dir, &result)?;
    }
    if result.content_str().is_none() {
        output::warn("lock payload is not UTF-8; omitted from output", ctx.verbosity);
    }

    output::emit_json(&LockOutput::new(&result, true)).context("failed to write response")?;
    Ok(())
}

/// `pool release`
pub fn release(ctx: &Context, repo: &RepoArgs, retry: &RetryArgs, lock: &str) -> Result<()> {
    let source = source_from_args(repo, Some(retry))?;
    let pool = source.require_pool()?;
    let lock = LockName::new(lock).context("invalid --lock")?;
    let policy = retry_policy(ctx, &source)?;

    let workspace = Workspace::open(ctx, &source)?;
    let mut coordinator = LockPoolCoordinator::new(workspace.store, rand::rng())
        .with_policy(policy)
        .with_cancel(ctx.cancel.clone())
        .with_verbosity(ctx.verbosity);

    let version = coordinator
        .release(pool, &lock)
        .with_context(|| format!("failed to release '{lock}' into pool '{pool}'"))?;

    output::emit_json(&ReleaseOutput {
        version: version.to_string(),
    })
    .context("failed to write response")?;
    Ok(())
}

/// `pool resolve`
pub fn resolve(
    ctx: &Context,
    repo: &RepoArgs,
    reference: &str,
    destination: Option<&Path>,
) -> Result<()> {
    let source = source_from_args(repo, None)?;
    let version = Oid::new(reference).context("invalid --version")?;

    let workspace = Workspace::open(ctx, &source)?;
    let mut resolver = ClaimResolver::new(workspace.store).with_verbosity(ctx.verbosity);
    let pool = match &source.pool {
        Some(pool) => pool.clone(),
        None => resolver.infer_pool(&version)?,
    };

    let result = resolver
        .resolve(&pool, &version)
        .with_context(|| format!("failed to resolve version {version} in pool '{pool}'"))?;
    if let Some(dir) = destination {
        write_lock_files(dir, &result)?;
    }

    output::emit_json(&LockOutput::new(&result, false)).context("failed to write response")?;
    Ok(())
}
