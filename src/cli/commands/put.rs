//! cli::commands::put
//!
//! `pool out <sources>`: acquire or release a lock.

use std::io;
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::pool::{ClaimResult, LockPoolCoordinator};
use crate::resource::{
    read_lock_name, read_request, MetadataPair, OutAction, OutRequest, Version, VersionResponse,
};
use crate::ui::output;

use super::workspace::{retry_policy, Workspace};

/// Run `out` against a request read from stdin.
pub fn put(ctx: &Context, sources: &Path) -> Result<()> {
    let request: OutRequest = read_request(io::stdin().lock())?;
    let response = run(ctx, &request, sources)?;
    output::emit_json(&response).context("failed to write response")?;
    Ok(())
}

pub(crate) fn run(ctx: &Context, request: &OutRequest, sources: &Path) -> Result<VersionResponse> {
    let source = &request.source;
    source.validate()?;
    let pool = source.require_pool()?;
    let action = request.params.action()?;
    let policy = retry_policy(ctx, source)?;

    let workspace = Workspace::open(ctx, source)?;
    let mut coordinator = LockPoolCoordinator::new(workspace.store, rand::rng())
        .with_policy(policy)
        .with_cancel(ctx.cancel.clone())
        .with_verbosity(ctx.verbosity);

    match action {
        OutAction::Acquire => {
            let result: ClaimResult = coordinator
                .claim(pool)
                .with_context(|| format!("failed to claim a lock from pool '{pool}'"))?;
            output::info(
                format!("claimed '{}' from '{pool}'", result.lock_name),
                ctx.verbosity,
            );
            Ok(VersionResponse::for_lock(&result))
        }
        OutAction::Release { from } => {
            let lock = read_lock_name(&sources.join(&from))?;
            let version = coordinator
                .release(pool, &lock)
                .with_context(|| format!("failed to release '{lock}' into pool '{pool}'"))?;
            output::info(format!("released '{lock}' into '{pool}'"), ctx.verbosity);

            Ok(VersionResponse {
                version: Version::from(version),
                metadata: vec![
                    MetadataPair::new("lock_name", lock.as_str()),
                    MetadataPair::new("pool_name", pool.as_str()),
                ],
            })
        }
    }
}
