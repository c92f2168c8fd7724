//! cli::commands::get
//!
//! `pool in <destination>`: fetch the lock behind a version.
//!
//! # Design
//!
//! The version is resolved, never re-claimed: `in` is a read of history.
//! A version produced by a release resolves too, so that the implicit
//! fetch after a releasing `out` succeeds. When the source names no pool,
//! the pool is inferred from the version.

use std::io;
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::pool::ClaimResolver;
use crate::resource::{read_request, write_lock_files, InRequest, VersionResponse};
use crate::ui::output;

use super::workspace::Workspace;

/// Run `in` against a request read from stdin.
pub fn get(ctx: &Context, destination: &Path) -> Result<()> {
    let request: InRequest = read_request(io::stdin().lock())?;
    let response = run(ctx, &request, destination)?;
    output::emit_json(&response).context("failed to write response")?;
    Ok(())
}

pub(crate) fn run(ctx: &Context, request: &InRequest, destination: &Path) -> Result<VersionResponse> {
    request.source.validate()?;
    let version = &request.version.reference;

    let workspace = Workspace::open(ctx, &request.source)?;
    let mut resolver = ClaimResolver::new(workspace.store).with_verbosity(ctx.verbosity);

    let pool = match &request.source.pool {
        Some(pool) => pool.clone(),
        None => resolver
            .infer_pool(version)
            .with_context(|| format!("failed to infer pool of version {version}"))?,
    };
    let (transition, result) = resolver
        .resolve_any(&pool, version)
        .with_context(|| format!("failed to resolve version {version} in pool '{pool}'"))?;
    output::info(
        format!("{version} is a {transition} of '{}'", result.lock_name),
        ctx.verbosity,
    );

    write_lock_files(destination, &result)?;
    Ok(VersionResponse::for_lock(&result))
}
