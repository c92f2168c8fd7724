//! cli::commands::check
//!
//! `pool check`: list versions of a pool newer than the given one.

use std::io;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::pool::list_versions;
use crate::resource::{read_request, CheckRequest, Version};
use crate::ui::output;

use super::workspace::Workspace;

/// Run `check` against a request read from stdin.
pub fn check(ctx: &Context) -> Result<()> {
    let request: CheckRequest = read_request(io::stdin().lock())?;
    let versions = run(ctx, &request)?;
    output::emit_json(&versions).context("failed to write response")?;
    Ok(())
}

pub(crate) fn run(ctx: &Context, request: &CheckRequest) -> Result<Vec<Version>> {
    request.source.validate()?;
    let pool = request.source.require_pool()?;
    let since = request.version.as_ref().map(|v| &v.reference);

    let mut workspace = Workspace::open(ctx, &request.source)?;
    let versions = list_versions(&mut workspace.store, pool, since)
        .with_context(|| format!("failed to check pool '{pool}'"))?;
    output::debug(
        format!("{} version(s) for pool '{pool}'", versions.len()),
        ctx.verbosity,
    );

    Ok(versions.into_iter().map(Version::from).collect())
}
