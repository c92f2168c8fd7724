//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and build the execution [`Context`]
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers validate the request at the boundary,
//! open a per-invocation store workspace and hand over to [`crate::pool`].
//! stdout carries only the JSON response.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::time::Duration;

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::pool::CancelToken;
use crate::ui::output::Verbosity;

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags and configuration.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub verbosity: Verbosity,
    /// Cancelled on `--timeout`
    pub cancel: CancelToken,
    pub config: Config,
}

impl Context {
    /// Build the context from parsed flags.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Config::load().context("failed to load configuration")?;
        let cancel = match cli.timeout {
            Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
            None => CancelToken::new(),
        };

        Ok(Self {
            verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
            cancel,
            config,
        })
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let ctx = Context::from_cli(&cli)?;
    commands::dispatch(cli.command, &ctx)
}
