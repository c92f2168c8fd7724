//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Request `source` fields (not handled here)
//! 4. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. `$LOCKPOOL_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/lockpool/config.toml`
//! 3. `~/.lockpool/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use lockpool::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! let policy = config.retry_policy().unwrap();
//! println!("max attempts: {}", policy.max_attempts);
//! println!("committing as {} <{}>", config.identity_name(), config.identity_email());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, IdentityConfig, RetryConfig};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::pool::retry::{Backoff, RetryPolicy};

/// Default commit author name.
pub const DEFAULT_IDENTITY_NAME: &str = "CI Pool Resource";

/// Default commit author email.
pub const DEFAULT_IDENTITY_EMAIL: &str = "ci-pool@localhost";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Path the configuration was loaded from (if any)
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// Missing config files are not an error (defaults are used).
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// contains invalid values.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::locate() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let global: GlobalConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        global.validate()?;

        Ok(Self {
            global,
            path: Some(path.to_path_buf()),
        })
    }

    /// Find the first existing config file.
    fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("LOCKPOOL_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("lockpool/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        let path = dirs::home_dir()?.join(".lockpool/config.toml");
        path.exists().then_some(path)
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Build the retry policy from configured values.
    ///
    /// Defaults come from [`RetryPolicy::default`].
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        let mut policy = RetryPolicy::default();
        let Some(retry) = &self.global.retry else {
            return Ok(policy);
        };

        if let Some(attempts) = retry.max_attempts {
            policy.max_attempts = attempts;
        }
        if let Some(delay) = &retry.retry_delay {
            policy.retry_delay = schema::parse_duration(delay)?;
        }
        if let Some(wait) = retry.wait_for_lock {
            policy.wait_for_lock = wait;
        }
        if retry.backoff.as_deref() == Some("exponential") {
            let max_delay = match &retry.max_delay {
                Some(d) => schema::parse_duration(d)?,
                None => policy.retry_delay.saturating_mul(8),
            };
            policy.backoff = Backoff::Exponential { max_delay };
        }

        Ok(policy)
    }

    /// Commit author name.
    ///
    /// Defaults to "CI Pool Resource".
    pub fn identity_name(&self) -> &str {
        self.global
            .identity
            .as_ref()
            .and_then(|i| i.name.as_deref())
            .unwrap_or(DEFAULT_IDENTITY_NAME)
    }

    /// Commit author email.
    ///
    /// Defaults to "ci-pool@localhost".
    pub fn identity_email(&self) -> &str {
        self.global
            .identity
            .as_ref()
            .and_then(|i| i.email.as_deref())
            .unwrap_or(DEFAULT_IDENTITY_EMAIL)
    }

    /// Get the path the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
