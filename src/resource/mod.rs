//! resource
//!
//! The pipeline-facing envelope around the pool: `check`, `in` and `out`
//! requests, their responses, and the files exchanged through directories.
//!
//! # Files
//!
//! ```text
//! <dir>/name      lock name, no trailing newline
//! <dir>/metadata  raw lock payload
//! ```
//!
//! `in` writes both into its destination; `out` with `release` reads `name`
//! back from `<sources>/<release>`.

pub mod models;

pub use models::{
    CheckRequest, InRequest, MetadataPair, OutAction, OutParams, OutRequest, Source, Version,
    VersionResponse,
};

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::types::LockName;
use crate::pool::ClaimResult;

/// File holding the lock name.
pub const NAME_FILE: &str = "name";

/// File holding the lock payload.
pub const METADATA_FILE: &str = "metadata";

/// Errors at the request boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid value for '{field}': {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("cannot access '{path}': {message}")]
    Io { path: PathBuf, message: String },
}

/// Parse a JSON request from `input`.
pub fn read_request<T: DeserializeOwned>(mut input: impl Read) -> Result<T, ResourceError> {
    let mut raw = String::new();
    input
        .read_to_string(&mut raw)
        .map_err(|e| ResourceError::InvalidRequest(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| ResourceError::InvalidRequest(e.to_string()))
}

/// Write `name` and `metadata` for `result` into `dir`, creating it.
pub fn write_lock_files(dir: &Path, result: &ClaimResult) -> Result<(), ResourceError> {
    let io_err = |path: &Path, e: std::io::Error| ResourceError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    let name = dir.join(NAME_FILE);
    fs::write(&name, result.lock_name.as_str()).map_err(|e| io_err(&name, e))?;
    let metadata = dir.join(METADATA_FILE);
    fs::write(&metadata, &result.content).map_err(|e| io_err(&metadata, e))?;
    Ok(())
}

/// Read the lock name stored in `dir/name`.
pub fn read_lock_name(dir: &Path) -> Result<LockName, ResourceError> {
    let path = dir.join(NAME_FILE);
    let raw = fs::read_to_string(&path).map_err(|e| ResourceError::Io {
        path: path.clone(),
        message: e.to_string(),
    })?;
    LockName::new(raw.trim()).map_err(|e| ResourceError::InvalidField {
        field: "name",
        message: e.to_string(),
    })
}
