//! core::types
//!
//! Strong types for lock pool concepts.
//!
//! # Types
//!
//! - [`PoolName`] - Name of a pool directory at the root of the tree
//! - [`LockName`] - Name of a lock entry inside a pool
//! - [`Oid`] - Version identifier of a snapshot of the whole tree
//!
//! # Validation
//!
//! Pool and lock names become single path components in the store, so they
//! are rejected at construction time if they could escape or alias another
//! path (`/`, `..`, leading dots, control characters).
//!
//! # Examples
//!
//! ```
//! use lockpool::core::types::{LockName, Oid, PoolName};
//!
//! let pool = PoolName::new("lock-pool").unwrap();
//! let lock = LockName::new("some-lock").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//!
//! assert!(PoolName::new("a/b").is_err());
//! assert!(LockName::new(".gitkeep").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! # let _ = (pool, lock, oid);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid pool name: {0}")]
    InvalidPoolName(String),

    #[error("invalid lock name: {0}")]
    InvalidLockName(String),

    #[error("invalid version: {0}")]
    InvalidOid(String),
}

/// Check that `name` is usable as a single tree path component.
///
/// Returns a human-readable reason on failure.
fn validate_component(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name cannot be empty".into());
    }
    if name.starts_with('.') {
        return Err(format!("'{name}' cannot start with '.'"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(format!("'{name}' cannot contain path separators"));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err("name cannot contain control characters".into());
    }
    Ok(())
}

/// A validated pool name.
///
/// A pool is a top-level directory of the tree holding `unclaimed/` and
/// `claimed/` collections.
///
/// # Example
///
/// ```
/// use lockpool::core::types::PoolName;
///
/// let pool = PoolName::new("aws-environments").unwrap();
/// assert_eq!(pool.as_str(), "aws-environments");
///
/// assert!(PoolName::new("").is_err());
/// assert!(PoolName::new("..").is_err());
/// assert!(PoolName::new("nested/pool").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PoolName(String);

impl PoolName {
    /// Create a new validated pool name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPoolName` if the name is not a single,
    /// visible path component.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_component(&name).map_err(TypeError::InvalidPoolName)?;
        Ok(Self(name))
    }

    /// Get the pool name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PoolName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PoolName> for String {
    fn from(name: PoolName) -> Self {
        name.0
    }
}

impl AsRef<str> for PoolName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PoolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated lock name, unique within its pool.
///
/// Hidden names (leading `.`) are reserved for placeholders such as
/// `.gitkeep` and never name a lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LockName(String);

impl LockName {
    /// Create a new validated lock name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidLockName` if the name is not a single,
    /// visible path component.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_component(&name).map_err(TypeError::InvalidLockName)?;
        Ok(Self(name))
    }

    /// Check whether a directory entry name can be a lock at all.
    ///
    /// ```
    /// use lockpool::core::types::LockName;
    ///
    /// assert!(LockName::is_candidate("some-lock"));
    /// assert!(!LockName::is_candidate(".gitkeep"));
    /// ```
    pub fn is_candidate(name: &str) -> bool {
        validate_component(name).is_ok()
    }

    /// Get the lock name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LockName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<LockName> for String {
    fn from(name: LockName) -> Self {
        name.0
    }
}

impl AsRef<str> for LockName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LockName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A version identifier: the object id of a commit (SHA-1 or SHA-256 hex).
///
/// Versions are opaque to the pool logic and compare only by ancestry
/// through the store. They are normalized to lowercase.
///
/// # Example
///
/// ```
/// use lockpool::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not 40 or 64 hex
    /// characters.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().trim().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "version must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Create an id from a SHA-256 digest.
    pub(crate) fn from_sha256(digest: &[u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    /// Get an abbreviated form of the id, for log lines.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
