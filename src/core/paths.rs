//! core::paths
//!
//! Centralized routing for tree paths inside the pool store.
//!
//! # Layout
//!
//! ```text
//! <pool>/unclaimed/<lock>
//! <pool>/claimed/<lock>
//! ```
//!
//! Tree paths always use `/` as separator, independent of the host OS.
//! No code outside this module should format pool paths by hand.
//!
//! # Example
//!
//! ```
//! use lockpool::core::paths::{Collection, PoolPaths};
//! use lockpool::core::types::{LockName, PoolName};
//!
//! let paths = PoolPaths::new(PoolName::new("lock-pool").unwrap());
//! let lock = LockName::new("some-lock").unwrap();
//!
//! assert_eq!(paths.entry(Collection::Claimed, &lock), "lock-pool/claimed/some-lock");
//! ```

use crate::core::types::{LockName, PoolName};

/// One of the two collections a lock can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Available for claiming.
    Unclaimed,
    /// Held by a claimant.
    Claimed,
}

impl Collection {
    /// Directory name of the collection inside a pool.
    pub fn dir_name(self) -> &'static str {
        match self {
            Collection::Unclaimed => "unclaimed",
            Collection::Claimed => "claimed",
        }
    }

    /// The other collection.
    pub fn opposite(self) -> Self {
        match self {
            Collection::Unclaimed => Collection::Claimed,
            Collection::Claimed => Collection::Unclaimed,
        }
    }

    fn from_dir_name(name: &str) -> Option<Self> {
        match name {
            "unclaimed" => Some(Collection::Unclaimed),
            "claimed" => Some(Collection::Claimed),
            _ => None,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A tree path that names a lock entry, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryPath {
    pub pool: PoolName,
    pub collection: Collection,
    pub lock: LockName,
}

impl EntryPath {
    /// Parse `<pool>/<collection>/<lock>`.
    ///
    /// Returns `None` for anything else, including hidden placeholder files.
    ///
    /// ```
    /// use lockpool::core::paths::{Collection, EntryPath};
    ///
    /// let parsed = EntryPath::parse("lock-pool/unclaimed/some-lock").unwrap();
    /// assert_eq!(parsed.collection, Collection::Unclaimed);
    /// assert!(EntryPath::parse("lock-pool/unclaimed/.gitkeep").is_none());
    /// assert!(EntryPath::parse("README.md").is_none());
    /// ```
    pub fn parse(path: &str) -> Option<Self> {
        let mut parts = path.split('/');
        let pool = parts.next()?;
        let collection = parts.next()?;
        let lock = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            pool: PoolName::new(pool).ok()?,
            collection: Collection::from_dir_name(collection)?,
            lock: LockName::new(lock).ok()?,
        })
    }
}

/// Path routing for a single pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolPaths {
    pool: PoolName,
}

impl PoolPaths {
    /// Create path routing for `pool`.
    pub fn new(pool: PoolName) -> Self {
        Self { pool }
    }

    /// The pool this routing belongs to.
    pub fn pool(&self) -> &PoolName {
        &self.pool
    }

    /// The pool's root directory (`<pool>`).
    pub fn root(&self) -> &str {
        self.pool.as_str()
    }

    /// A collection directory (`<pool>/<collection>`).
    pub fn collection(&self, collection: Collection) -> String {
        format!("{}/{}", self.pool, collection.dir_name())
    }

    /// A lock entry (`<pool>/<collection>/<lock>`).
    pub fn entry(&self, collection: Collection, lock: &LockName) -> String {
        format!("{}/{}/{}", self.pool, collection.dir_name(), lock)
    }

    /// Prefix matching every path inside the pool (`<pool>/`).
    pub fn prefix(&self) -> String {
        format!("{}/", self.pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> PoolPaths {
        PoolPaths::new(PoolName::new("lock-pool").unwrap())
    }

    #[test]
    fn collection_dirs() {
        let paths = paths();
        assert_eq!(paths.collection(Collection::Unclaimed), "lock-pool/unclaimed");
        assert_eq!(paths.collection(Collection::Claimed), "lock-pool/claimed");
        assert_eq!(paths.prefix(), "lock-pool/");
    }

    #[test]
    fn entry_round_trips_through_parse() {
        let lock = LockName::new("some-lock").unwrap();
        let path = paths().entry(Collection::Claimed, &lock);
        let parsed = EntryPath::parse(&path).unwrap();

        assert_eq!(parsed.pool.as_str(), "lock-pool");
        assert_eq!(parsed.collection, Collection::Claimed);
        assert_eq!(parsed.lock, lock);
    }

    #[test]
    fn parse_rejects_other_shapes() {
        assert!(EntryPath::parse("lock-pool/unclaimed").is_none());
        assert!(EntryPath::parse("lock-pool/elsewhere/x").is_none());
        assert!(EntryPath::parse("lock-pool/claimed/x/y").is_none());
        assert!(EntryPath::parse("").is_none());
    }

    #[test]
    fn opposite_collection() {
        assert_eq!(Collection::Claimed.opposite(), Collection::Unclaimed);
        assert_eq!(Collection::Unclaimed.opposite(), Collection::Claimed);
    }
}
