//! pool::resolver
//!
//! Recover the lock a version claimed (or released) without mutating
//! anything.
//!
//! A claim version differs from its parent by exactly one rename
//! `<pool>/unclaimed/<lock>` -> `<pool>/claimed/<lock>`. The resolver finds
//! that rename in the diff and reads the payload as of the version. Anything
//! else (zero renames, several, a different pool) is ambiguous.

use std::collections::BTreeSet;

use crate::core::paths::{Collection, EntryPath, PoolPaths};
use crate::core::types::{LockName, Oid, PoolName};
use crate::store::{StoreError, TreeDiff, VersionedTreeStore};
use crate::ui::output::{self, Verbosity};

use super::coordinator::ClaimResult;
use super::errors::PoolError;

/// Direction of a lock move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// unclaimed -> claimed
    Claim,
    /// claimed -> unclaimed
    Release,
}

impl Transition {
    fn from(self) -> Collection {
        match self {
            Transition::Claim => Collection::Unclaimed,
            Transition::Release => Collection::Claimed,
        }
    }

    fn to(self) -> Collection {
        self.from().opposite()
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Claim => write!(f, "claim"),
            Transition::Release => write!(f, "release"),
        }
    }
}

/// Resolves versions back into lock identities.
#[derive(Debug)]
pub struct ClaimResolver<S> {
    store: S,
    verbosity: Verbosity,
}

impl<S: VersionedTreeStore> ClaimResolver<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            verbosity: Verbosity::Quiet,
        }
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Recover the lock claimed by `version`.
    ///
    /// # Errors
    ///
    /// - `AmbiguousVersion` unless the version claims exactly one lock of `pool`
    /// - `VersionNotFound` if the store does not know the version
    pub fn resolve(&mut self, pool: &PoolName, version: &Oid) -> Result<ClaimResult, PoolError> {
        self.resolve_transition(pool, version, Transition::Claim)
    }

    /// Recover the lock moved by `version`, claim or release.
    pub fn resolve_any(
        &mut self,
        pool: &PoolName,
        version: &Oid,
    ) -> Result<(Transition, ClaimResult), PoolError> {
        match self.resolve_transition(pool, version, Transition::Claim) {
            Ok(result) => Ok((Transition::Claim, result)),
            Err(PoolError::AmbiguousVersion { found: 0, .. }) => {
                output::debug(
                    format!("{} is not a claim, trying release", version.short(12)),
                    self.verbosity,
                );
                let result = self.resolve_transition(pool, version, Transition::Release)?;
                Ok((Transition::Release, result))
            }
            Err(e) => Err(e),
        }
    }

    /// Find the one pool in which `version` moved a lock.
    ///
    /// Lets callers resolve a version without knowing its pool up front.
    pub fn infer_pool(&mut self, version: &Oid) -> Result<PoolName, PoolError> {
        self.store.sync()?;
        let diff = self.store.diff(version)?;

        let arrived: Vec<EntryPath> = diff
            .added
            .iter()
            .filter_map(|p| EntryPath::parse(p))
            .collect();
        let pools: BTreeSet<PoolName> = diff
            .removed
            .iter()
            .filter_map(|p| EntryPath::parse(p))
            .filter(|left| {
                arrived.iter().any(|to| {
                    to.pool == left.pool
                        && to.lock == left.lock
                        && to.collection == left.collection.opposite()
                })
            })
            .map(|e| e.pool)
            .collect();

        let found = pools.len();
        match pools.into_iter().next() {
            Some(pool) if found == 1 => Ok(pool),
            _ => Err(PoolError::AmbiguousVersion {
                version: version.to_string(),
                found,
            }),
        }
    }

    /// Recover the lock moved by `version` in the given direction.
    pub fn resolve_transition(
        &mut self,
        pool: &PoolName,
        version: &Oid,
        transition: Transition,
    ) -> Result<ClaimResult, PoolError> {
        self.store.sync()?;
        let diff = self.store.diff(version)?;

        let moved = moved_locks(pool, &diff, transition);
        output::debug(
            format!(
                "{} moves {} lock(s) by {transition}",
                version.short(12),
                moved.len()
            ),
            self.verbosity,
        );
        let lock = match moved.as_slice() {
            [lock] => lock.clone(),
            _ => {
                return Err(PoolError::AmbiguousVersion {
                    version: version.to_string(),
                    found: moved.len(),
                })
            }
        };

        let path = PoolPaths::new(pool.clone()).entry(transition.to(), &lock);
        let content = self.store.read(&path, version).map_err(|e| match e {
            StoreError::NotAFile(_) | StoreError::PathNotFound(_) => PoolError::CorruptEntry {
                path: path.clone(),
                reason: e.to_string(),
            },
            other => other.into(),
        })?;

        Ok(ClaimResult {
            lock_name: lock,
            pool_name: pool.clone(),
            content,
            version: version.clone(),
        })
    }
}

/// Locks of `pool` that left `transition.from()` and arrived in `transition.to()`.
fn moved_locks(pool: &PoolName, diff: &TreeDiff, transition: Transition) -> Vec<LockName> {
    let in_pool = |path: &String, collection: Collection| {
        EntryPath::parse(path)
            .filter(|e| &e.pool == pool && e.collection == collection)
            .map(|e| e.lock)
    };

    let left: BTreeSet<LockName> = diff
        .removed
        .iter()
        .filter_map(|p| in_pool(p, transition.from()))
        .collect();

    diff.added
        .iter()
        .filter_map(|p| in_pool(p, transition.to()))
        .filter(|lock| left.contains(lock))
        .collect()
}
