//! pool::coordinator
//!
//! Claim and release with optimistic concurrency.
//!
//! # Algorithm
//!
//! Each attempt works on fresh state:
//!
//! ```text
//! sync -> list unclaimed -> pick at random -> read -> move -> snapshot -> publish
//! ```
//!
//! A publish conflict means another claimant got there first. The attempt
//! is abandoned, the store resyncs, and the next attempt re-derives its move
//! from the new head. The store's refusal to publish on a stale base is the
//! only mutual exclusion involved.
//!
//! # Invariants
//!
//! - Nothing is published unless the lock's payload was readable
//! - Any failure after a local mutation resyncs the store
//! - An empty pool fails without mutating the store (unless `wait_for_lock`)

use rand::Rng;
use uuid::Uuid;

use crate::core::paths::{Collection, PoolPaths};
use crate::core::types::{LockName, Oid, PoolName};
use crate::store::{PublishOutcome, StoreError, VersionedTreeStore};
use crate::ui::output::{self, Verbosity};

use super::cancel::CancelToken;
use super::errors::PoolError;
use super::retry::RetryPolicy;

/// A lock obtained by a claim, or recovered from a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimResult {
    pub lock_name: LockName,
    pub pool_name: PoolName,
    /// Raw payload of the lock entry
    pub content: Vec<u8>,
    /// Version that moved the lock
    pub version: Oid,
}

impl ClaimResult {
    /// Payload as text, if it is valid UTF-8.
    pub fn content_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// Outcome of one attempt.
enum Step<T> {
    Done(T),
    Conflict,
    Empty,
}

/// Claims and releases locks through a [`VersionedTreeStore`].
///
/// The store is a private working copy; the randomness source picks among
/// unclaimed locks so racing claimants spread out.
///
/// # Example
///
/// ```
/// use lockpool::core::types::PoolName;
/// use lockpool::pool::{LockPoolCoordinator, RetryPolicy};
/// use lockpool::store::MemoryRemote;
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let remote = MemoryRemote::new();
/// remote.commit_files("setup", &[("envs/unclaimed/a", "{}")]);
///
/// let mut coordinator = LockPoolCoordinator::new(remote.handle(), StdRng::seed_from_u64(1))
///     .with_policy(RetryPolicy::immediate(3));
/// let pool = PoolName::new("envs").unwrap();
///
/// let claimed = coordinator.claim(&pool).unwrap();
/// assert_eq!(claimed.lock_name.as_str(), "a");
/// coordinator.release(&pool, &claimed.lock_name).unwrap();
/// ```
#[derive(Debug)]
pub struct LockPoolCoordinator<S, R> {
    store: S,
    rng: R,
    policy: RetryPolicy,
    cancel: CancelToken,
    verbosity: Verbosity,
    /// Recorded in every commit so racing claimants never produce identical versions
    claimant: String,
}

impl<S: VersionedTreeStore, R: Rng> LockPoolCoordinator<S, R> {
    /// Create a coordinator with the default retry policy.
    pub fn new(store: S, rng: R) -> Self {
        Self {
            store,
            rng,
            policy: RetryPolicy::default(),
            cancel: CancelToken::new(),
            verbosity: Verbosity::Quiet,
            claimant: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Identifier written into this coordinator's commits.
    pub fn claimant(&self) -> &str {
        &self.claimant
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Claim one unclaimed lock from `pool`.
    ///
    /// # Errors
    ///
    /// - `PoolNotFound` if the pool directory is missing
    /// - `NoLocksAvailable` if nothing is unclaimed
    /// - `CorruptEntry` if the picked lock cannot be read
    /// - `LockContention` if every attempt lost a publish race
    pub fn claim(&mut self, pool: &PoolName) -> Result<ClaimResult, PoolError> {
        let paths = PoolPaths::new(pool.clone());
        self.with_retries(&paths, |this, head| this.try_claim(&paths, head))
    }

    /// Return `lock` to the unclaimed set of `pool`.
    ///
    /// Conflicts retry the same move against the new head.
    pub fn release(&mut self, pool: &PoolName, lock: &LockName) -> Result<Oid, PoolError> {
        let paths = PoolPaths::new(pool.clone());
        self.with_retries(&paths, |this, _head| this.try_release(&paths, lock))
    }

    /// Drive `attempt` until it finishes, the budget runs out, or the token
    /// is cancelled.
    fn with_retries<T>(
        &mut self,
        paths: &PoolPaths,
        mut attempt: impl FnMut(&mut Self, &Oid) -> Result<Step<T>, PoolError>,
    ) -> Result<T, PoolError> {
        let attempts = self.policy.attempts();
        let mut last = Step::<()>::Conflict;

        for n in 1..=attempts {
            if self.cancel.is_cancelled() {
                self.discard();
                return Err(PoolError::Cancelled);
            }

            let head = self.store.sync()?;
            output::debug(
                format!("attempt {n}/{attempts}: synced to {}", head.short(12)),
                self.verbosity,
            );

            match attempt(self, &head) {
                Ok(Step::Done(value)) => return Ok(value),
                Ok(Step::Conflict) => {
                    output::debug("publish conflict, remote advanced", self.verbosity);
                    last = Step::Conflict;
                }
                Ok(Step::Empty) => {
                    if !self.policy.wait_for_lock {
                        return Err(PoolError::NoLocksAvailable {
                            pool: paths.pool().to_string(),
                        });
                    }
                    output::info(
                        format!("no locks available in '{}', waiting", paths.pool()),
                        self.verbosity,
                    );
                    last = Step::Empty;
                }
                Err(e) => {
                    self.discard();
                    return Err(e);
                }
            }

            if n < attempts {
                let delay = self.policy.delay_for(n);
                output::debug(format!("retrying in {delay:?}"), self.verbosity);
                if !self.cancel.sleep(delay) {
                    self.discard();
                    return Err(PoolError::Cancelled);
                }
            }
        }

        self.discard();
        Err(match last {
            Step::Empty => PoolError::NoLocksAvailable {
                pool: paths.pool().to_string(),
            },
            _ => PoolError::LockContention {
                pool: paths.pool().to_string(),
                attempts,
            },
        })
    }

    fn try_claim(&mut self, paths: &PoolPaths, head: &Oid) -> Result<Step<ClaimResult>, PoolError> {
        let candidates = self.entries(paths, Collection::Unclaimed)?;
        if candidates.is_empty() {
            output::debug(format!("pool '{}' is empty", paths.pool()), self.verbosity);
            return Ok(Step::Empty);
        }

        let lock = candidates[self.rng.random_range(0..candidates.len())].clone();
        output::debug(
            format!("picked '{lock}' of {} unclaimed", candidates.len()),
            self.verbosity,
        );

        let src = paths.entry(Collection::Unclaimed, &lock);
        let content = self.store.read(&src, head).map_err(|e| match e {
            StoreError::NotAFile(_) | StoreError::PathNotFound(_) => PoolError::CorruptEntry {
                path: src.clone(),
                reason: e.to_string(),
            },
            other => other.into(),
        })?;

        let dst = paths.entry(Collection::Claimed, &lock);
        match self.transition(&src, &dst, &format!("claiming: {lock}"))? {
            Some(version) => Ok(Step::Done(ClaimResult {
                lock_name: lock,
                pool_name: paths.pool().clone(),
                content,
                version,
            })),
            None => Ok(Step::Conflict),
        }
    }

    fn try_release(&mut self, paths: &PoolPaths, lock: &LockName) -> Result<Step<Oid>, PoolError> {
        let claimed = self.entries(paths, Collection::Claimed)?;
        if !claimed.contains(lock) {
            return Err(PoolError::LockNotClaimed {
                pool: paths.pool().to_string(),
                lock: lock.to_string(),
            });
        }

        let src = paths.entry(Collection::Claimed, lock);
        let dst = paths.entry(Collection::Unclaimed, lock);
        match self.transition(&src, &dst, &format!("unclaiming: {lock}"))? {
            Some(version) => Ok(Step::Done(version)),
            None => Ok(Step::Conflict),
        }
    }

    /// Move, snapshot and publish. `None` means the publish conflicted.
    fn transition(&mut self, src: &str, dst: &str, subject: &str) -> Result<Option<Oid>, PoolError> {
        self.store.move_entry(src, dst)?;
        output::debug(format!("moved {src} -> {dst}"), self.verbosity);

        let message = format!("{subject}\n\nclaimant: {}", self.claimant);
        let version = self.store.snapshot(&message)?;
        output::debug(format!("snapshot {}", version.short(12)), self.verbosity);

        match self.store.publish(&version)? {
            PublishOutcome::Published => {
                output::debug(format!("published {}", version.short(12)), self.verbosity);
                Ok(Some(version))
            }
            PublishOutcome::Conflict => Ok(None),
        }
    }

    /// Lock names in one collection of the pool.
    fn entries(&self, paths: &PoolPaths, collection: Collection) -> Result<Vec<LockName>, PoolError> {
        if self.store.list(paths.root())?.is_none() {
            return Err(PoolError::PoolNotFound {
                pool: paths.pool().to_string(),
            });
        }

        let names = self
            .store
            .list(&paths.collection(collection))?
            .unwrap_or_default();
        let mut locks = Vec::with_capacity(names.len());
        for name in names {
            if name.starts_with('.') {
                continue;
            }
            match LockName::new(name.as_str()) {
                Ok(lock) => locks.push(lock),
                Err(e) => output::warn(
                    format!(
                        "skipping '{}' in {}: {e}",
                        name.escape_debug(),
                        paths.collection(collection)
                    ),
                    self.verbosity,
                ),
            }
        }
        Ok(locks)
    }

    /// Drop local changes so nothing unpublished outlives the call.
    fn discard(&mut self) {
        if let Err(e) = self.store.sync() {
            output::debug(format!("resync after failure failed: {e}"), self.verbosity);
        }
    }
}
