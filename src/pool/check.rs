//! pool::check
//!
//! New versions of a pool since a known one.
//!
//! Only versions whose diff touches the pool count. The result is oldest
//! first. When `since` is still in history it comes first; when it is
//! unknown (history rewritten, or first check) only the latest version is
//! returned.

use crate::core::paths::PoolPaths;
use crate::core::types::{Oid, PoolName};
use crate::store::VersionedTreeStore;

use super::errors::PoolError;

/// List pool versions newer than `since`, oldest first.
pub fn list_versions<S: VersionedTreeStore>(
    store: &mut S,
    pool: &PoolName,
    since: Option<&Oid>,
) -> Result<Vec<Oid>, PoolError> {
    store.sync()?;
    let prefix = PoolPaths::new(pool.clone()).prefix();
    let history = store.history(&prefix, since)?;

    match since {
        Some(since) if history.reached_stop => {
            let mut versions = vec![since.clone()];
            versions.extend(history.versions.into_iter().rev());
            Ok(versions)
        }
        _ => Ok(history.versions.into_iter().take(1).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRemote;

    fn pool() -> PoolName {
        PoolName::new("lock-pool").unwrap()
    }

    #[test]
    fn first_check_returns_latest_pool_version() {
        let remote = MemoryRemote::new();
        remote.commit_files("setup", &[("lock-pool/unclaimed/a", "a")]);
        let latest = remote.commit_files("add b", &[("lock-pool/unclaimed/b", "b")]);
        remote.commit_files("docs", &[("README", "hi")]);

        let versions = list_versions(&mut remote.handle(), &pool(), None).unwrap();
        assert_eq!(versions, vec![latest]);
    }

    #[test]
    fn check_since_lists_newer_versions_oldest_first() {
        let remote = MemoryRemote::new();
        let first = remote.commit_files("setup", &[("lock-pool/unclaimed/a", "a")]);
        let second = remote.commit_files("add b", &[("lock-pool/unclaimed/b", "b")]);
        remote.commit_files("other pool", &[("other/unclaimed/x", "x")]);
        let third = remote.commit_files("add c", &[("lock-pool/unclaimed/c", "c")]);

        let versions = list_versions(&mut remote.handle(), &pool(), Some(&first)).unwrap();
        assert_eq!(versions, vec![first, second, third]);
    }

    #[test]
    fn check_at_head_returns_only_that_version() {
        let remote = MemoryRemote::new();
        let head = remote.commit_files("setup", &[("lock-pool/unclaimed/a", "a")]);

        let versions = list_versions(&mut remote.handle(), &pool(), Some(&head)).unwrap();
        assert_eq!(versions, vec![head]);
    }

    #[test]
    fn unknown_since_falls_back_to_latest() {
        let remote = MemoryRemote::new();
        let latest = remote.commit_files("setup", &[("lock-pool/unclaimed/a", "a")]);
        let gone = Oid::new("a".repeat(64)).unwrap();

        let versions = list_versions(&mut remote.handle(), &pool(), Some(&gone)).unwrap();
        assert_eq!(versions, vec![latest]);
    }

    #[test]
    fn untouched_pool_has_no_versions() {
        let remote = MemoryRemote::new();
        remote.commit_files("setup", &[("README", "hi")]);

        let versions = list_versions(&mut remote.handle(), &pool(), None).unwrap();
        assert!(versions.is_empty());
    }
}
