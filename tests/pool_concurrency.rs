//! Many claimants racing on one replica.
//!
//! Every thread holds its own store handle, so each publish is a
//! compare-and-swap against the shared head and losers must resync.

use std::collections::BTreeSet;
use std::thread;

use rand::rngs::StdRng;
use rand::SeedableRng;

use lockpool::core::types::{LockName, PoolName};
use lockpool::pool::{LockPoolCoordinator, RetryPolicy};
use lockpool::store::MemoryRemote;

fn pool() -> PoolName {
    PoolName::new("lock-pool").unwrap()
}

fn seeded(locks: usize) -> MemoryRemote {
    let remote = MemoryRemote::new();
    let names: Vec<String> = (0..locks).map(|i| format!("lock-{i}")).collect();
    let files: Vec<(String, String)> = names
        .iter()
        .map(|name| (format!("lock-pool/unclaimed/{name}"), format!("payload {name}")))
        .collect();
    let borrowed: Vec<(&str, &str)> = files
        .iter()
        .map(|(path, content)| (path.as_str(), content.as_str()))
        .collect();
    remote.commit_files("setup", &borrowed);
    remote
}

#[test]
fn concurrent_claims_are_disjoint() {
    let remote = seeded(8);

    let handles: Vec<_> = (0..8u64)
        .map(|seed| {
            let store = remote.handle();
            thread::spawn(move || {
                LockPoolCoordinator::new(store, StdRng::seed_from_u64(seed))
                    .with_policy(RetryPolicy::immediate(50))
                    .claim(&pool())
            })
        })
        .collect();

    let claimed: Vec<LockName> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap().lock_name)
        .collect();

    let unique: BTreeSet<_> = claimed.iter().cloned().collect();
    assert_eq!(unique.len(), 8, "a lock was granted twice: {claimed:?}");
    assert!(remote.list("lock-pool/unclaimed").is_empty());
    assert_eq!(remote.list("lock-pool/claimed").len(), 8);
    assert_eq!(remote.publish_count(), 8);
}

#[test]
fn more_claimants_than_locks() {
    let remote = seeded(3);

    let handles: Vec<_> = (0..6u64)
        .map(|seed| {
            let store = remote.handle();
            thread::spawn(move || {
                LockPoolCoordinator::new(store, StdRng::seed_from_u64(seed))
                    .with_policy(RetryPolicy::immediate(50))
                    .claim(&pool())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: BTreeSet<_> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|c| c.lock_name.clone())
        .collect();
    let losers = results.iter().filter(|r| r.is_err()).count();

    assert_eq!(winners.len(), 3);
    assert_eq!(losers, 3);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.code(), "NoLocksAvailable");
    }
    assert_eq!(remote.list("lock-pool/claimed").len(), 3);
}

#[test]
fn claim_and_release_cycles_preserve_the_pool() {
    let remote = seeded(4);

    let handles: Vec<_> = (0..4u64)
        .map(|seed| {
            let store = remote.handle();
            thread::spawn(move || {
                let mut coordinator =
                    LockPoolCoordinator::new(store, StdRng::seed_from_u64(seed))
                        .with_policy(RetryPolicy::immediate(100));
                for _ in 0..5 {
                    let claimed = coordinator.claim(&pool())?;
                    coordinator.release(&pool(), &claimed.lock_name)?;
                }
                Ok::<_, lockpool::pool::PoolError>(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(remote.list("lock-pool/unclaimed").len(), 4);
    assert!(remote.list("lock-pool/claimed").is_empty());
    assert_eq!(remote.publish_count(), 40);
    for i in 0..4 {
        let path = format!("lock-pool/unclaimed/lock-{i}");
        assert_eq!(
            remote.read_head(&path),
            Some(format!("payload lock-{i}").into_bytes())
        );
    }
}
