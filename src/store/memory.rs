//! store::memory
//!
//! In-memory replica implementing [`VersionedTreeStore`] for deterministic
//! testing.
//!
//! # Design
//!
//! A [`MemoryRemote`] plays the shared replica: a commit graph plus a head,
//! behind `Arc<Mutex<...>>` so any number of [`MemoryStore`] handles (one per
//! simulated claimant, possibly on different threads) can race against it.
//! Publishing is a compare-and-swap on the head.
//!
//! Version ids are SHA-256 digests of parent, message and tree, so they look
//! like git's SHA-256 object ids and are stable across runs.
//!
//! Failure scenarios:
//! - [`MemoryRemote::set_offline`] makes `sync` and `publish` unreachable
//! - [`MemoryRemote::before_next_publish`] runs a closure (typically a rival
//!   claim) right before the next publish is decided
//!
//! # Example
//!
//! ```
//! use lockpool::store::{MemoryRemote, PublishOutcome, VersionedTreeStore};
//!
//! let remote = MemoryRemote::new();
//! remote.commit_files("setup", &[("pool/unclaimed/a", "x")]);
//!
//! let mut first = remote.handle();
//! let mut second = remote.handle();
//! first.sync().unwrap();
//! second.sync().unwrap();
//!
//! first.move_entry("pool/unclaimed/a", "pool/claimed/a").unwrap();
//! second.move_entry("pool/unclaimed/a", "pool/claimed/a").unwrap();
//! let v1 = first.snapshot("claiming: a").unwrap();
//! let v2 = second.snapshot("claiming: a (rival)").unwrap();
//!
//! assert_eq!(first.publish(&v1).unwrap(), PublishOutcome::Published);
//! assert_eq!(second.publish(&v2).unwrap(), PublishOutcome::Conflict);
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};

use crate::core::types::Oid;

use super::{History, PublishOutcome, StoreError, TreeDiff, VersionedTreeStore};

/// File contents keyed by tree path.
type Files = BTreeMap<String, Vec<u8>>;

/// Closure run before a publish is decided.
type PublishHook = Box<dyn FnOnce(&MemoryRemote) + Send>;

#[derive(Debug, Clone)]
struct MemCommit {
    parent: Option<Oid>,
    message: String,
    files: Files,
}

#[derive(Default)]
struct RemoteState {
    commits: HashMap<Oid, MemCommit>,
    head: Option<Oid>,
    offline: bool,
    hooks: VecDeque<PublishHook>,
    publishes: usize,
}

/// Shared in-memory replica.
///
/// Cloning yields another reference to the same replica.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl std::fmt::Debug for MemoryRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MemoryRemote")
            .field("head", &state.head)
            .field("commits", &state.commits.len())
            .field("offline", &state.offline)
            .finish()
    }
}

impl MemoryRemote {
    /// Create an empty replica (no head yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a local working copy of this replica.
    pub fn handle(&self) -> MemoryStore {
        MemoryStore {
            remote: self.clone(),
            head: None,
            files: Files::new(),
            staged: false,
            local: HashMap::new(),
            operations: RefCell::new(Vec::new()),
        }
    }

    /// Commit text `files` (created or overwritten) directly on the replica head.
    pub fn commit_files(&self, message: &str, files: &[(&str, &str)]) -> Oid {
        self.commit_change(message, |tree| {
            for (path, content) in files {
                tree.insert((*path).to_string(), content.as_bytes().to_vec());
            }
        })
    }

    /// Commit an arbitrary change directly on the replica head.
    pub fn commit_change(&self, message: &str, change: impl FnOnce(&mut Files)) -> Oid {
        let mut state = self.lock();
        let mut files = state
            .head
            .as_ref()
            .and_then(|head| state.commits.get(head))
            .map(|c| c.files.clone())
            .unwrap_or_default();
        change(&mut files);

        let parent = state.head.clone();
        let id = commit_id(parent.as_ref(), message, &files);
        state.commits.insert(
            id.clone(),
            MemCommit {
                parent,
                message: message.to_string(),
                files,
            },
        );
        state.head = Some(id.clone());
        id
    }

    /// Current head of the replica.
    pub fn head(&self) -> Option<Oid> {
        self.lock().head.clone()
    }

    /// Entry names under `path` at the replica head.
    pub fn list(&self, path: &str) -> Vec<String> {
        let state = self.lock();
        state
            .head
            .as_ref()
            .and_then(|head| state.commits.get(head))
            .and_then(|commit| list_dir(&commit.files, path))
            .unwrap_or_default()
    }

    /// File contents at the replica head.
    pub fn read_head(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.lock();
        let head = state.head.as_ref()?;
        state.commits.get(head)?.files.get(path).cloned()
    }

    /// Message of a commit on the replica.
    pub fn message(&self, version: &Oid) -> Option<String> {
        self.lock().commits.get(version).map(|c| c.message.clone())
    }

    /// Simulate the replica being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Run `hook` right before the next publish (from any handle) is decided.
    pub fn before_next_publish(&self, hook: impl FnOnce(&MemoryRemote) + Send + 'static) {
        self.lock().hooks.push_back(Box::new(hook));
    }

    /// Number of successful publishes through handles.
    pub fn publish_count(&self) -> usize {
        self.lock().publishes
    }

    fn lock(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn find(&self, version: &Oid) -> Option<MemCommit> {
        self.lock().commits.get(version).cloned()
    }
}

/// An operation performed through a [`MemoryStore`], for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    Sync,
    List(String),
    Move { src: String, dst: String },
    Snapshot(String),
    Publish(Oid),
    Read(String),
    Diff(Oid),
    History(String),
}

/// A private working copy of a [`MemoryRemote`].
#[derive(Debug)]
pub struct MemoryStore {
    remote: MemoryRemote,
    head: Option<Oid>,
    files: Files,
    staged: bool,
    /// Snapshots not yet published
    local: HashMap<Oid, MemCommit>,
    operations: RefCell<Vec<StoreOperation>>,
}

impl MemoryStore {
    /// Operations performed so far, in order.
    pub fn operations(&self) -> Vec<StoreOperation> {
        self.operations.borrow().clone()
    }

    /// Check whether any mutating operation (move, snapshot, publish) happened.
    pub fn has_mutated(&self) -> bool {
        self.operations.borrow().iter().any(|op| {
            matches!(
                op,
                StoreOperation::Move { .. }
                    | StoreOperation::Snapshot(_)
                    | StoreOperation::Publish(_)
            )
        })
    }

    fn record(&self, op: StoreOperation) {
        self.operations.borrow_mut().push(op);
    }

    fn find(&self, version: &Oid) -> Option<MemCommit> {
        self.local
            .get(version)
            .cloned()
            .or_else(|| self.remote.find(version))
    }

    fn require_head(&self) -> Result<&Oid, StoreError> {
        self.head
            .as_ref()
            .ok_or_else(|| StoreError::Internal("store has not been synced".to_string()))
    }
}

impl VersionedTreeStore for MemoryStore {
    fn sync(&mut self) -> Result<Oid, StoreError> {
        self.record(StoreOperation::Sync);
        let state = self.remote.lock();
        if state.offline {
            return Err(StoreError::Unreachable("memory remote is offline".to_string()));
        }
        let head = state
            .head
            .clone()
            .ok_or_else(|| StoreError::BranchNotFound("memory".to_string()))?;
        let files = state
            .commits
            .get(&head)
            .map(|c| c.files.clone())
            .unwrap_or_default();
        drop(state);

        self.head = Some(head.clone());
        self.files = files;
        self.staged = false;
        self.local.clear();
        Ok(head)
    }

    fn list(&self, path: &str) -> Result<Option<Vec<String>>, StoreError> {
        self.record(StoreOperation::List(path.to_string()));
        self.require_head()?;
        Ok(list_dir(&self.files, path))
    }

    fn move_entry(&mut self, src: &str, dst: &str) -> Result<(), StoreError> {
        self.record(StoreOperation::Move {
            src: src.to_string(),
            dst: dst.to_string(),
        });
        self.require_head()?;

        let content = match self.files.remove(src) {
            Some(content) => content,
            None if is_dir(&self.files, src) => return Err(StoreError::NotAFile(src.to_string())),
            None => return Err(StoreError::PathNotFound(src.to_string())),
        };
        self.files.insert(dst.to_string(), content);
        self.staged = true;
        Ok(())
    }

    fn snapshot(&mut self, message: &str) -> Result<Oid, StoreError> {
        self.record(StoreOperation::Snapshot(message.to_string()));
        if !self.staged {
            return Err(StoreError::NothingStaged);
        }
        let parent = self.require_head()?.clone();

        let id = commit_id(Some(&parent), message, &self.files);
        self.local.insert(
            id.clone(),
            MemCommit {
                parent: Some(parent),
                message: message.to_string(),
                files: self.files.clone(),
            },
        );
        self.head = Some(id.clone());
        self.staged = false;
        Ok(id)
    }

    fn publish(&mut self, version: &Oid) -> Result<PublishOutcome, StoreError> {
        self.record(StoreOperation::Publish(version.clone()));

        let hook = {
            let mut state = self.remote.lock();
            if state.offline {
                return Err(StoreError::Unreachable("memory remote is offline".to_string()));
            }
            state.hooks.pop_front()
        };
        if let Some(hook) = hook {
            hook(&self.remote);
        }

        let commit = self
            .local
            .get(version)
            .cloned()
            .ok_or_else(|| StoreError::VersionNotFound(version.to_string()))?;

        let mut state = self.remote.lock();
        if state.head != commit.parent {
            return Ok(PublishOutcome::Conflict);
        }
        state.commits.insert(version.clone(), commit);
        state.head = Some(version.clone());
        state.publishes += 1;
        Ok(PublishOutcome::Published)
    }

    fn read(&self, path: &str, version: &Oid) -> Result<Vec<u8>, StoreError> {
        self.record(StoreOperation::Read(path.to_string()));
        let commit = self
            .find(version)
            .ok_or_else(|| StoreError::VersionNotFound(version.to_string()))?;

        match commit.files.get(path) {
            Some(content) => Ok(content.clone()),
            None if is_dir(&commit.files, path) => Err(StoreError::NotAFile(path.to_string())),
            None => Err(StoreError::PathNotFound(path.to_string())),
        }
    }

    fn diff(&self, version: &Oid) -> Result<TreeDiff, StoreError> {
        self.record(StoreOperation::Diff(version.clone()));
        let commit = self
            .find(version)
            .ok_or_else(|| StoreError::VersionNotFound(version.to_string()))?;
        let parent_files = match &commit.parent {
            Some(parent) => self
                .find(parent)
                .map(|p| p.files)
                .ok_or_else(|| StoreError::Internal(format!("missing parent {parent}")))?,
            None => Files::new(),
        };

        let mut diff = TreeDiff::default();
        for (path, content) in &commit.files {
            match parent_files.get(path) {
                None => diff.added.push(path.clone()),
                Some(old) if old != content => diff.modified.push(path.clone()),
                Some(_) => {}
            }
        }
        for path in parent_files.keys() {
            if !commit.files.contains_key(path) {
                diff.removed.push(path.clone());
            }
        }
        Ok(diff)
    }

    fn history(&self, prefix: &str, stop_at: Option<&Oid>) -> Result<History, StoreError> {
        self.record(StoreOperation::History(prefix.to_string()));
        let mut history = History::default();
        let mut cursor = Some(self.require_head()?.clone());

        while let Some(version) = cursor {
            if stop_at == Some(&version) {
                history.reached_stop = true;
                break;
            }
            let commit = self
                .find(&version)
                .ok_or_else(|| StoreError::VersionNotFound(version.to_string()))?;
            if self.diff(&version)?.touches(prefix) {
                history.versions.push(version.clone());
            }
            cursor = commit.parent;
        }
        Ok(history)
    }
}

/// Immediate children of the directory `path`, or `None` if it has none.
fn list_dir(files: &Files, path: &str) -> Option<Vec<String>> {
    let prefix = if path.is_empty() {
        String::new()
    } else {
        format!("{}/", path.trim_end_matches('/'))
    };

    let names: BTreeSet<String> = files
        .keys()
        .filter_map(|key| key.strip_prefix(&prefix))
        .filter_map(|rest| rest.split('/').next())
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect();

    if names.is_empty() {
        None
    } else {
        Some(names.into_iter().collect())
    }
}

fn is_dir(files: &Files, path: &str) -> bool {
    let prefix = format!("{path}/");
    files.keys().any(|key| key.starts_with(&prefix))
}

/// Content-address a commit.
fn commit_id(parent: Option<&Oid>, message: &str, files: &Files) -> Oid {
    let mut hasher = Sha256::new();
    hasher.update(parent.map(Oid::as_str).unwrap_or("root").as_bytes());
    hasher.update([0]);
    hasher.update(message.as_bytes());
    hasher.update([0]);
    for (path, content) in files {
        hasher.update(path.as_bytes());
        hasher.update((content.len() as u64).to_be_bytes());
        hasher.update(content);
    }
    let digest: [u8; 32] = hasher.finalize().into();
    Oid::from_sha256(&digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryRemote {
        let remote = MemoryRemote::new();
        remote.commit_files(
            "setup",
            &[
                ("pool/unclaimed/.gitkeep", ""),
                ("pool/claimed/.gitkeep", ""),
                ("pool/unclaimed/a", "alpha"),
                ("pool/unclaimed/b", "beta"),
            ],
        );
        remote
    }

    mod listing {
        use super::*;

        #[test]
        fn lists_immediate_children() {
            let remote = seeded();
            let mut store = remote.handle();
            store.sync().unwrap();

            assert_eq!(
                store.list("pool/unclaimed").unwrap(),
                Some(vec![".gitkeep".to_string(), "a".to_string(), "b".to_string()])
            );
            assert_eq!(
                store.list("pool").unwrap(),
                Some(vec!["claimed".to_string(), "unclaimed".to_string()])
            );
            assert_eq!(store.list("").unwrap(), Some(vec!["pool".to_string()]));
        }

        #[test]
        fn missing_path_is_none() {
            let remote = seeded();
            let mut store = remote.handle();
            store.sync().unwrap();

            assert_eq!(store.list("other").unwrap(), None);
            // a file is not a directory
            assert_eq!(store.list("pool/unclaimed/a").unwrap(), None);
        }

        #[test]
        fn list_before_sync_fails() {
            let store = seeded().handle();
            assert!(store.list("pool").is_err());
        }
    }

    mod publishing {
        use super::*;

        #[test]
        fn publish_advances_remote_head() {
            let remote = seeded();
            let mut store = remote.handle();
            store.sync().unwrap();

            store.move_entry("pool/unclaimed/a", "pool/claimed/a").unwrap();
            let version = store.snapshot("claiming: a").unwrap();

            assert_eq!(store.publish(&version).unwrap(), PublishOutcome::Published);
            assert_eq!(remote.head(), Some(version.clone()));
            assert_eq!(remote.read_head("pool/claimed/a"), Some(b"alpha".to_vec()));
            assert_eq!(remote.message(&version).as_deref(), Some("claiming: a"));
            assert_eq!(remote.publish_count(), 1);
        }

        #[test]
        fn stale_base_conflicts() {
            let remote = seeded();
            let mut store = remote.handle();
            store.sync().unwrap();
            remote.commit_files("unrelated", &[("README", "hi")]);

            store.move_entry("pool/unclaimed/a", "pool/claimed/a").unwrap();
            let version = store.snapshot("claiming: a").unwrap();

            assert_eq!(store.publish(&version).unwrap(), PublishOutcome::Conflict);
            assert_eq!(remote.list("pool/claimed"), vec![".gitkeep".to_string()]);
        }

        #[test]
        fn hook_runs_before_publish() {
            let remote = seeded();
            let mut store = remote.handle();
            store.sync().unwrap();
            remote.before_next_publish(|remote| {
                remote.commit_files("rival", &[("pool/claimed/b", "beta")]);
            });

            store.move_entry("pool/unclaimed/a", "pool/claimed/a").unwrap();
            let version = store.snapshot("claiming: a").unwrap();

            assert_eq!(store.publish(&version).unwrap(), PublishOutcome::Conflict);
        }

        #[test]
        fn hooks_run_in_queue_order() {
            let remote = seeded();
            let order = Arc::new(Mutex::new(Vec::new()));
            for i in 0..2 {
                let order = Arc::clone(&order);
                remote.before_next_publish(move |_| order.lock().unwrap().push(i));
            }

            for _ in 0..2 {
                let mut store = remote.handle();
                store.sync().unwrap();
                store.move_entry("pool/unclaimed/a", "pool/claimed/a").unwrap();
                let version = store.snapshot("claiming: a").unwrap();
                store.publish(&version).unwrap();
                remote.commit_change("reset", |files| {
                    if let Some(content) = files.remove("pool/claimed/a") {
                        files.insert("pool/unclaimed/a".to_string(), content);
                    }
                });
            }

            assert_eq!(*order.lock().unwrap(), vec![0, 1]);
        }

        #[test]
        fn offline_remote_is_unreachable() {
            let remote = seeded();
            let mut store = remote.handle();
            remote.set_offline(true);

            assert!(matches!(store.sync(), Err(StoreError::Unreachable(_))));
        }

        #[test]
        fn sync_discards_local_changes() {
            let remote = seeded();
            let mut store = remote.handle();
            store.sync().unwrap();
            store.move_entry("pool/unclaimed/a", "pool/claimed/a").unwrap();
            store.snapshot("claiming: a").unwrap();

            store.sync().unwrap();
            assert_eq!(
                store.list("pool/claimed").unwrap(),
                Some(vec![".gitkeep".to_string()])
            );
        }

        #[test]
        fn empty_remote_has_no_branch() {
            let mut store = MemoryRemote::new().handle();
            assert!(matches!(store.sync(), Err(StoreError::BranchNotFound(_))));
        }
    }

    mod reading {
        use super::*;

        #[test]
        fn diff_reports_rename_as_add_and_remove() {
            let remote = seeded();
            let mut store = remote.handle();
            store.sync().unwrap();
            store.move_entry("pool/unclaimed/b", "pool/claimed/b").unwrap();
            let version = store.snapshot("claiming: b").unwrap();

            let diff = store.diff(&version).unwrap();
            assert_eq!(diff.added, vec!["pool/claimed/b".to_string()]);
            assert_eq!(diff.removed, vec!["pool/unclaimed/b".to_string()]);
            assert!(diff.modified.is_empty());
        }

        #[test]
        fn read_distinguishes_missing_and_directories() {
            let remote = seeded();
            let mut store = remote.handle();
            let head = store.sync().unwrap();

            assert!(matches!(
                store.read("pool/unclaimed", &head),
                Err(StoreError::NotAFile(_))
            ));
            assert!(matches!(
                store.read("pool/unclaimed/zzz", &head),
                Err(StoreError::PathNotFound(_))
            ));
            let unknown = Oid::new("0".repeat(64)).unwrap();
            assert!(matches!(
                store.read("pool/unclaimed/a", &unknown),
                Err(StoreError::VersionNotFound(_))
            ));
        }

        #[test]
        fn history_stops_at_version() {
            let remote = seeded();
            let first = remote.commit_files("touch pool", &[("pool/unclaimed/c", "c")]);
            remote.commit_files("elsewhere", &[("docs/readme", "r")]);
            let third = remote.commit_files("touch pool again", &[("pool/unclaimed/d", "d")]);

            let mut store = remote.handle();
            store.sync().unwrap();

            let history = store.history("pool/", Some(&first)).unwrap();
            assert!(history.reached_stop);
            assert_eq!(history.versions, vec![third]);

            let all = store.history("pool/", None).unwrap();
            assert!(!all.reached_stop);
            assert_eq!(all.versions.len(), 3);
        }

        #[test]
        fn operations_are_recorded() {
            let remote = seeded();
            let mut store = remote.handle();
            store.sync().unwrap();
            store.list("pool/unclaimed").unwrap();

            assert_eq!(
                store.operations(),
                vec![
                    StoreOperation::Sync,
                    StoreOperation::List("pool/unclaimed".to_string())
                ]
            );
            assert!(!store.has_mutated());
        }
    }
}
