//! store::git_store
//!
//! [`VersionedTreeStore`] backed by a git branch.
//!
//! # Workspace
//!
//! Each store owns a bare repository inside a caller-provided workspace
//! directory. The workspace is private to one invocation and can be thrown
//! away afterwards; nothing is shared through the local filesystem.
//!
//! ```text
//! <workspace>/repo         bare repository, remote `origin`
//! <workspace>/private_key  optional SSH key (mode 0600)
//! ```
//!
//! # Mapping
//!
//! | Store operation | Git                                                   |
//! |-----------------|-------------------------------------------------------|
//! | `sync`          | fetch `<branch>`, reset local head to the fetched tip |
//! | `move_entry`    | rewrite the staged tree                               |
//! | `snapshot`      | commit the staged tree on the local head              |
//! | `publish`       | non-forced push; non-fast-forward means conflict      |

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::types::Oid;
use crate::git::{Git, GitError, Identity, PathChange, PushOutcome, RemoteAuth};

use super::{History, PublishOutcome, StoreError, TreeDiff, VersionedTreeStore};

/// Where and how a [`GitTreeStore`] reaches its replica.
#[derive(Debug, Clone)]
pub struct GitStoreOptions {
    /// Remote repository URL or path
    pub uri: String,
    /// Branch holding the pools
    pub branch: String,
    /// SSH private key contents, if the remote needs one
    pub private_key: Option<String>,
    /// Identity recorded on claim and release commits
    pub identity: Identity,
}

/// A git-backed pool store.
#[derive(Debug)]
pub struct GitTreeStore {
    git: Git,
    branch: String,
    auth: RemoteAuth,
    identity: Identity,
    /// Local head; `None` until the first sync
    head: Option<Oid>,
    /// Tree with staged moves applied, if any
    staged: Option<Oid>,
}

impl GitTreeStore {
    /// Prepare a store inside `workspace`.
    ///
    /// No network access happens until [`VersionedTreeStore::sync`].
    pub fn open(workspace: &Path, options: GitStoreOptions) -> Result<Self, StoreError> {
        let auth = RemoteAuth {
            private_key: match &options.private_key {
                Some(key) => Some(write_private_key(workspace, key)?),
                None => None,
            },
        };
        let git = Git::init_bare(&workspace.join("repo"), &options.uri).map_err(map_git)?;

        Ok(Self {
            git,
            branch: options.branch,
            auth,
            identity: options.identity,
            head: None,
            staged: None,
        })
    }

    /// The branch this store publishes to.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    fn head(&self) -> Result<&Oid, StoreError> {
        self.head
            .as_ref()
            .ok_or_else(|| StoreError::Internal("store has not been synced".to_string()))
    }
}

impl VersionedTreeStore for GitTreeStore {
    fn sync(&mut self) -> Result<Oid, StoreError> {
        let tip = self
            .git
            .fetch_branch(&self.branch, &self.auth)
            .map_err(|e| match e {
                GitError::RefNotFound { .. } => StoreError::BranchNotFound(self.branch.clone()),
                other => map_git(other),
            })?;
        self.git
            .set_ref(
                &format!("refs/heads/{}", self.branch),
                &tip,
                "lockpool: sync",
            )
            .map_err(map_git)?;

        self.head = Some(tip.clone());
        self.staged = None;
        Ok(tip)
    }

    fn list(&self, path: &str) -> Result<Option<Vec<String>>, StoreError> {
        self.git.list_tree(self.head()?, path).map_err(map_git)
    }

    fn move_entry(&mut self, src: &str, dst: &str) -> Result<(), StoreError> {
        let base = match &self.staged {
            Some(tree) => tree.clone(),
            None => self.git.tree_of(self.head()?).map_err(map_git)?,
        };
        let updated = self.git.rename_in_tree(&base, src, dst).map_err(map_git)?;
        self.staged = Some(updated);
        Ok(())
    }

    fn snapshot(&mut self, message: &str) -> Result<Oid, StoreError> {
        let tree = self.staged.take().ok_or(StoreError::NothingStaged)?;
        let commit = self
            .git
            .commit(&tree, self.head()?, message, &self.identity)
            .map_err(map_git)?;
        self.head = Some(commit.clone());
        Ok(commit)
    }

    fn publish(&mut self, version: &Oid) -> Result<PublishOutcome, StoreError> {
        match self
            .git
            .push_branch(version, &self.branch, &self.auth)
            .map_err(map_git)?
        {
            PushOutcome::Accepted => Ok(PublishOutcome::Published),
            PushOutcome::Rejected { .. } => Ok(PublishOutcome::Conflict),
        }
    }

    fn read(&self, path: &str, version: &Oid) -> Result<Vec<u8>, StoreError> {
        self.git.read_file(version, path).map_err(map_git)
    }

    fn diff(&self, version: &Oid) -> Result<TreeDiff, StoreError> {
        let mut diff = TreeDiff::default();
        for change in self.git.diff_with_parent(version).map_err(map_git)? {
            match change {
                PathChange::Added(path) => diff.added.push(path),
                PathChange::Deleted(path) => diff.removed.push(path),
                PathChange::Modified(path) => diff.modified.push(path),
            }
        }
        Ok(diff)
    }

    fn history(&self, prefix: &str, stop_at: Option<&Oid>) -> Result<History, StoreError> {
        let mut history = History::default();
        let mut failure = None;

        self.git
            .walk_first_parent(self.head()?, |oid| {
                if stop_at == Some(oid) {
                    history.reached_stop = true;
                    return Ok(false);
                }
                match self.diff(oid) {
                    Ok(diff) if diff.touches(prefix) => history.versions.push(oid.clone()),
                    Ok(_) => {}
                    Err(e) => {
                        failure = Some(e);
                        return Ok(false);
                    }
                }
                Ok(true)
            })
            .map_err(map_git)?;

        match failure {
            Some(e) => Err(e),
            None => Ok(history),
        }
    }
}

/// Translate git failures into store failures.
fn map_git(err: GitError) -> StoreError {
    match err {
        GitError::RemoteUnreachable { message } => StoreError::Unreachable(message),
        GitError::ObjectNotFound { oid } => StoreError::VersionNotFound(oid),
        GitError::PathNotFound { path } => StoreError::PathNotFound(path),
        GitError::NotAFile { path } => StoreError::NotAFile(path),
        GitError::RefNotFound { refname } => StoreError::BranchNotFound(refname),
        other => StoreError::Internal(other.to_string()),
    }
}

/// Store the key where libgit2 can read it, readable only by us.
fn write_private_key(workspace: &Path, key: &str) -> Result<PathBuf, StoreError> {
    let path = workspace.join("private_key");
    let mut contents = key.to_string();
    if !contents.ends_with('\n') {
        contents.push('\n');
    }
    fs::write(&path, contents)
        .map_err(|e| StoreError::Internal(format!("cannot write private key: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
            .map_err(|e| StoreError::Internal(format!("cannot protect private key: {e}")))?;
    }

    Ok(path)
}
