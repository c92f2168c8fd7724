//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations in the
//! pool. The working copy is always a bare repository: locks are moved by
//! rewriting trees and committing them directly, never through a checkout.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::RemoteUnreachable`]: Fetch or push transport failure
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::ObjectNotFound`]: Commit or object unknown to the repository
//! - [`GitError::PathNotFound`]: Tree path missing at a commit
//! - [`GitError::NotAFile`]: Tree path is not a blob
//!
//! # Example
//!
//! ```ignore
//! use lockpool::git::{Git, RemoteAuth};
//!
//! let git = Git::init_bare(workspace.path(), "/srv/pools.git")?;
//! let tip = git.fetch_branch("main", &RemoteAuth::default())?;
//! let names = git.list_tree(&tip, "lock-pool/unclaimed")?;
//! ```

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{Oid, TypeError};

/// Name of the only remote a workspace talks to.
pub const ORIGIN: &str = "origin";

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Fetch or push could not reach the remote (network, auth, bad URL).
    #[error("remote unreachable: {message}")]
    RemoteUnreachable {
        /// Transport error message
        message: String,
    },

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Tree path does not exist at the given commit.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The missing tree path
        path: String,
    },

    /// Tree path exists but is not a regular file.
    #[error("not a file: {path}")]
    NotAFile {
        /// The offending tree path
        path: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }

    fn internal(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }

    fn remote(err: git2::Error) -> Self {
        GitError::RemoteUnreachable {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            other => GitError::Internal {
                message: other.to_string(),
            },
        }
    }
}

/// Credentials offered to the remote.
#[derive(Debug, Clone, Default)]
pub struct RemoteAuth {
    /// Path to an SSH private key file
    pub private_key: Option<PathBuf>,
}

/// Commit author and committer identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

/// Result of pushing a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote branch now points at the pushed commit.
    Accepted,
    /// The remote refused the update because it has moved on.
    Rejected {
        /// Remote-provided reason
        reason: String,
    },
}

/// How a path differs between a commit and its first parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathChange {
    Added(String),
    Deleted(String),
    Modified(String),
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. All repository
/// reads and writes flow through this interface. No other module should
/// import `git2` directly.
///
/// # Publish Semantics
///
/// Pushes are never forced, so the remote accepts a commit only if it
/// descends from the remote's current tip. The pool uses that refusal as
/// its compare-and-swap.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Setup
    // =========================================================================

    /// Initialise a bare workspace at `dir` with `url` as its `origin`.
    ///
    /// Nothing is fetched yet; call [`Git::fetch_branch`].
    pub fn init_bare(dir: &Path, url: &str) -> Result<Self, GitError> {
        let repo = git2::Repository::init_bare(dir).map_err(|e| GitError::AccessError {
            message: format!("cannot initialise {}: {}", dir.display(), e.message()),
        })?;
        repo.remote(ORIGIN, url).map_err(|e| GitError::RemoteUnreachable {
            message: format!("invalid remote url '{}': {}", url, e.message()),
        })?;

        Ok(Self { repo })
    }

    // =========================================================================
    // Remote Operations
    // =========================================================================

    /// Fetch `branch` from `origin` and return its tip.
    ///
    /// The remote-tracking ref `refs/remotes/origin/<branch>` is force-updated.
    ///
    /// # Errors
    ///
    /// - [`GitError::RemoteUnreachable`] if the transport fails
    /// - [`GitError::RefNotFound`] if the remote has no such branch
    pub fn fetch_branch(&self, branch: &str, auth: &RemoteAuth) -> Result<Oid, GitError> {
        let mut remote = self.repo.find_remote(ORIGIN).map_err(GitError::remote)?;
        let refspec = format!("+refs/heads/{branch}:refs/remotes/{ORIGIN}/{branch}");

        let mut options = git2::FetchOptions::new();
        options.remote_callbacks(remote_callbacks(auth));
        remote
            .fetch(&[refspec.as_str()], Some(&mut options), None)
            .map_err(GitError::remote)?;

        self.resolve_ref(&format!("refs/remotes/{ORIGIN}/{branch}"))
    }

    /// Push `commit` to `branch` on `origin` without forcing.
    ///
    /// The local branch ref is moved to `commit` first so the push refspec
    /// can name it.
    ///
    /// # Errors
    ///
    /// - [`GitError::RemoteUnreachable`] if the transport fails for any
    ///   reason other than a non-fast-forward rejection
    pub fn push_branch(
        &self,
        commit: &Oid,
        branch: &str,
        auth: &RemoteAuth,
    ) -> Result<PushOutcome, GitError> {
        let local_ref = format!("refs/heads/{branch}");
        self.set_ref(&local_ref, commit, "lockpool: publish")?;

        let mut remote = self.repo.find_remote(ORIGIN).map_err(GitError::remote)?;
        let refspec = format!("{local_ref}:{local_ref}");

        let rejection: RefCell<Option<String>> = RefCell::new(None);
        let result = {
            let mut callbacks = remote_callbacks(auth);
            callbacks.push_update_reference(|_refname, status| {
                if let Some(reason) = status {
                    *rejection.borrow_mut() = Some(reason.to_string());
                }
                Ok(())
            });

            let mut options = git2::PushOptions::new();
            options.remote_callbacks(callbacks);
            remote.push(&[refspec.as_str()], Some(&mut options))
        };

        match result {
            Ok(()) => match rejection.into_inner() {
                Some(reason) => Ok(PushOutcome::Rejected { reason }),
                None => Ok(PushOutcome::Accepted),
            },
            Err(e) if is_non_fast_forward(&e) => Ok(PushOutcome::Rejected {
                reason: e.message().to_string(),
            }),
            Err(e) => Err(GitError::remote(e)),
        }
    }

    // =========================================================================
    // Ref Operations
    // =========================================================================

    /// Resolve a ref to its commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if the ref doesn't exist
    pub fn resolve_ref(&self, refname: &str) -> Result<Oid, GitError> {
        let reference = self
            .repo
            .find_reference(refname)
            .map_err(|e| GitError::from_git2(e, refname))?;
        let commit = reference
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, refname))?;
        Ok(Oid::new(commit.id().to_string())?)
    }

    /// Force a local ref to point at `oid`.
    pub fn set_ref(&self, refname: &str, oid: &Oid, message: &str) -> Result<(), GitError> {
        let target = to_git2(oid)?;
        self.repo
            .reference(refname, target, true, message)
            .map_err(|e| GitError::from_git2(e, refname))?;
        Ok(())
    }

    // =========================================================================
    // Tree Reads
    // =========================================================================

    /// List the entry names of the directory `path` at `commit`.
    ///
    /// An empty `path` lists the root. Returns `None` if the path does not
    /// exist or is not a directory.
    pub fn list_tree(&self, commit: &Oid, path: &str) -> Result<Option<Vec<String>>, GitError> {
        let root = self.commit_tree(commit)?;
        let tree = if path.is_empty() {
            root
        } else {
            match root.get_path(Path::new(path)) {
                Ok(entry) if entry.kind() == Some(git2::ObjectType::Tree) => self
                    .repo
                    .find_tree(entry.id())
                    .map_err(GitError::internal)?,
                Ok(_) => return Ok(None),
                Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
                Err(e) => return Err(GitError::internal(e)),
            }
        };

        let names = tree
            .iter()
            .filter_map(|entry| entry.name().map(String::from))
            .collect();
        Ok(Some(names))
    }

    /// Read the file at `path` as of `commit`.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the commit doesn't exist
    /// - [`GitError::PathNotFound`] if the path doesn't exist
    /// - [`GitError::NotAFile`] if the path is a directory or submodule
    pub fn read_file(&self, commit: &Oid, path: &str) -> Result<Vec<u8>, GitError> {
        let root = self.commit_tree(commit)?;
        let entry = root.get_path(Path::new(path)).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound => GitError::PathNotFound {
                path: path.to_string(),
            },
            _ => GitError::internal(e),
        })?;

        if entry.kind() != Some(git2::ObjectType::Blob) {
            return Err(GitError::NotAFile {
                path: path.to_string(),
            });
        }

        let blob = self
            .repo
            .find_blob(entry.id())
            .map_err(|e| GitError::from_git2(e, path))?;
        Ok(blob.content().to_vec())
    }

    // =========================================================================
    // Tree Writes
    // =========================================================================

    /// Get the root tree id of `commit`.
    pub fn tree_of(&self, commit: &Oid) -> Result<Oid, GitError> {
        let tree = self.commit_tree(commit)?;
        Ok(Oid::new(tree.id().to_string())?)
    }

    /// Produce a new tree equal to `tree` with the entry at `src` renamed to `dst`.
    ///
    /// The blob and its file mode are carried over unchanged. Directories left
    /// empty by the removal disappear from the new tree.
    ///
    /// # Errors
    ///
    /// - [`GitError::PathNotFound`] if `src` doesn't exist in `tree`
    /// - [`GitError::NotAFile`] if `src` is a directory
    pub fn rename_in_tree(&self, tree: &Oid, src: &str, dst: &str) -> Result<Oid, GitError> {
        let tree = self
            .repo
            .find_tree(to_git2(tree)?)
            .map_err(|e| GitError::from_git2(e, tree.as_str()))?;

        let entry = tree.get_path(Path::new(src)).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound => GitError::PathNotFound {
                path: src.to_string(),
            },
            _ => GitError::internal(e),
        })?;
        let mode = match entry.filemode() {
            0o100755 => git2::FileMode::BlobExecutable,
            0o120000 => git2::FileMode::Link,
            0o100644 | 0o100664 => git2::FileMode::Blob,
            _ => {
                return Err(GitError::NotAFile {
                    path: src.to_string(),
                })
            }
        };

        let mut update = git2::build::TreeUpdateBuilder::new();
        update.remove(src);
        update.upsert(dst, entry.id(), mode);
        let updated = update
            .create_updated(&self.repo, &tree)
            .map_err(GitError::internal)?;

        Ok(Oid::new(updated.to_string())?)
    }

    /// Create a commit of `tree` with a single `parent`.
    ///
    /// No ref is updated.
    pub fn commit(
        &self,
        tree: &Oid,
        parent: &Oid,
        message: &str,
        identity: &Identity,
    ) -> Result<Oid, GitError> {
        let tree = self
            .repo
            .find_tree(to_git2(tree)?)
            .map_err(|e| GitError::from_git2(e, tree.as_str()))?;
        let parent = self
            .repo
            .find_commit(to_git2(parent)?)
            .map_err(|e| GitError::from_git2(e, parent.as_str()))?;
        let signature =
            git2::Signature::now(&identity.name, &identity.email).map_err(GitError::internal)?;

        let oid = self
            .repo
            .commit(None, &signature, &signature, message, &tree, &[&parent])
            .map_err(GitError::internal)?;
        Ok(Oid::new(oid.to_string())?)
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Compare `commit` with its first parent.
    ///
    /// Root commits are compared with the empty tree.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the commit doesn't exist
    pub fn diff_with_parent(&self, commit: &Oid) -> Result<Vec<PathChange>, GitError> {
        let commit = self.find_commit(commit)?;
        let new_tree = commit.tree().map_err(GitError::internal)?;
        let old_tree = match commit.parent_count() {
            0 => None,
            _ => Some(
                commit
                    .parent(0)
                    .and_then(|p| p.tree())
                    .map_err(GitError::internal)?,
            ),
        };

        let diff = self
            .repo
            .diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), None)
            .map_err(GitError::internal)?;

        let mut changes = Vec::new();
        for delta in diff.deltas() {
            let old_path = delta.old_file().path().and_then(|p| p.to_str());
            let new_path = delta.new_file().path().and_then(|p| p.to_str());
            match (delta.status(), old_path, new_path) {
                (git2::Delta::Added, _, Some(path)) => {
                    changes.push(PathChange::Added(path.to_string()))
                }
                (git2::Delta::Deleted, Some(path), _) => {
                    changes.push(PathChange::Deleted(path.to_string()))
                }
                (git2::Delta::Renamed, Some(old), Some(new)) => {
                    changes.push(PathChange::Deleted(old.to_string()));
                    changes.push(PathChange::Added(new.to_string()));
                }
                (_, _, Some(path)) => changes.push(PathChange::Modified(path.to_string())),
                _ => {}
            }
        }
        Ok(changes)
    }

    /// Walk first-parent history from `tip`, newest first.
    ///
    /// Calls `visit` for each commit; the walk ends when `visit` returns
    /// `false` or the root is reached.
    pub fn walk_first_parent(
        &self,
        tip: &Oid,
        mut visit: impl FnMut(&Oid) -> Result<bool, GitError>,
    ) -> Result<(), GitError> {
        let mut revwalk = self.repo.revwalk().map_err(GitError::internal)?;
        revwalk.push(to_git2(tip)?).map_err(GitError::internal)?;
        revwalk.simplify_first_parent().map_err(GitError::internal)?;

        for oid in revwalk {
            let oid = Oid::new(oid.map_err(GitError::internal)?.to_string())?;
            if !visit(&oid)? {
                break;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn find_commit(&self, oid: &Oid) -> Result<git2::Commit<'_>, GitError> {
        self.repo
            .find_commit(to_git2(oid)?)
            .map_err(|e| match e.code() {
                git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                    oid: oid.to_string(),
                },
                _ => GitError::from_git2(e, oid.as_str()),
            })
    }

    fn commit_tree(&self, commit: &Oid) -> Result<git2::Tree<'_>, GitError> {
        self.find_commit(commit)?
            .tree()
            .map_err(GitError::internal)
    }
}

fn to_git2(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

fn is_non_fast_forward(err: &git2::Error) -> bool {
    err.code() == git2::ErrorCode::NotFastForward
        || err.message().contains("non-fastforwardable")
        || err.message().contains("not present locally")
}

fn remote_callbacks(auth: &RemoteAuth) -> git2::RemoteCallbacks<'_> {
    let mut callbacks = git2::RemoteCallbacks::new();
    if let Some(key) = auth.private_key.as_deref() {
        callbacks.credentials(move |_url, username, _allowed| {
            git2::Cred::ssh_key(username.unwrap_or("git"), None, key, None)
        });
    }
    callbacks
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    mod git_error {
        use super::*;

        #[test]
        fn display_formatting() {
            let err = GitError::RemoteUnreachable {
                message: "connection refused".to_string(),
            };
            assert!(err.to_string().contains("unreachable"));

            let err = GitError::PathNotFound {
                path: "pool/claimed/x".to_string(),
            };
            assert!(err.to_string().contains("pool/claimed/x"));
        }

        #[test]
        fn type_error_conversion() {
            let err: GitError = TypeError::InvalidOid("xyz".into()).into();
            assert!(matches!(err, GitError::InvalidOid { .. }));
        }
    }

    mod workspace {
        use super::*;

        #[test]
        fn init_bare_registers_origin() {
            let temp = TempDir::new().unwrap();
            let git = Git::init_bare(temp.path(), "/nonexistent/remote.git").unwrap();
            let remote = git.repo.find_remote(ORIGIN).unwrap();
            assert_eq!(remote.url(), Some("/nonexistent/remote.git"));
            assert!(git.repo.is_bare());
        }

        #[test]
        fn fetch_from_missing_remote_is_unreachable() {
            let temp = TempDir::new().unwrap();
            let missing = temp.path().join("missing.git");
            let workspace = temp.path().join("ws");

            let git = Git::init_bare(&workspace, missing.to_str().unwrap()).unwrap();
            let result = git.fetch_branch("main", &RemoteAuth::default());
            assert!(matches!(result, Err(GitError::RemoteUnreachable { .. })));
        }

        #[test]
        fn unknown_commit_is_object_not_found() {
            let temp = TempDir::new().unwrap();
            let git = Git::init_bare(temp.path(), "/nonexistent/remote.git").unwrap();
            let oid = Oid::new("1".repeat(40)).unwrap();

            assert!(matches!(
                git.diff_with_parent(&oid),
                Err(GitError::ObjectNotFound { .. })
            ));
        }
    }
}
