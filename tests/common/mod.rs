//! Shared fixtures for integration tests.
//!
//! Repositories are built with the `git` binary, independently of the code
//! under test, and published to a bare remote the store fetches from.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// A working repository plus the bare remote it publishes to.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Create a repository containing `lock-pool` with `some-lock`
    /// (`{"some":"json"}`) and `some-other-lock` unclaimed.
    pub fn lock_pool() -> Self {
        let repo = Self::empty();
        repo.write("lock-pool/unclaimed/.gitkeep", "");
        repo.write("lock-pool/claimed/.gitkeep", "");
        repo.write("lock-pool/unclaimed/some-lock", "{\"some\":\"json\"}\n");
        repo.write(
            "lock-pool/unclaimed/some-other-lock",
            "{\"some\":\"wrong-json\"}\n",
        );
        repo.commit_all("test-git-setup");
        repo.publish();
        repo
    }

    /// Create an empty working repository on branch `master`.
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let work = dir.path().join("work");
        std::fs::create_dir_all(&work).unwrap();

        run_git(&work, &["init"]);
        run_git(&work, &["symbolic-ref", "HEAD", "refs/heads/master"]);
        run_git(&work, &["config", "user.email", "test@example.com"]);
        run_git(&work, &["config", "user.name", "Test User"]);

        Self { dir }
    }

    /// Path of the working repository.
    pub fn work(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    /// Path of the bare remote.
    pub fn remote(&self) -> PathBuf {
        self.dir.path().join("remote.git")
    }

    /// Remote location as a string, for `source.uri`.
    pub fn uri(&self) -> String {
        self.remote().to_string_lossy().into_owned()
    }

    /// Scratch directory for workspaces and destinations.
    pub fn scratch(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn write(&self, path: &str, content: &str) {
        let full = self.work().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    pub fn commit_all(&self, message: &str) -> String {
        run_git(&self.work(), &["add", "-A"]);
        run_git(&self.work(), &["commit", "-m", message]);
        self.work_head()
    }

    /// Move a file with `git mv` and commit.
    pub fn git_mv(&self, src: &str, dst: &str, message: &str) -> String {
        run_git(&self.work(), &["mv", src, dst]);
        run_git(&self.work(), &["commit", "-m", message]);
        self.work_head()
    }

    /// (Re)create the bare remote from the working repository.
    pub fn publish(&self) {
        if self.remote().exists() {
            run_git(&self.work(), &["push", &self.uri(), "master"]);
        } else {
            run_git(
                self.dir.path(),
                &["clone", "--bare", "work", "remote.git"],
            );
        }
    }

    pub fn work_head(&self) -> String {
        git_output(&self.work(), &["rev-parse", "HEAD"])
    }

    /// Tip of `master` on the remote.
    pub fn remote_head(&self) -> String {
        git_output(&self.remote(), &["rev-parse", "master"])
    }

    /// File names under `dir` at the remote tip, hidden files excluded.
    pub fn remote_list(&self, dir: &str) -> Vec<String> {
        let listing = git_output(
            &self.remote(),
            &["ls-tree", "--name-only", &format!("master:{dir}")],
        );
        listing
            .lines()
            .filter(|name| !name.starts_with('.'))
            .map(String::from)
            .collect()
    }

    /// Contents of `path` at the remote tip.
    pub fn remote_read(&self, path: &str) -> String {
        git_output_raw(&self.remote(), &["show", &format!("master:{path}")])
    }

    /// Author line of a commit on the remote.
    pub fn remote_author(&self, rev: &str) -> String {
        git_output(&self.remote(), &["log", "-1", "--format=%an <%ae>", rev])
    }

    /// Full message of a commit on the remote.
    pub fn remote_message(&self, rev: &str) -> String {
        git_output(&self.remote(), &["log", "-1", "--format=%B", rev])
    }
}

/// Run a git command in the given directory.
pub fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

fn git_output_raw(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

fn git_output(dir: &Path, args: &[&str]) -> String {
    git_output_raw(dir, args).trim().to_string()
}
