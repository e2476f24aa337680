#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Run git in `dir`, panicking with its stderr on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("LC_ALL", "C")
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .output()
        .expect("git should be installed");
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A scratch repository with one commit on `main`, optionally backed by a
/// bare repository registered as `origin`.
pub struct TestRepo {
    pub dir: TempDir,
    pub remote: Option<TempDir>,
    commits: usize,
}

impl TestRepo {
    pub fn new() -> Self {
        Self::with_initial_branch("main")
    }

    pub fn with_initial_branch(branch: &str) -> Self {
        let dir = tempdir().unwrap();
        let path = dir.path();
        git(path, &["init", "-q"]);
        git(path, &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")]);
        git(path, &["config", "user.email", "test@example.com"]);
        git(path, &["config", "user.name", "Test"]);
        git(path, &["config", "commit.gpgsign", "false"]);
        git(path, &["config", "tag.gpgsign", "false"]);

        let mut repo = Self {
            dir,
            remote: None,
            commits: 0,
        };
        repo.commit("initial");
        repo
    }

    /// Repository on `main` with a bare `origin` that has `main` pushed and
    /// `origin/HEAD` pointing at it.
    pub fn with_remote() -> Self {
        let mut repo = Self::new();
        let remote = tempdir().unwrap();
        git(remote.path(), &["init", "-q", "--bare"]);
        git(remote.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);

        let url = remote.path().to_string_lossy().into_owned();
        git(repo.path(), &["remote", "add", "origin", &url]);
        git(repo.path(), &["push", "-q", "-u", "origin", "main"]);
        git(repo.path(), &["remote", "set-head", "origin", "main"]);
        repo.remote = Some(remote);
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git(&self, args: &[&str]) -> String {
        git(self.path(), args)
    }

    pub fn commit(&mut self, message: &str) {
        self.commits += 1;
        let file = format!("file{}.txt", self.commits);
        fs::write(self.path().join(&file), message).unwrap();
        self.git(&["add", &file]);
        self.git(&["commit", "-q", "-m", message]);
    }

    /// Create `name` from `main` with one commit, then return to `main`.
    pub fn branch_with_commit(&mut self, name: &str) {
        self.git(&["checkout", "-q", "-b", name]);
        self.commit(&format!("work on {name}"));
        self.git(&["checkout", "-q", "main"]);
    }

    pub fn merge(&self, name: &str) {
        self.git(&["merge", "-q", "--no-ff", "-m", &format!("merge {name}"), name]);
    }

    pub fn push_tracking(&self, name: &str) {
        self.git(&["push", "-q", "-u", "origin", name]);
    }

    /// Delete `name` on the remote so the local upstream shows as gone.
    pub fn delete_on_remote(&self, name: &str) {
        self.git(&["push", "-q", "origin", "--delete", name]);
    }

    pub fn local_branches(&self) -> Vec<String> {
        self.git(&["for-each-ref", "--format=%(refname:strip=2)", "refs/heads"])
            .lines()
            .map(String::from)
            .collect()
    }

    pub fn local_tags(&self) -> Vec<String> {
        self.git(&["tag", "--list"]).lines().map(String::from).collect()
    }

    /// The scenario used throughout the tests:
    ///
    /// - `feature-done`: merged into `main`, pushed, upstream present
    /// - `feature-ghost`: merged, pushed, upstream deleted on the remote
    /// - `feature-wip`: unmerged, never pushed
    pub fn scenario() -> Self {
        let mut repo = Self::with_remote();

        repo.branch_with_commit("feature-done");
        repo.merge("feature-done");
        repo.push_tracking("feature-done");

        repo.branch_with_commit("feature-ghost");
        repo.merge("feature-ghost");
        repo.push_tracking("feature-ghost");
        repo.delete_on_remote("feature-ghost");

        repo.branch_with_commit("feature-wip");
        repo
    }
}
