//! Thin wrapper around the `git` command line.
//!
//! Every invocation runs with `LC_ALL=C` so that markers such as `[gone]` and
//! `remote ref does not exist` are stable regardless of the user's locale.
//! Parsing of git output lives in free functions so it can be tested without
//! a repository.

use crate::error::{GoneError, Result};

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Field separator used in `for-each-ref` formats (`%09` is a tab).
const FIELD_SEP: char = '\t';

const BRANCH_FORMAT: &str =
    "%(refname:strip=2)%09%(committerdate:iso)%09%(upstream)%09%(upstream:track)%09%(upstream:remotename)";
const TAG_FORMAT: &str = "%(refname:strip=2)%09%(committerdate:iso)%09%(*committerdate:iso)";

/// Tracking annotation emitted by git for a branch whose upstream was deleted.
const GONE_MARKER: &str = "[gone]";
/// Diagnostic printed by `git push --delete` when the remote branch is missing.
const REMOTE_REF_MISSING: &str = "remote ref does not exist";
/// Remote name git reports for an upstream that is a local branch.
const LOCAL_REMOTE: &str = ".";
/// Suffix `ls-remote` appends to the peeled entry of an annotated tag.
const PEELED_SUFFIX: &str = "^{}";

/// A branch on a named remote, as configured for upstream tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteBranch {
    pub remote: String,
    /// Branch name on the remote, which may differ from the local name.
    pub branch: String,
}

impl RemoteBranch {
    pub fn new(remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            branch: branch.into(),
        }
    }
}

impl fmt::Display for RemoteBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.remote, self.branch)
    }
}

/// One line of the local branch listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchListing {
    pub name: String,
    pub committer_date: Option<String>,
    /// Upstream on a real remote. Upstreams that are local branches
    /// (remote `.`) are not recorded.
    pub upstream: Option<RemoteBranch>,
    pub upstream_gone: bool,
}

/// One line of the local tag listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagListing {
    pub name: String,
    pub committer_date: Option<String>,
}

/// Handle for running git inside one working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.workdir)
            .env("LC_ALL", "C")
            .env("LANGUAGE", "C");
        cmd
    }

    fn output(&self, args: &[&str]) -> Result<Output> {
        debug!(workdir = %self.workdir.display(), "git {}", args.join(" "));
        self.command(args).output().map_err(GoneError::Spawn)
    }

    /// Run git and return stdout, or `GitCommand` carrying stderr on failure.
    pub fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if stderr.trim().is_empty() {
                stderr = String::from_utf8_lossy(&output.stdout).into_owned();
            }
            Err(GoneError::GitCommand {
                command: args.join(" "),
                stderr: stderr.trim().to_string(),
            })
        }
    }

    /// Run git and report only whether it exited successfully.
    pub fn succeeds(&self, args: &[&str]) -> bool {
        self.output(args)
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    pub fn is_inside_repository(&self) -> bool {
        self.succeeds(&["rev-parse", "--git-dir"])
    }

    pub fn toplevel(&self) -> Result<PathBuf> {
        let out = self.run(&["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(out.trim()))
    }

    /// Branch the remote's HEAD points at, if the symbolic ref exists.
    pub fn remote_head(&self, remote: &str) -> Option<String> {
        let symref = format!("refs/remotes/{remote}/HEAD");
        let out = self.run(&["symbolic-ref", "--quiet", &symref]).ok()?;
        parse_remote_head(&out, remote)
    }

    pub fn local_branch_exists(&self, name: &str) -> bool {
        let full = format!("refs/heads/{name}");
        self.succeeds(&["rev-parse", "--verify", "--quiet", &full])
    }

    /// Checked-out branch, or `None` when HEAD is detached.
    pub fn current_branch(&self) -> Option<String> {
        self.run(&["symbolic-ref", "--quiet", "--short", "HEAD"])
            .ok()
            .map(|out| out.trim().to_string())
            .filter(|name| !name.is_empty())
    }

    pub fn remotes(&self) -> Result<Vec<String>> {
        Ok(parse_lines(&self.run(&["remote"])?))
    }

    pub fn fetch_all_prune(&self) -> Result<()> {
        self.run(&["fetch", "--all", "--prune"]).map(|_| ())
    }

    pub fn remote_update_prune(&self) -> Result<()> {
        self.run(&["remote", "update", "--prune"]).map(|_| ())
    }

    pub fn list_branches(&self) -> Result<Vec<BranchListing>> {
        let format = format!("--format={BRANCH_FORMAT}");
        let out = self.run(&["for-each-ref", &format, "refs/heads"])?;
        Ok(out.lines().filter_map(parse_branch_line).collect())
    }

    /// Names of local branches reachable from `target`.
    pub fn list_merged_branches(&self, target: &str) -> Result<BTreeSet<String>> {
        let merged = format!("--merged={target}");
        let out = self.run(&[
            "for-each-ref",
            &merged,
            "--format=%(refname:strip=2)",
            "refs/heads",
        ])?;
        Ok(parse_lines(&out).into_iter().collect())
    }

    pub fn list_local_tags(&self) -> Result<Vec<TagListing>> {
        let format = format!("--format={TAG_FORMAT}");
        let out = self.run(&["for-each-ref", &format, "refs/tags"])?;
        Ok(out.lines().filter_map(parse_tag_line).collect())
    }

    pub fn list_remote_tags(&self, remote: &str) -> Result<BTreeSet<String>> {
        let out = self.run(&["ls-remote", "--tags", remote])?;
        Ok(parse_remote_tags(&out))
    }

    /// `git branch -d`, or `-D` when `force` is set.
    pub fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
        let flag = if force { "-D" } else { "-d" };
        self.run(&["branch", flag, name]).map(|_| ())
    }

    /// Delete `name` on `remote`. A missing remote ref is reported as
    /// `RemoteRefAlreadyAbsent` so callers can treat it as done.
    pub fn delete_remote_branch(&self, remote: &str, name: &str) -> Result<()> {
        match self.run(&["push", remote, "--delete", name]) {
            Ok(_) => Ok(()),
            Err(GoneError::GitCommand { stderr, .. }) if is_remote_ref_absent(&stderr) => {
                Err(GoneError::RemoteRefAlreadyAbsent {
                    remote: remote.to_string(),
                    name: name.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }

    pub fn delete_tag(&self, name: &str) -> Result<()> {
        self.run(&["tag", "-d", name]).map(|_| ())
    }
}

/// Non-empty, trimmed lines.
pub fn parse_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(field: Option<&str>) -> Option<String> {
    field
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn parse_branch_line(line: &str) -> Option<BranchListing> {
    let mut fields = line.split(FIELD_SEP);
    let name = non_empty(fields.next())?;
    let committer_date = non_empty(fields.next());
    let upstream_ref = non_empty(fields.next());
    let track = fields.next().unwrap_or("");
    let remote_name = non_empty(fields.next());

    let upstream = match (upstream_ref, remote_name) {
        (Some(full), Some(remote)) => parse_upstream(&full, &remote),
        _ => None,
    };

    Some(BranchListing {
        name,
        committer_date,
        upstream_gone: upstream.is_some() && track.contains(GONE_MARKER),
        upstream,
    })
}

/// Split `refs/remotes/<remote>/<branch>` into its parts. Local upstreams
/// (`.` / `refs/heads/...`) and refs outside the remote's namespace yield
/// `None`.
pub fn parse_upstream(full_ref: &str, remote: &str) -> Option<RemoteBranch> {
    if remote == LOCAL_REMOTE {
        return None;
    }
    let branch = full_ref
        .strip_prefix("refs/remotes/")?
        .strip_prefix(remote)?
        .strip_prefix('/')?;
    (!branch.is_empty()).then(|| RemoteBranch::new(remote, branch))
}

pub fn parse_tag_line(line: &str) -> Option<TagListing> {
    let mut fields = line.split(FIELD_SEP);
    let name = non_empty(fields.next())?;
    let own_date = non_empty(fields.next());
    // Annotated tags carry the commit date on the peeled object.
    let peeled_date = non_empty(fields.next());

    Some(TagListing {
        name,
        committer_date: own_date.or(peeled_date),
    })
}

/// Tag names from `git ls-remote --tags`, with peel suffixes stripped.
pub fn parse_remote_tags(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter_map(|refname| refname.strip_prefix("refs/tags/"))
        .map(|tag| tag.strip_suffix(PEELED_SUFFIX).unwrap_or(tag))
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_remote_head(output: &str, remote: &str) -> Option<String> {
    let symref = output.trim();
    let prefix = format!("refs/remotes/{remote}/");
    let name = match symref.strip_prefix(&prefix) {
        Some(name) => name,
        None => symref.rsplit('/').next()?,
    };
    (!name.is_empty()).then(|| name.to_string())
}

pub fn is_remote_ref_absent(diagnostic: &str) -> bool {
    diagnostic.contains(REMOTE_REF_MISSING)
}
