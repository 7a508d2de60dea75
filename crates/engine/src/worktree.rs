// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent git worktrees.
//!
//! Each isolated agent instance gets `<city_root>/worktrees/<rig>/<agent>`
//! on a private branch. Removal is gated on three safety flags so work that
//! exists nowhere else is never destroyed without an explicit force.

use async_trait::async_trait;
use gc_adapters::subprocess::{run_with_timeout, stderr_text, stdout_text, GIT_TIMEOUT};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Directory under the city root holding all managed worktrees.
pub const WORKTREES_DIR: &str = "worktrees";

/// Fallback when the remote's default branch cannot be determined.
pub const FALLBACK_DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Error)]
pub enum WorktreeError {
    #[error("git {command} failed: {message}")]
    Git { command: &'static str, message: String },
    #[error("refusing to remove {}: {flags}", path.display())]
    Unsafe { path: PathBuf, flags: SafetyFlags },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A checked-out worktree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    pub path: PathBuf,
    /// Empty when the branch of a reused worktree could not be read
    pub branch: String,
}

/// Reasons a worktree must not be discarded. A check that fails counts as
/// set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SafetyFlags {
    /// Uncommitted changes, including untracked files
    pub dirty: bool,
    /// Commits reachable from HEAD but from no remote-tracking ref
    pub unpushed: bool,
    /// Entries in the stash
    pub stashed: bool,
}

impl SafetyFlags {
    pub fn any(&self) -> bool {
        self.dirty || self.unpushed || self.stashed
    }
}

impl fmt::Display for SafetyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<&str> = [
            (self.dirty, "uncommitted changes"),
            (self.unpushed, "unpushed commits"),
            (self.stashed, "stashed changes"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect();
        if set.is_empty() {
            f.write_str("clean")
        } else {
            f.write_str(&set.join(", "))
        }
    }
}

/// A configured rig: name and repository path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RigRef {
    pub name: String,
    pub path: PathBuf,
}

impl RigRef {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), path: path.into() }
    }
}

/// Outcome of [`WorktreeManager::sweep`].
#[derive(Debug, Default)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
    pub skipped: Vec<(PathBuf, SafetyFlags)>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Worktree operations needed while materializing and starting agents.
#[async_trait]
pub trait WorktreeProvider: Clone + Send + Sync + 'static {
    /// Create (or reuse) the worktree for `agent` in `rig`.
    async fn ensure(
        &self,
        repo_dir: &Path,
        city_root: &Path,
        rig: &str,
        agent: &str,
    ) -> Result<Worktree, WorktreeError>;

    /// Bring a worktree up to date with its remote. Never fails.
    async fn sync(&self, path: &Path);
}

/// Git CLI-backed worktree manager.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorktreeManager;

/// Build a git command rooted at `dir`, isolated from inherited repo env.
fn git(dir: &Path) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("git");
    cmd.arg("-C").arg(dir).env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
    cmd
}

async fn run_git(
    dir: &Path,
    args: &[&str],
    command: &'static str,
) -> Result<Output, WorktreeError> {
    let mut cmd = git(dir);
    cmd.args(args);
    run_with_timeout(cmd, GIT_TIMEOUT, command)
        .await
        .map_err(|e| WorktreeError::Git { command, message: e.to_string() })
}

/// Like [`run_git`] but a non-zero exit is an error; returns trimmed stdout.
async fn git_ok(dir: &Path, args: &[&str], command: &'static str) -> Result<String, WorktreeError> {
    let output = run_git(dir, args, command).await?;
    if !output.status.success() {
        return Err(WorktreeError::Git { command, message: stderr_text(&output) });
    }
    Ok(stdout_text(&output))
}

/// Lowercase base-36 rendering.
pub fn base36(mut n: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// `gc/<agent>-<base36 unix nanos>`
pub fn branch_name(agent: &str, nanos: u128) -> String {
    format!("gc/{}-{}", agent, base36(nanos))
}

pub fn worktree_path(city_root: &Path, rig: &str, agent: &str) -> PathBuf {
    city_root.join(WORKTREES_DIR).join(rig).join(agent)
}

impl WorktreeManager {
    pub fn new() -> Self {
        Self
    }

    /// Check the three safety flags.
    pub async fn safety(&self, path: &Path) -> SafetyFlags {
        let dirty = match git_ok(path, &["status", "--porcelain"], "status").await {
            Ok(out) => !out.is_empty(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "dirty check failed");
                true
            }
        };
        let unpushed =
            match git_ok(path, &["rev-list", "--count", "HEAD", "--not", "--remotes"], "rev-list")
                .await
            {
                Ok(out) => !matches!(out.parse::<u64>(), Ok(0)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unpushed check failed");
                    true
                }
            };
        let stashed = match self.own_stashes(path).await {
            Ok(count) => count > 0,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "stash check failed");
                true
            }
        };
        SafetyFlags { dirty, unpushed, stashed }
    }

    /// Remove a worktree. Refuses when any safety flag is set unless
    /// `force`. Stale worktree metadata is pruned either way.
    pub async fn remove(&self, repo_dir: &Path, path: &Path, force: bool) -> Result<(), WorktreeError> {
        if !path.exists() {
            self.prune(repo_dir).await;
            return Ok(());
        }

        if !force {
            let flags = self.safety(path).await;
            if flags.any() {
                tracing::warn!(path = %path.display(), %flags, "worktree has unsaved work, not removing");
                return Err(WorktreeError::Unsafe { path: path.to_path_buf(), flags });
            }
        }

        let path_str = path.display().to_string();
        let removed =
            git_ok(repo_dir, &["worktree", "remove", "--force", &path_str], "worktree remove").await;
        if let Err(e) = removed {
            tracing::warn!(path = %path_str, error = %e, "git worktree remove failed, deleting directory");
            if path.exists() {
                tokio::fs::remove_dir_all(path).await?;
            }
        }

        self.prune(repo_dir).await;
        tracing::info!(path = %path_str, "worktree removed");
        Ok(())
    }

    /// Remove worktrees of rigs that are no longer configured, and clean
    /// worktrees of configured rigs.
    pub async fn sweep(&self, city_root: &Path, rigs: &[RigRef]) -> SweepReport {
        let mut report = SweepReport::default();
        let base = city_root.join(WORKTREES_DIR);

        for rig_dir in list_dirs(&base).await {
            let rig_name = rig_dir.file_name().map(|n| n.to_string_lossy().into_owned());
            let rig = rig_name.as_deref().and_then(|name| rigs.iter().find(|r| r.name == name));

            let Some(rig) = rig else {
                match tokio::fs::remove_dir_all(&rig_dir).await {
                    Ok(()) => {
                        tracing::info!(path = %rig_dir.display(), "removed worktrees of deconfigured rig");
                        report.removed.push(rig_dir);
                    }
                    Err(e) => report.failed.push((rig_dir, e.to_string())),
                }
                continue;
            };

            for worktree in list_dirs(&rig_dir).await {
                let flags = self.safety(&worktree).await;
                if flags.any() {
                    tracing::warn!(path = %worktree.display(), %flags, "skipping worktree with unsaved work");
                    report.skipped.push((worktree, flags));
                    continue;
                }
                match self.remove(&rig.path, &worktree, true).await {
                    Ok(()) => report.removed.push(worktree),
                    Err(e) => report.failed.push((worktree, e.to_string())),
                }
            }
        }

        for rig in rigs {
            self.prune(&rig.path).await;
        }
        report
    }

    /// Stash entries made on this worktree's branch. The stash is shared by
    /// every worktree of a repository, so entries are matched by subject.
    async fn own_stashes(&self, path: &Path) -> Result<usize, WorktreeError> {
        let head = git_ok(path, &["rev-parse", "--abbrev-ref", "HEAD"], "rev-parse").await?;
        let branch = if head == "HEAD" { "(no branch)" } else { head.as_str() };
        let subjects = git_ok(path, &["stash", "list", "--format=%gs"], "stash list").await?;
        Ok(subjects.lines().filter(|s| stash_on_branch(s, branch)).count())
    }

    async fn prune(&self, repo_dir: &Path) {
        if let Err(e) = git_ok(repo_dir, &["worktree", "prune"], "worktree prune").await {
            tracing::debug!(repo = %repo_dir.display(), error = %e, "worktree prune failed");
        }
    }

    async fn default_branch(&self, path: &Path) -> String {
        match git_ok(path, &["symbolic-ref", "refs/remotes/origin/HEAD"], "symbolic-ref").await {
            Ok(reference) => match reference.strip_prefix("refs/remotes/origin/") {
                Some(branch) if !branch.is_empty() => branch.to_string(),
                _ => FALLBACK_DEFAULT_BRANCH.to_string(),
            },
            Err(_) => FALLBACK_DEFAULT_BRANCH.to_string(),
        }
    }
}

/// Whether a stash subject (`%gs`) was recorded on `branch`.
pub fn stash_on_branch(subject: &str, branch: &str) -> bool {
    let rest = subject.strip_prefix("WIP on ").or_else(|| subject.strip_prefix("On "));
    rest.and_then(|r| r.strip_prefix(branch)).is_some_and(|r| r.starts_with(':'))
}

async fn list_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return dirs;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    dirs
}

#[async_trait]
impl WorktreeProvider for WorktreeManager {
    async fn ensure(
        &self,
        repo_dir: &Path,
        city_root: &Path,
        rig: &str,
        agent: &str,
    ) -> Result<Worktree, WorktreeError> {
        let path = worktree_path(city_root, rig, agent);

        if path.join(".git").exists() {
            let branch = git_ok(&path, &["rev-parse", "--abbrev-ref", "HEAD"], "rev-parse")
                .await
                .unwrap_or_default();
            tracing::debug!(path = %path.display(), %branch, "reusing worktree");
            return Ok(Worktree { path, branch });
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let branch = branch_name(agent, nanos);
        let path_str = path.display().to_string();
        git_ok(repo_dir, &["worktree", "add", "-b", &branch, &path_str], "worktree add").await?;
        tracing::info!(path = %path_str, %branch, "worktree created");

        if path.join(".gitmodules").exists() {
            if let Err(e) =
                git_ok(&path, &["submodule", "update", "--init", "--recursive"], "submodule update")
                    .await
            {
                tracing::warn!(path = %path_str, error = %e, "submodule init failed");
            }
        }

        Ok(Worktree { path, branch })
    }

    async fn sync(&self, path: &Path) {
        let p = path.display().to_string();
        if let Err(e) = git_ok(path, &["fetch", "origin"], "fetch").await {
            tracing::warn!(path = %p, error = %e, "worktree sync: fetch failed");
            return;
        }

        let dirty = match git_ok(path, &["status", "--porcelain"], "status").await {
            Ok(out) => !out.is_empty(),
            Err(e) => {
                tracing::warn!(path = %p, error = %e, "worktree sync: status failed");
                return;
            }
        };
        if dirty {
            if let Err(e) = git_ok(path, &["stash", "push", "-u", "-m", "gc sync"], "stash").await {
                tracing::warn!(path = %p, error = %e, "worktree sync: stash failed");
                return;
            }
        }

        let branch = self.default_branch(path).await;
        if let Err(e) = git_ok(path, &["pull", "--rebase", "origin", &branch], "pull").await {
            tracing::warn!(path = %p, %branch, error = %e, "worktree sync: pull failed");
            return;
        }

        if dirty {
            if let Err(e) = git_ok(path, &["stash", "pop"], "stash pop").await {
                tracing::warn!(path = %p, error = %e, "worktree sync: stash pop failed, changes left in stash");
            }
        }
        tracing::debug!(path = %p, %branch, "worktree synced");
    }
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
