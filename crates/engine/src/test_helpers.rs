// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fakes for engine tests

use crate::worktree::{worktree_path, Worktree, WorktreeError, WorktreeProvider};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Default)]
struct FakeWorktreeState {
    ensured: Vec<(PathBuf, String, String)>,
    synced: Vec<PathBuf>,
    fail: bool,
}

/// Worktree provider that only computes paths.
#[derive(Clone, Default)]
pub(crate) struct FakeWorktrees {
    inner: Arc<Mutex<FakeWorktreeState>>,
}

impl FakeWorktrees {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.inner.lock().fail = fail;
    }

    /// `(repo_dir, rig, agent)` per ensure call
    pub fn ensured(&self) -> Vec<(PathBuf, String, String)> {
        self.inner.lock().ensured.clone()
    }

    pub fn synced(&self) -> Vec<PathBuf> {
        self.inner.lock().synced.clone()
    }
}

#[async_trait]
impl WorktreeProvider for FakeWorktrees {
    async fn ensure(
        &self,
        repo_dir: &Path,
        city_root: &Path,
        rig: &str,
        agent: &str,
    ) -> Result<Worktree, WorktreeError> {
        let mut inner = self.inner.lock();
        inner.ensured.push((repo_dir.to_path_buf(), rig.to_string(), agent.to_string()));
        if inner.fail {
            return Err(WorktreeError::Git {
                command: "worktree add",
                message: "injected failure".to_string(),
            });
        }
        Ok(Worktree {
            path: worktree_path(city_root, rig, agent),
            branch: format!("gc/{agent}-test"),
        })
    }

    async fn sync(&self, path: &Path) {
        self.inner.lock().synced.push(path.to_path_buf());
    }
}
