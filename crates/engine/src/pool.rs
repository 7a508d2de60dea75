// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pool scaling and per-instance materialization

use crate::template::{expand, TemplateVars};
use crate::worktree::WorktreeProvider;
use gc_adapters::{ExecError, ExecRunner};
use gc_core::{qualified_name, session_name, AgentInstance, AgentSpec, Isolation, PoolSpec, SessionConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on a scale-check command.
pub const SCALE_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("scale check produced no output")]
    Empty,
    #[error("scale check output is not an integer: {0:?}")]
    NotInteger(String),
    #[error("scale check failed: {0}")]
    Exec(#[from] ExecError),
    #[error("scale check timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Count to use when a scale check fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScaleFailurePolicy {
    /// Scale to the pool minimum
    #[default]
    Floor,
    /// Keep the last successfully evaluated count (minimum if none)
    HoldPrevious,
}

gc_core::simple_display! {
    ScaleFailurePolicy {
        Floor => "floor",
        HoldPrevious => "hold",
    }
}

impl FromStr for ScaleFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "floor" => Ok(Self::Floor),
            "hold" => Ok(Self::HoldPrevious),
            other => Err(format!("unknown scale policy {other:?} (expected floor or hold)")),
        }
    }
}

/// Parse scale-check stdout as a signed integer.
pub fn parse_scale_output(output: &str) -> Result<i64, ScaleError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Err(ScaleError::Empty);
    }
    trimmed.parse().map_err(|_| ScaleError::NotInteger(trimmed.to_string()))
}

/// Evaluates pool scale checks.
#[derive(Clone)]
pub struct PoolScaler<X> {
    exec: X,
    policy: ScaleFailurePolicy,
    previous: Arc<Mutex<HashMap<String, u32>>>,
}

impl<X: ExecRunner> PoolScaler<X> {
    pub fn new(exec: X, policy: ScaleFailurePolicy) -> Self {
        Self { exec, policy, previous: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn policy(&self) -> ScaleFailurePolicy {
        self.policy
    }

    /// Desired instance count for pool `name`, always within
    /// `[pool.min, pool.max]`.
    pub async fn evaluate_scale(&self, name: &str, pool: &PoolSpec, work_dir: &Path) -> u32 {
        match self.run_check(pool, work_dir).await {
            Ok(n) => {
                let count = pool.clamp(n);
                if i64::from(count) != n {
                    tracing::debug!(pool = name, requested = n, count, "scale clamped");
                }
                self.previous.lock().insert(name.to_string(), count);
                count
            }
            Err(e) => {
                let count = match self.policy {
                    ScaleFailurePolicy::Floor => pool.min,
                    ScaleFailurePolicy::HoldPrevious => {
                        let previous = self.previous.lock().get(name).copied();
                        previous.map_or(pool.min, |n| pool.clamp(i64::from(n)))
                    }
                };
                tracing::warn!(pool = name, error = %e, count, policy = %self.policy, "scale check failed");
                count
            }
        }
    }

    async fn run_check(&self, pool: &PoolSpec, work_dir: &Path) -> Result<i64, ScaleError> {
        let output = tokio::time::timeout(SCALE_CHECK_TIMEOUT, self.exec.run(work_dir, &pool.check, &[]))
            .await
            .map_err(|_| ScaleError::Timeout(SCALE_CHECK_TIMEOUT))??;
        parse_scale_output(&output)
    }
}

/// City-level facts needed to materialize agents.
#[derive(Debug, Clone)]
pub struct PoolContext {
    pub city_name: String,
    pub city_root: PathBuf,
}

impl PoolContext {
    pub fn new(city_name: impl Into<String>, city_root: impl Into<PathBuf>) -> Self {
        Self { city_name: city_name.into(), city_root: city_root.into() }
    }
}

/// Instance name at 1-based position `index`: bare for singletons,
/// `{name}-{index}` otherwise.
pub fn instance_name(template: &AgentSpec, index: u32) -> String {
    match &template.pool {
        Some(pool) if !pool.is_singleton() => format!("{}-{}", template.name, index),
        _ => template.name.clone(),
    }
}

/// Expand `template` into `count` concrete instances.
///
/// With `worktrees` set and worktree isolation configured, each instance is
/// given its own worktree; a worktree failure falls back to the shared
/// directory. Pass `None` to compute identities only (suspended agents).
pub async fn materialize_pool<W: WorktreeProvider>(
    template: &AgentSpec,
    count: u32,
    ctx: &PoolContext,
    worktrees: Option<&W>,
) -> Vec<AgentInstance> {
    let mut instances = Vec::with_capacity(count as usize);
    for index in 1..=count {
        instances.push(materialize_one(template, index, ctx, worktrees).await);
    }
    instances
}

async fn materialize_one<W: WorktreeProvider>(
    template: &AgentSpec,
    index: u32,
    ctx: &PoolContext,
    worktrees: Option<&W>,
) -> AgentInstance {
    let name = instance_name(template, index);
    let qualified = qualified_name(template.rig.as_deref(), &name);
    let rig = template.rig.as_deref();
    let vars = TemplateVars::new(&name, rig, &ctx.city_root, &ctx.city_name);

    let mut work_dir = resolve_dir(&expand(&template.work_dir, &vars), &ctx.city_root);
    let mut branch = None;
    let mut worktree_path = None;

    if let (Isolation::Worktree, Some(worktrees)) = (template.isolation, worktrees) {
        let rig_dir = rig.unwrap_or(&ctx.city_name);
        match worktrees.ensure(&work_dir, &ctx.city_root, rig_dir, &name).await {
            Ok(wt) => {
                work_dir = wt.path.clone();
                worktree_path = Some(wt.path);
                branch = Some(wt.branch).filter(|b| !b.is_empty());
            }
            Err(e) => {
                tracing::warn!(agent = %qualified, error = %e, "worktree unavailable, using shared directory");
            }
        }
    }

    let vars = vars.with_work_dir(&work_dir);
    let mut config = SessionConfig::new(template.command.clone(), work_dir.clone());
    config.env = template.env.clone();
    config.env.insert("GC_AGENT".to_string(), qualified.clone());
    config.env.insert("GC_CITY".to_string(), ctx.city_root.display().to_string());
    config.env.insert("GC_DIR".to_string(), work_dir.display().to_string());
    if let Some(branch) = branch {
        config.env.insert("GC_BRANCH".to_string(), branch);
    }

    let session = session_name(&ctx.city_name, &qualified, template.session_template.as_deref());
    let mut instance = AgentInstance::new(qualified, session, config);
    instance.worktree = worktree_path;
    instance.session_setup = template.session_setup.iter().map(|c| expand(c, &vars)).collect();
    instance
}

/// Empty means the city root; relative paths are taken from the city root.
fn resolve_dir(dir: &str, city_root: &Path) -> PathBuf {
    if dir.is_empty() {
        return city_root.to_path_buf();
    }
    let path = Path::new(dir);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        city_root.join(path)
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
