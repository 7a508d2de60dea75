// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desired agents, pool templates and the per-tick agent instances.
//!
//! ```text
//! AgentSpec (config, maybe pooled)
//!      │  pool scaler + materialize
//!      └── AgentInstance × n  ──►  reconciler  ──►  session
//! ```

use crate::session::{SessionConfig, SessionName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// How an agent's working tree is isolated from its rig's checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Isolation {
    #[default]
    None,
    /// Private git worktree + branch per instance
    Worktree,
}

crate::simple_display! {
    Isolation {
        None => "none",
        Worktree => "worktree",
    }
}

/// Largest pool `max` accepted from configuration.
pub const MAX_POOL_SIZE: u32 = 64;

/// Pool bounds and the command that reports how many instances are wanted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSpec {
    pub min: u32,
    pub max: u32,
    /// Shell command printing the desired instance count on stdout
    pub check: String,
}

impl PoolSpec {
    pub fn new(min: u32, max: u32, check: impl Into<String>) -> Self {
        Self { min, max, check: check.into() }
    }

    /// Clamp a raw count into `[min, max]`. An inverted range collapses
    /// to `max`.
    pub fn clamp(&self, n: i64) -> u32 {
        let max = i64::from(self.max);
        n.clamp(i64::from(self.min).min(max), max) as u32
    }

    /// A pool capped at one instance keeps the bare agent name.
    pub fn is_singleton(&self) -> bool {
        self.max == 1
    }
}

/// An agent as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpec {
    pub name: String,
    /// Owning rig; `None` for city-scoped agents
    pub rig: Option<String>,
    pub command: String,
    /// Working directory, may contain `${...}` placeholders
    pub work_dir: String,
    pub env: BTreeMap<String, String>,
    pub session_template: Option<String>,
    /// Own flag already OR-ed with the rig and city flags
    pub suspended: bool,
    pub pool: Option<PoolSpec>,
    pub isolation: Isolation,
    /// Commands sent to the session after it starts, may contain placeholders
    pub session_setup: Vec<String>,
}

impl AgentSpec {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rig: None,
            command: command.into(),
            work_dir: String::new(),
            env: BTreeMap::new(),
            session_template: None,
            suspended: false,
            pool: None,
            isolation: Isolation::None,
            session_setup: Vec::new(),
        }
    }

    crate::setters! {
        into {
            work_dir: String,
        }
        set {
            env: BTreeMap<String, String>,
            suspended: bool,
            isolation: Isolation,
            session_setup: Vec<String>,
        }
        option {
            rig: String,
            session_template: String,
            pool: PoolSpec,
        }
    }

    pub fn qualified_name(&self) -> String {
        qualified_name(self.rig.as_deref(), &self.name)
    }
}

/// A concrete agent for this tick, ready for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInstance {
    pub qualified_name: String,
    pub session: SessionName,
    pub config: SessionConfig,
    /// Set when the instance runs in a managed worktree (synced before start)
    pub worktree: Option<PathBuf>,
    pub session_setup: Vec<String>,
}

impl AgentInstance {
    pub fn new(qualified_name: impl Into<String>, session: SessionName, config: SessionConfig) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            session,
            config,
            worktree: None,
            session_setup: Vec::new(),
        }
    }
}

/// `rig/name`, or the bare name for city-scoped agents.
pub fn qualified_name(rig: Option<&str>, name: &str) -> String {
    match rig {
        Some(rig) if !rig.is_empty() => format!("{}/{}", rig, name),
        _ => name.to_string(),
    }
}

/// Rejected agent, rig, or automation name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("{kind} name is empty")]
    Empty { kind: &'static str },
    #[error("{kind} name '{name}' must not contain '{fragment}'")]
    Reserved { kind: &'static str, name: String, fragment: String },
    #[error("{kind} name '{name}' must not start or end with '-'")]
    EdgeDash { kind: &'static str, name: String },
}

/// Names are limited to `[A-Za-z0-9_-]`, never `--`, never a leading or
/// trailing `-`, so `rig/name` → `rig--name` stays injective and no
/// character is rewritten by session-name sanitizing.
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty { kind });
    }
    if let Some(c) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-')) {
        return Err(NameError::Reserved { kind, name: name.to_string(), fragment: c.to_string() });
    }
    if name.contains("--") {
        return Err(NameError::Reserved {
            kind,
            name: name.to_string(),
            fragment: "--".to_string(),
        });
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(NameError::EdgeDash { kind, name: name.to_string() });
    }
    Ok(())
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
