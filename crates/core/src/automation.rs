// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Automation definitions and tracking-record labels.
//!
//! An automation's cooldown clock is the creation time of the newest bead
//! carrying its tracking label. Rig-scoped automations fold the rig into the
//! label, so identically named automations in different rigs cool down
//! independently.

use std::path::PathBuf;
use std::time::Duration;

/// Default action timeout for exec (script) automations.
pub const EXEC_DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default action timeout for formula automations.
pub const FORMULA_DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bead kind used for tracking records.
pub const TRACKING_KIND: &str = "automation-run";

/// Label marking a tracking record produced by a script action.
pub const LABEL_EXEC: &str = "exec";

/// Label marking a failed or timed-out script action.
pub const LABEL_EXEC_FAILED: &str = "exec-failed";

/// When an automation is eligible to fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Due when the newest tracking record is older than `interval`
    Cooldown { interval: Duration },
    /// Due when `check` exits 0
    Condition { check: String },
    /// Never auto-dispatched
    Manual,
}

crate::simple_display! {
    Gate {
        Cooldown { .. } => "cooldown",
        Condition { .. } => "condition",
        Manual => "manual",
    }
}

/// What an automation does when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomationAction {
    /// Cook a formula into a work item in the store
    Formula { formula: String },
    /// Run a script through the exec runner
    Exec { script: String },
}

impl AutomationAction {
    pub fn default_timeout(&self) -> Duration {
        match self {
            AutomationAction::Formula { .. } => FORMULA_DEFAULT_TIMEOUT,
            AutomationAction::Exec { .. } => EXEC_DEFAULT_TIMEOUT,
        }
    }

    pub fn is_exec(&self) -> bool {
        matches!(self, AutomationAction::Exec { .. })
    }
}

crate::simple_display! {
    AutomationAction {
        Formula { .. } => "formula",
        Exec { .. } => "exec",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Automation {
    pub name: String,
    /// Owning rig; `None` for city-wide automations
    pub rig: Option<String>,
    pub gate: Gate,
    pub action: AutomationAction,
    /// Pool that should pick up work created by a formula action
    pub pool: Option<String>,
    /// Overrides the action's default timeout
    pub timeout: Option<Duration>,
    /// Directory the definition came from, exported to scripts
    pub source_dir: Option<PathBuf>,
}

impl Automation {
    pub fn new(name: impl Into<String>, gate: Gate, action: AutomationAction) -> Self {
        Self {
            name: name.into(),
            rig: None,
            gate,
            action,
            pool: None,
            timeout: None,
            source_dir: None,
        }
    }

    crate::setters! {
        option {
            rig: String,
            pool: String,
            timeout: Duration,
            source_dir: PathBuf,
        }
    }

    /// `name`, or `name:rig:rig` when rig-scoped (used in logs and events).
    pub fn scoped_name(&self) -> String {
        match self.rig.as_deref() {
            Some(rig) if !rig.is_empty() => format!("{}:rig:{}", self.name, rig),
            _ => self.name.clone(),
        }
    }

    /// Label identifying this automation's tracking records.
    pub fn tracking_label(&self) -> String {
        format!("{}:{}", TRACKING_KIND, self.scoped_name())
    }

    /// `pool:<pool>`, qualified with the rig for rig-scoped automations
    /// unless the pool is already qualified.
    pub fn pool_label(&self) -> Option<String> {
        let pool = self.pool.as_deref().filter(|p| !p.is_empty())?;
        Some(match self.rig.as_deref() {
            Some(rig) if !rig.is_empty() && !pool.contains('/') => format!("pool:{}/{}", rig, pool),
            _ => format!("pool:{}", pool),
        })
    }

    pub fn is_manual(&self) -> bool {
        self.gate == Gate::Manual
    }

    /// Declared timeout (or the action default), bounded by the global cap.
    pub fn effective_timeout(&self, cap: Option<Duration>) -> Duration {
        let base = self.timeout.unwrap_or_else(|| self.action.default_timeout());
        match cap {
            Some(cap) => base.min(cap),
            None => base,
        }
    }
}

#[cfg(test)]
#[path = "automation_tests.rs"]
mod tests;
