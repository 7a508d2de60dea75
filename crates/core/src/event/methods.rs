// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Display helpers for events

use super::Event;

/// Returns ` rig={rig}` when set, empty string otherwise.
fn rig_fragment(rig: &Option<String>) -> String {
    match rig {
        Some(rig) if !rig.is_empty() => format!(" rig={rig}"),
        _ => String::new(),
    }
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::AgentStarted { .. } => "agent.started",
            Event::AgentStopped { .. } => "agent.stopped",
            Event::AutomationFired { .. } => "automation.fired",
            Event::AutomationCompleted { .. } => "automation.completed",
            Event::AutomationFailed { .. } => "automation.failed",
        }
    }

    /// The agent or automation the event is about.
    pub fn subject(&self) -> &str {
        match self {
            Event::AgentStarted { agent, .. } | Event::AgentStopped { agent, .. } => agent,
            Event::AutomationFired { automation, .. }
            | Event::AutomationCompleted { automation, .. }
            | Event::AutomationFailed { automation, .. } => automation,
        }
    }

    /// Human-readable message for the event log.
    pub fn message(&self) -> String {
        match self {
            Event::AgentStarted { session, .. } => format!("started session {session}"),
            Event::AgentStopped { session, reason, .. } => {
                format!("stopped session {session} ({reason})")
            }
            Event::AutomationFired { .. } => "automation fired".to_string(),
            Event::AutomationCompleted { bead: Some(bead), .. } => {
                format!("automation completed, created {bead}")
            }
            Event::AutomationCompleted { bead: None, .. } => "automation completed".to_string(),
            Event::AutomationFailed { error, .. } => format!("automation failed: {error}"),
        }
    }

    /// One-line summary for tracing output.
    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::AgentStarted { agent, session } => format!("{t} agent={agent} session={session}"),
            Event::AgentStopped { agent, session, reason } => {
                format!("{t} agent={agent} session={session} reason={reason}")
            }
            Event::AutomationFired { automation, rig }
            | Event::AutomationCompleted { automation, rig, .. } => {
                format!("{t} automation={automation}{}", rig_fragment(rig))
            }
            Event::AutomationFailed { automation, rig, error } => {
                format!("{t} automation={automation}{} error={error}", rig_fragment(rig))
            }
        }
    }
}
