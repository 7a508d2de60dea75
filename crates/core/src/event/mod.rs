// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events recorded by the control loop.

mod methods;

use crate::bead::BeadId;
use crate::session::SessionName;
use serde::{Deserialize, Serialize};

/// Why a session was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Suspended,
    Orphaned,
}

crate::simple_display! {
    StopReason {
        Suspended => "suspended",
        Orphaned => "orphaned",
    }
}

/// Events emitted by the reconciler and the automation dispatcher.
///
/// Serializes with `{"type": "agent.started", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "agent.started")]
    AgentStarted { agent: String, session: SessionName },

    /// `agent` is the session name for orphans, which have no desired agent
    #[serde(rename = "agent.stopped")]
    AgentStopped { agent: String, session: SessionName, reason: StopReason },

    #[serde(rename = "automation.fired")]
    AutomationFired {
        automation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rig: Option<String>,
    },

    #[serde(rename = "automation.completed")]
    AutomationCompleted {
        automation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rig: Option<String>,
        /// Work item created by a formula action
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bead: Option<BeadId>,
    },

    #[serde(rename = "automation.failed")]
    AutomationFailed {
        automation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rig: Option<String>,
        error: String,
    },
}

/// An event as written to the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub ts_ms: u64,
    pub actor: String,
    pub subject: String,
    pub message: String,
    #[serde(flatten)]
    pub event: Event,
}

impl EventRecord {
    pub fn new(actor: impl Into<String>, event: Event, ts_ms: u64) -> Self {
        Self {
            ts_ms,
            actor: actor.into(),
            subject: event.subject().to_string(),
            message: event.message(),
            event,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
