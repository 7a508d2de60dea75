// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desired/actual session convergence.
//!
//! Per agent, in input order:
//!
//! | state                | action  |
//! |----------------------|---------|
//! | absent               | start   |
//! | running, healthy     | none    |
//! | running, drifted     | restart |
//! | running, suspended   | stop    |
//! | absent, suspended    | none    |
//!
//! Then every running session under the city prefix that no desired agent
//! maps to is stopped as an orphan. Failures are logged per agent and the
//! pass always runs to completion; the next tick retries.

use crate::worktree::WorktreeProvider;
use crate::ACTOR;
use gc_adapters::{EventSink, SessionAdapter, SessionError};
use gc_core::{short, AgentInstance, Event, SessionName, StopReason};
use std::collections::HashSet;
use thiserror::Error;

/// Final line of every reconcile report.
pub const CITY_STARTED: &str = "City started.";

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("start {session}: {source}")]
    Start {
        session: SessionName,
        #[source]
        source: SessionError,
    },
    #[error("stop {session}: {source}")]
    Stop {
        session: SessionName,
        #[source]
        source: SessionError,
    },
}

/// What happened to one desired agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentAction {
    Started,
    Healthy,
    Restarted,
    Stopped,
    Skipped,
}

/// Human-readable summary of one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub lines: Vec<String>,
    pub started: usize,
    pub stopped: usize,
    pub restarted: usize,
    pub failed: usize,
}

impl ReconcileReport {
    fn line(&mut self, line: String) {
        self.lines.push(line);
    }

    /// True when the pass changed nothing.
    pub fn is_noop(&self) -> bool {
        self.started == 0 && self.stopped == 0 && self.restarted == 0 && self.failed == 0
    }
}

/// Converges running sessions to the desired agent set.
#[derive(Clone)]
pub struct Reconciler<S, E, W> {
    sessions: S,
    events: E,
    worktrees: W,
}

impl<S, E, W> Reconciler<S, E, W>
where
    S: SessionAdapter,
    E: EventSink,
    W: WorktreeProvider,
{
    pub fn new(sessions: S, events: E, worktrees: W) -> Self {
        Self { sessions, events, worktrees }
    }

    /// Run one pass. `suspended` holds session names that must not run;
    /// `name_prefix` scopes the orphan sweep to this city's sessions.
    pub async fn reconcile(
        &self,
        desired: &[AgentInstance],
        suspended: &HashSet<SessionName>,
        name_prefix: &str,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for agent in desired {
            let is_suspended = suspended.contains(&agent.session);
            match self.reconcile_agent(agent, is_suspended, &mut report).await {
                Ok(AgentAction::Started) => report.started += 1,
                Ok(AgentAction::Restarted) => report.restarted += 1,
                Ok(AgentAction::Stopped) => report.stopped += 1,
                Ok(AgentAction::Healthy | AgentAction::Skipped) => {}
                Err(e) => {
                    tracing::warn!(agent = %agent.qualified_name, error = %e, "reconcile failed");
                    report.line(format!("Failed agent '{}': {}", agent.qualified_name, e));
                    report.failed += 1;
                }
            }
        }

        let keep: HashSet<&SessionName> = desired.iter().map(|a| &a.session).collect();
        self.stop_orphans(&keep, name_prefix, &mut report).await;

        report.line(CITY_STARTED.to_string());
        report
    }

    async fn reconcile_agent(
        &self,
        agent: &AgentInstance,
        suspended: bool,
        report: &mut ReconcileReport,
    ) -> Result<AgentAction, ReconcileError> {
        let name = &agent.qualified_name;
        let session = &agent.session;
        let running = self.sessions.is_running(session).await;

        if suspended {
            if !running {
                report.line(format!("Skipped suspended agent '{name}'"));
                return Ok(AgentAction::Skipped);
            }
            self.stop(session).await?;
            self.events.record(
                ACTOR,
                Event::AgentStopped {
                    agent: name.clone(),
                    session: session.clone(),
                    reason: StopReason::Suspended,
                },
            );
            report.line(format!("Stopped suspended agent '{name}' (session {session})"));
            return Ok(AgentAction::Stopped);
        }

        if !running {
            self.start(agent).await?;
            report.line(format!("Started agent '{name}' (session {session})"));
            return Ok(AgentAction::Started);
        }

        let desired_hash = agent.config.fingerprint();
        let stored = match self.sessions.config_hash(session).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::debug!(%session, error = %e, "config hash unavailable, assuming no drift");
                None
            }
        };
        match stored {
            Some(hash) if hash != desired_hash => {
                tracing::info!(
                    agent = %name,
                    %session,
                    running = short(hash.as_str(), 12),
                    desired = short(desired_hash.as_str(), 12),
                    "config drift, restarting"
                );
                self.stop(session).await?;
                self.start(agent).await?;
                report.line(format!("Restarted agent '{name}' (config changed)"));
                Ok(AgentAction::Restarted)
            }
            _ => Ok(AgentAction::Healthy),
        }
    }

    async fn stop(&self, session: &SessionName) -> Result<(), ReconcileError> {
        self.sessions
            .stop(session)
            .await
            .map_err(|source| ReconcileError::Stop { session: session.clone(), source })
    }

    /// Start the session, record its fingerprint and run setup commands.
    /// Only the start itself can fail.
    async fn start(&self, agent: &AgentInstance) -> Result<(), ReconcileError> {
        let session = &agent.session;
        if let Some(worktree) = &agent.worktree {
            self.worktrees.sync(worktree).await;
        }

        self.sessions
            .start(session, &agent.config)
            .await
            .map_err(|source| ReconcileError::Start { session: session.clone(), source })?;

        let hash = agent.config.fingerprint();
        if let Err(e) = self.sessions.store_config_hash(session, &hash).await {
            tracing::warn!(%session, error = %e, "failed to store config hash");
        }
        for command in &agent.session_setup {
            if let Err(e) = self.sessions.run_setup(session, command).await {
                tracing::warn!(%session, command, error = %e, "session setup command failed");
            }
        }

        self.events.record(
            ACTOR,
            Event::AgentStarted { agent: agent.qualified_name.clone(), session: session.clone() },
        );
        Ok(())
    }

    async fn stop_orphans(
        &self,
        keep: &HashSet<&SessionName>,
        prefix: &str,
        report: &mut ReconcileReport,
    ) {
        let running = match self.sessions.list_running(prefix).await {
            Ok(running) => running,
            Err(e) => {
                tracing::warn!(prefix, error = %e, "failed to list sessions, skipping orphan sweep");
                return;
            }
        };

        for session in running.iter().filter(|s| !keep.contains(s)) {
            match self.sessions.stop(session).await {
                Ok(()) => {
                    self.events.record(
                        ACTOR,
                        Event::AgentStopped {
                            agent: session.to_string(),
                            session: session.clone(),
                            reason: StopReason::Orphaned,
                        },
                    );
                    report.line(format!("Stopped orphan session {session}"));
                    report.stopped += 1;
                }
                Err(e) => {
                    tracing::warn!(%session, error = %e, "failed to stop orphan session");
                    report.line(format!("Failed to stop orphan session {session}: {e}"));
                    report.failed += 1;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
