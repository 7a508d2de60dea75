// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One control-loop tick: scale pools, materialize agents, reconcile
//! sessions, dispatch automations.

use crate::automation::AutomationDispatcher;
use crate::pool::{materialize_pool, PoolContext, PoolScaler, ScaleFailurePolicy};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::worktree::WorktreeProvider;
use gc_adapters::{BeadStore, EventSink, ExecRunner, SessionAdapter};
use gc_core::{session_prefix, AgentInstance, AgentSpec, Automation, SessionName, MAX_POOL_SIZE};
use std::collections::HashSet;
use std::time::Duration;

/// Collaborators the controller is built from.
pub struct ControllerDeps<S, B, E, X, W> {
    pub sessions: S,
    pub store: B,
    pub events: E,
    pub exec: X,
    pub worktrees: W,
}

/// Outcome of one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Desired instances after pool evaluation, suspended ones included
    pub desired: usize,
    pub reconcile: ReconcileReport,
    pub dispatched: usize,
}

pub struct Controller<S, B, E, X, W> {
    ctx: PoolContext,
    agents: Vec<AgentSpec>,
    scaler: PoolScaler<X>,
    reconciler: Reconciler<S, E, W>,
    dispatcher: AutomationDispatcher<B, E, X>,
    worktrees: W,
}

impl<S, B, E, X, W> Controller<S, B, E, X, W>
where
    S: SessionAdapter,
    B: BeadStore,
    E: EventSink,
    X: ExecRunner,
    W: WorktreeProvider,
{
    pub fn new(
        ctx: PoolContext,
        deps: ControllerDeps<S, B, E, X, W>,
        policy: ScaleFailurePolicy,
        timeout_cap: Option<Duration>,
    ) -> Self {
        let ControllerDeps { sessions, store, events, exec, worktrees } = deps;
        Self {
            ctx,
            agents: Vec::new(),
            scaler: PoolScaler::new(exec.clone(), policy),
            reconciler: Reconciler::new(sessions, events.clone(), worktrees.clone()),
            dispatcher: AutomationDispatcher::new(Vec::new(), store, events, exec)
                .with_timeout_cap(timeout_cap),
            worktrees,
        }
    }

    pub fn context(&self) -> &PoolContext {
        &self.ctx
    }

    pub fn set_agents(&mut self, agents: Vec<AgentSpec>) {
        self.agents = agents;
    }

    pub fn set_automations(&mut self, automations: Vec<Automation>) {
        self.dispatcher.set_automations(automations);
    }

    pub fn dispatcher(&self) -> &AutomationDispatcher<B, E, X> {
        &self.dispatcher
    }

    /// Run one tick. Never fails; problems show up in the report, the log
    /// and the event stream.
    pub async fn tick(&mut self, now_ms: u64) -> TickReport {
        let (desired, suspended) = self.desired_agents().await;
        let prefix = session_prefix(&self.ctx.city_name);
        let reconcile = self.reconciler.reconcile(&desired, &suspended, &prefix).await;
        let dispatched = self.dispatcher.dispatch(&self.ctx.city_root, now_ms).await;

        tracing::info!(
            desired = desired.len(),
            started = reconcile.started,
            stopped = reconcile.stopped,
            restarted = reconcile.restarted,
            failed = reconcile.failed,
            dispatched,
            "tick complete"
        );
        TickReport { desired: desired.len(), reconcile, dispatched }
    }

    /// Wait for in-flight automations.
    pub async fn shutdown(&mut self) {
        let running = self.dispatcher.in_flight();
        if running > 0 {
            tracing::info!(running, "waiting for automations to finish");
        }
        self.dispatcher.drain().await;
    }

    /// Expand every agent spec into instances. Suspended agents are
    /// expanded to their full pool size without touching worktrees so any
    /// instance still running gets stopped.
    async fn desired_agents(&self) -> (Vec<AgentInstance>, HashSet<SessionName>) {
        let mut desired = Vec::new();
        let mut suspended = HashSet::new();

        for spec in &self.agents {
            let instances = if spec.suspended {
                let count = spec.pool.as_ref().map_or(1, |p| p.max.min(MAX_POOL_SIZE));
                let instances = materialize_pool::<W>(spec, count, &self.ctx, None).await;
                suspended.extend(instances.iter().map(|i| i.session.clone()));
                instances
            } else {
                let count = match &spec.pool {
                    Some(pool) => {
                        let name = spec.qualified_name();
                        self.scaler.evaluate_scale(&name, pool, &self.ctx.city_root).await
                    }
                    None => 1,
                };
                materialize_pool(spec, count, &self.ctx, Some(&self.worktrees)).await
            };
            desired.extend(instances);
        }

        (desired, suspended)
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
