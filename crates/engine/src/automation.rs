// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gate evaluation and concurrent dispatch of automations.
//!
//! `dispatch` decides which automations are due and spawns one task per due
//! automation, returning before any of them finish. Tracking records and
//! events from one tick can therefore land after the next tick begins.

use crate::ACTOR;
use gc_adapters::{BeadStore, EventSink, ExecError, ExecRunner, StoreError};
use gc_core::automation::{LABEL_EXEC, LABEL_EXEC_FAILED, TRACKING_KIND};
use gc_core::{Automation, AutomationAction, BeadId, Event, Gate, NewBead};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;

/// Upper bound on a condition gate's check command.
pub const CONDITION_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("exec failed: {0}")]
    Exec(#[from] ExecError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Collaborators shared by every automation task.
#[derive(Clone)]
struct TaskDeps<B, E, X> {
    store: B,
    events: E,
    exec: X,
}

/// Removes an automation from the in-flight set when its task ends,
/// including on panic or abort.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    label: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.label);
    }
}

/// Dispatches due automations onto background tasks.
pub struct AutomationDispatcher<B, E, X> {
    automations: Vec<Arc<Automation>>,
    deps: TaskDeps<B, E, X>,
    timeout_cap: Option<Duration>,
    tasks: JoinSet<()>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl<B, E, X> AutomationDispatcher<B, E, X>
where
    B: BeadStore,
    E: EventSink,
    X: ExecRunner,
{
    /// Manual-gated automations are dropped here; they only run on demand.
    pub fn new(automations: Vec<Automation>, store: B, events: E, exec: X) -> Self {
        let mut dispatcher = Self {
            automations: Vec::new(),
            deps: TaskDeps { store, events, exec },
            timeout_cap: None,
            tasks: JoinSet::new(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        };
        dispatcher.set_automations(automations);
        dispatcher
    }

    /// Bound every action's timeout by `cap`.
    pub fn with_timeout_cap(mut self, cap: Option<Duration>) -> Self {
        self.timeout_cap = cap;
        self
    }

    /// Replace the automation set (after a config reload). In-flight tasks
    /// keep running and still block re-dispatch of the same automation.
    pub fn set_automations(&mut self, automations: Vec<Automation>) {
        self.automations =
            automations.into_iter().filter(|a| !a.is_manual()).map(Arc::new).collect();
    }

    pub fn automations(&self) -> impl Iterator<Item = &Automation> {
        self.automations.iter().map(Arc::as_ref)
    }

    /// Number of automations currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Evaluate every gate and spawn the due automations. Returns how many
    /// were spawned.
    pub async fn dispatch(&mut self, city_root: &Path, now_ms: u64) -> usize {
        self.reap();

        let mut spawned = 0;
        for automation in self.automations.clone() {
            let label = automation.tracking_label();
            if self.in_flight.lock().contains(&label) {
                tracing::debug!(automation = %automation.scoped_name(), "still running, skipping");
                continue;
            }
            if !self.is_due(&automation, &label, city_root, now_ms).await {
                continue;
            }

            self.in_flight.lock().insert(label.clone());
            let guard = InFlightGuard { set: Arc::clone(&self.in_flight), label };
            let deps = self.deps.clone();
            let timeout = automation.effective_timeout(self.timeout_cap);
            let city_root = city_root.to_path_buf();
            self.tasks.spawn(async move {
                let _guard = guard;
                run_automation(deps, automation, city_root, timeout).await;
            });
            spawned += 1;
        }
        spawned
    }

    /// Wait for every in-flight automation to finish.
    pub async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "automation task panicked");
            }
        }
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                tracing::error!(error = %e, "automation task panicked");
            }
        }
    }

    async fn is_due(&self, automation: &Automation, label: &str, city_root: &Path, now_ms: u64) -> bool {
        match &automation.gate {
            Gate::Cooldown { interval } => {
                match self.deps.store.latest_with_label(label).await {
                    Ok(None) => true,
                    Ok(Some(last)) => {
                        let elapsed = now_ms.saturating_sub(last.created_at_ms);
                        u128::from(elapsed) >= interval.as_millis()
                    }
                    Err(e) => {
                        tracing::warn!(automation = %automation.scoped_name(), error = %e, "cannot read last run, skipping");
                        false
                    }
                }
            }
            Gate::Condition { check } => {
                let env = automation_env(automation, city_root);
                let run = self.deps.exec.run(city_root, check, &env);
                match tokio::time::timeout(CONDITION_CHECK_TIMEOUT, run).await {
                    Ok(Ok(_)) => true,
                    Ok(Err(e)) => {
                        tracing::debug!(automation = %automation.scoped_name(), error = %e, "condition not met");
                        false
                    }
                    Err(_) => {
                        tracing::warn!(automation = %automation.scoped_name(), "condition check timed out");
                        false
                    }
                }
            }
            Gate::Manual => false,
        }
    }
}

/// Environment exported to exec scripts and condition checks.
fn automation_env(automation: &Automation, city_root: &Path) -> Vec<(String, String)> {
    let source_dir =
        automation.source_dir.as_ref().map(|d| d.display().to_string()).unwrap_or_default();
    vec![
        ("GC_CITY".to_string(), city_root.display().to_string()),
        ("GC_AUTOMATION".to_string(), automation.name.clone()),
        ("GC_RIG".to_string(), automation.rig.clone().unwrap_or_default()),
        ("GC_AUTOMATION_SOURCE_DIR".to_string(), source_dir),
    ]
}

/// Resolve a script path against the automation's source directory, then
/// the city root. Anything not found on disk is run as given.
fn resolve_script(script: &str, source_dir: Option<&Path>, city_root: &Path) -> String {
    let path = Path::new(script);
    if path.is_absolute() {
        return script.to_string();
    }
    let candidates = source_dir.into_iter().chain(std::iter::once(city_root));
    for base in candidates {
        let candidate = base.join(path);
        if candidate.is_file() {
            return candidate.display().to_string();
        }
    }
    script.to_string()
}

async fn run_automation<B, E, X>(
    deps: TaskDeps<B, E, X>,
    automation: Arc<Automation>,
    city_root: PathBuf,
    timeout: Duration,
) where
    B: BeadStore,
    E: EventSink,
    X: ExecRunner,
{
    let scoped = automation.scoped_name();
    deps.events.record(
        ACTOR,
        Event::AutomationFired { automation: scoped.clone(), rig: automation.rig.clone() },
    );

    let result = match tokio::time::timeout(timeout, run_action(&deps, &automation, &city_root)).await {
        Ok(result) => result,
        Err(_) => Err(AutomationError::Timeout(timeout)),
    };

    let is_exec = automation.action.is_exec();
    match result {
        Ok(bead) => {
            let mut labels = Vec::new();
            if is_exec {
                labels.push(LABEL_EXEC.to_string());
            }
            record_run(&deps.store, &automation, labels).await;
            tracing::info!(automation = %scoped, "automation completed");
            deps.events.record(
                ACTOR,
                Event::AutomationCompleted { automation: scoped, rig: automation.rig.clone(), bead },
            );
        }
        Err(e) => {
            if is_exec {
                let labels = vec![LABEL_EXEC.to_string(), LABEL_EXEC_FAILED.to_string()];
                record_run(&deps.store, &automation, labels).await;
            }
            tracing::warn!(automation = %scoped, error = %e, "automation failed");
            deps.events.record(
                ACTOR,
                Event::AutomationFailed {
                    automation: scoped,
                    rig: automation.rig.clone(),
                    error: e.to_string(),
                },
            );
        }
    }
}

/// Run the action. Formula actions return the root bead they cooked.
async fn run_action<B, E, X>(
    deps: &TaskDeps<B, E, X>,
    automation: &Automation,
    city_root: &Path,
) -> Result<Option<BeadId>, AutomationError>
where
    B: BeadStore,
    E: EventSink,
    X: ExecRunner,
{
    match &automation.action {
        AutomationAction::Exec { script } => {
            let command = resolve_script(script, automation.source_dir.as_deref(), city_root);
            let env = automation_env(automation, city_root);
            let output = deps.exec.run(city_root, &command, &env).await?;
            tracing::debug!(automation = %automation.scoped_name(), output = %output.trim(), "exec output");
            Ok(None)
        }
        AutomationAction::Formula { formula } => {
            let labels: Vec<String> = automation.pool_label().into_iter().collect();
            let root = deps.store.mol_cook(formula, &automation.scoped_name(), &labels).await?;
            Ok(Some(root))
        }
    }
}

/// Write the tracking record that drives the cooldown gate. Failures are
/// logged; the next tick will simply see the automation as due again.
async fn record_run<B: BeadStore>(store: &B, automation: &Automation, extra: Vec<String>) {
    let mut bead = NewBead::new(TRACKING_KIND, format!("automation run: {}", automation.scoped_name()))
        .label(automation.tracking_label());
    if let Some(pool) = automation.pool_label() {
        bead = bead.label(pool);
    }
    for label in extra {
        bead = bead.label(label);
    }
    if let Err(e) = store.create(bead).await {
        tracing::warn!(automation = %automation.scoped_name(), error = %e, "failed to write tracking record");
    }
}

#[cfg(test)]
#[path = "automation_tests.rs"]
mod tests;
