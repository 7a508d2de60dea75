// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, the tick loop, shutdown.

use crate::config::{self, CityConfig, ConfigError};
use crate::env;
use gc_adapters::{
    BeadStore, EventSink, ExecRunner, JsonFileBeadStore, JsonlEventLog, SessionAdapter,
    ShellExecRunner, StoreError, TmuxSessionAdapter,
};
use gc_core::{format_duration, Clock, SystemClock};
use gc_engine::{
    Controller, ControllerDeps, PoolContext, SweepReport, TickReport, WorktreeManager,
    WorktreeProvider,
};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// State directory under the city root.
pub const STATE_DIR: &str = ".gc";

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("bead store: {0}")]
    Store(#[from] StoreError),
    #[error("failed to create {}: {source}", path.display())]
    StateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Filesystem layout of one city.
#[derive(Debug, Clone)]
pub struct Paths {
    pub root: PathBuf,
    /// `<root>/.gc`
    pub state_dir: PathBuf,
    pub store: PathBuf,
    pub events: PathBuf,
    pub logs: PathBuf,
}

impl Paths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let state_dir = root.join(STATE_DIR);
        Self {
            store: state_dir.join("beads.json"),
            events: state_dir.join("events.jsonl"),
            logs: state_dir.join("logs"),
            state_dir,
            root,
        }
    }
}

/// Production daemon with the tmux, JSON file and shell adapters.
pub type CityDaemon =
    Daemon<TmuxSessionAdapter, JsonFileBeadStore, JsonlEventLog, ShellExecRunner, WorktreeManager>;

/// tmux socket for a city, so cities never see each other's sessions.
pub fn tmux_socket(city: &str) -> String {
    format!("gc-{city}")
}

/// A running city: current configuration plus the controller it drives.
pub struct Daemon<S, B, E, X, W> {
    paths: Paths,
    config: CityConfig,
    controller: Controller<S, B, E, X, W>,
    store: B,
}

impl<S, B, E, X, W> Daemon<S, B, E, X, W>
where
    S: SessionAdapter,
    B: BeadStore,
    E: EventSink,
    X: ExecRunner,
    W: WorktreeProvider,
{
    pub fn new(paths: Paths, config: CityConfig, deps: ControllerDeps<S, B, E, X, W>) -> Self {
        let store = deps.store.clone();
        let ctx = PoolContext::new(&config.name, &config.root);
        let controller =
            Controller::new(ctx, deps, env::scale_policy(), env::automation_timeout_cap());
        let mut daemon = Self { paths, config: config.clone(), controller, store };
        daemon.apply(config);
        daemon
    }

    pub fn config(&self) -> &CityConfig {
        &self.config
    }

    pub fn controller(&self) -> &Controller<S, B, E, X, W> {
        &self.controller
    }

    /// Re-read `city.toml`. A file that fails to load leaves the current
    /// configuration in place. Returns whether a new config was applied.
    pub fn reload(&mut self) -> bool {
        match config::load(&self.paths.root) {
            Ok(config) => {
                if config.name != self.config.name {
                    warn!(
                        current = %self.config.name,
                        configured = %config.name,
                        "city name changes take effect after a restart"
                    );
                }
                self.apply(config);
                true
            }
            Err(e) => {
                warn!(error = %e, "keeping previous configuration");
                false
            }
        }
    }

    /// Reload the config, then run one controller tick.
    pub async fn tick(&mut self, now_ms: u64) -> TickReport {
        self.reload();
        self.controller.tick(now_ms).await
    }

    fn apply(&mut self, config: CityConfig) {
        for formula in &config.formulas {
            self.store.register_formula(formula.clone());
        }
        self.controller.set_agents(config.agents.clone());
        self.controller.set_automations(config.automations.clone());
        self.config = config;
    }
}

/// Build the production daemon for the city at `paths.root`.
pub async fn startup(paths: Paths) -> Result<CityDaemon, DaemonError> {
    std::fs::create_dir_all(&paths.state_dir)
        .map_err(|source| DaemonError::StateDir { path: paths.state_dir.clone(), source })?;

    let config = config::load(&paths.root)?;
    let store = JsonFileBeadStore::open(&paths.store).await?;
    let deps = ControllerDeps {
        sessions: TmuxSessionAdapter::with_socket(tmux_socket(&config.name)),
        store,
        events: JsonlEventLog::new(&paths.events),
        exec: ShellExecRunner::new(),
        worktrees: WorktreeManager::new(),
    };

    info!(
        city = %config.name,
        root = %paths.root.display(),
        agents = config.agents.len(),
        automations = config.automations.len(),
        "city loaded"
    );
    Ok(Daemon::new(paths, config, deps))
}

/// Tick until `shutdown` fires, then drain in-flight automations.
///
/// The first tick runs immediately. A tick that overruns the interval
/// delays the next one; ticks never overlap. Sessions are left running.
pub async fn run<S, B, E, X, W>(
    mut daemon: Daemon<S, B, E, X, W>,
    interval: Duration,
    shutdown: CancellationToken,
) where
    S: SessionAdapter,
    B: BeadStore,
    E: EventSink,
    X: ExecRunner,
    W: WorktreeProvider,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval = %format_duration(interval), "control loop started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        daemon.tick(SystemClock.epoch_ms()).await;
    }

    info!("shutting down");
    daemon.controller.shutdown().await;
}

/// One-shot worktree sweep for the configured rigs.
pub async fn sweep(paths: &Paths) -> Result<SweepReport, DaemonError> {
    let config = config::load(&paths.root)?;
    Ok(WorktreeManager::new().sweep(&config.root, &config.rigs).await)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
