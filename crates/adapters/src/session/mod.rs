// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session management adapters

mod tmux;

pub use tmux::TmuxSessionAdapter;

use async_trait::async_trait;
use gc_core::{ConfigHash, SessionConfig, SessionName};
use thiserror::Error;

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Adapter for managing long-running agent sessions.
///
/// Every session carries an opaque metadata slot holding the fingerprint of
/// the configuration it was started with.
#[async_trait]
pub trait SessionAdapter: Clone + Send + Sync + 'static {
    /// Whether a session with this exact name is alive. Lookup failures read
    /// as "not running".
    async fn is_running(&self, name: &SessionName) -> bool;

    /// Start a detached session running `config.command` in `config.work_dir`.
    async fn start(&self, name: &SessionName, config: &SessionConfig) -> Result<(), SessionError>;

    /// Stop a session. Stopping one that is already gone is not an error.
    async fn stop(&self, name: &SessionName) -> Result<(), SessionError>;

    /// Names of all live sessions starting with `prefix`.
    async fn list_running(&self, prefix: &str) -> Result<Vec<SessionName>, SessionError>;

    /// Record the configuration fingerprint in the session's metadata slot.
    async fn store_config_hash(
        &self,
        name: &SessionName,
        hash: &ConfigHash,
    ) -> Result<(), SessionError>;

    /// Read the stored fingerprint. `Ok(None)` when the slot was never set.
    async fn config_hash(&self, name: &SessionName) -> Result<Option<ConfigHash>, SessionError>;

    /// Send a setup command into a freshly started session.
    async fn run_setup(&self, name: &SessionName, command: &str) -> Result<(), SessionError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSessionAdapter, SessionCall};
