// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tmux-backed sessions

use super::{SessionAdapter, SessionError};
use crate::subprocess::{run_with_timeout, stderr_text, TMUX_TIMEOUT};
use async_trait::async_trait;
use gc_core::{ConfigHash, SessionConfig, SessionName};
use tokio::process::Command;

/// Environment variable holding the config fingerprint inside a session.
pub const CONFIG_HASH_VAR: &str = "GC_CONFIG_HASH";

/// Runs each agent in a detached tmux session.
///
/// With a socket name set, all commands go to a private tmux server
/// (`tmux -L <socket>`) so one city never sees another's sessions.
#[derive(Clone, Debug, Default)]
pub struct TmuxSessionAdapter {
    socket: Option<String>,
}

impl TmuxSessionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_socket(socket: impl Into<String>) -> Self {
        Self { socket: Some(socket.into()) }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("tmux");
        if let Some(socket) = &self.socket {
            cmd.args(["-L", socket]);
        }
        cmd
    }

    async fn run(&self, args: &[&str], description: &str) -> Result<String, SessionError> {
        let mut cmd = self.command();
        cmd.args(args);
        let output = run_with_timeout(cmd, TMUX_TIMEOUT, description)
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(SessionError::CommandFailed(format!(
                "{description}: {}",
                stderr_text(&output)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Exact-match target so `gc-city-a` never resolves to `gc-city-ab`.
fn target(name: &SessionName) -> String {
    format!("={}", name)
}

/// True when tmux reports there is no server, which means no sessions.
fn no_server(stderr: &str) -> bool {
    stderr.contains("no server running") || stderr.contains("error connecting")
}

pub(crate) fn parse_session_list(stdout: &str, prefix: &str) -> Vec<SessionName> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.starts_with(prefix))
        .map(SessionName::new)
        .collect()
}

/// Parse `tmux show-environment` output for one variable. A leading `-`
/// marks a variable tmux knows about but has unset.
pub(crate) fn parse_show_environment(stdout: &str, key: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let (k, v) = line.trim().split_once('=')?;
        (k == key && !v.is_empty()).then(|| v.to_string())
    })
}

#[async_trait]
impl SessionAdapter for TmuxSessionAdapter {
    async fn is_running(&self, name: &SessionName) -> bool {
        let mut cmd = self.command();
        cmd.args(["has-session", "-t", &target(name)]);
        match run_with_timeout(cmd, TMUX_TIMEOUT, "tmux has-session").await {
            Ok(output) => output.status.success(),
            Err(e) => {
                tracing::warn!(session = %name, error = %e, "tmux has-session failed");
                false
            }
        }
    }

    async fn start(&self, name: &SessionName, config: &SessionConfig) -> Result<(), SessionError> {
        let work_dir = config.work_dir.display().to_string();
        let env: Vec<String> = config.env.iter().map(|(k, v)| format!("{k}={v}")).collect();

        let mut args: Vec<&str> = vec!["new-session", "-d", "-s", name.as_str(), "-c", work_dir.as_str()];
        for pair in &env {
            args.push("-e");
            args.push(pair.as_str());
        }
        args.push(config.command.as_str());

        self.run(&args, "tmux new-session")
            .await
            .map_err(|e| SessionError::SpawnFailed(format!("{name}: {e}")))?;
        tracing::debug!(session = %name, work_dir = %work_dir, "tmux session started");
        Ok(())
    }

    async fn stop(&self, name: &SessionName) -> Result<(), SessionError> {
        let mut cmd = self.command();
        cmd.args(["kill-session", "-t", &target(name)]);
        let output = run_with_timeout(cmd, TMUX_TIMEOUT, "tmux kill-session")
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = stderr_text(&output);
        if no_server(&stderr) || stderr.contains("can't find session") {
            return Ok(());
        }
        Err(SessionError::CommandFailed(format!("tmux kill-session {name}: {stderr}")))
    }

    async fn list_running(&self, prefix: &str) -> Result<Vec<SessionName>, SessionError> {
        let mut cmd = self.command();
        cmd.args(["list-sessions", "-F", "#{session_name}"]);
        let output = run_with_timeout(cmd, TMUX_TIMEOUT, "tmux list-sessions")
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            let stderr = stderr_text(&output);
            if no_server(&stderr) {
                return Ok(Vec::new());
            }
            return Err(SessionError::CommandFailed(format!("tmux list-sessions: {stderr}")));
        }
        Ok(parse_session_list(&String::from_utf8_lossy(&output.stdout), prefix))
    }

    async fn store_config_hash(
        &self,
        name: &SessionName,
        hash: &ConfigHash,
    ) -> Result<(), SessionError> {
        let target = target(name);
        self.run(
            &["set-environment", "-t", target.as_str(), CONFIG_HASH_VAR, hash.as_str()],
            "tmux set-environment",
        )
        .await
        .map(|_| ())
    }

    async fn config_hash(&self, name: &SessionName) -> Result<Option<ConfigHash>, SessionError> {
        let mut cmd = self.command();
        cmd.args(["show-environment", "-t", &target(name), CONFIG_HASH_VAR]);
        let output = run_with_timeout(cmd, TMUX_TIMEOUT, "tmux show-environment")
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            let stderr = stderr_text(&output);
            if stderr.contains("unknown variable") {
                return Ok(None);
            }
            if stderr.contains("can't find session") {
                return Err(SessionError::NotFound(name.to_string()));
            }
            return Err(SessionError::CommandFailed(format!("tmux show-environment: {stderr}")));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_show_environment(&stdout, CONFIG_HASH_VAR).map(ConfigHash::new))
    }

    async fn run_setup(&self, name: &SessionName, command: &str) -> Result<(), SessionError> {
        let target = target(name);
        self.run(&["send-keys", "-t", target.as_str(), command, "Enter"], "tmux send-keys")
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
