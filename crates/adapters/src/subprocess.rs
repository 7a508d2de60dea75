// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded subprocess execution.

use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Upper bound for any single git invocation (fetch and pull included).
pub const GIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Upper bound for tmux control commands.
pub const TMUX_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{description}: failed to spawn: {source}")]
    Spawn {
        description: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{description}: timed out after {}s", timeout.as_secs())]
    Timeout { description: String, timeout: Duration },
}

/// Run `cmd` to completion, killing it if it outlives `timeout`.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, SubprocessError> {
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => {
            Err(SubprocessError::Spawn { description: description.to_string(), source })
        }
        Err(_) => {
            tracing::warn!(%description, timeout_secs = timeout.as_secs(), "subprocess timed out");
            Err(SubprocessError::Timeout { description: description.to_string(), timeout })
        }
    }
}

/// Trimmed, lossily decoded stdout.
pub fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Trimmed, lossily decoded stderr.
pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
