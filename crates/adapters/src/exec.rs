// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell command execution for pool checks, condition gates and exec
//! automations

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("exited with {}: {stderr}", exit_label(.code))]
    Failed { code: Option<i32>, stderr: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "signal".to_string(),
    }
}

/// Runs a shell command and returns its stdout.
///
/// Callers bound runtime with `tokio::time::timeout`; implementations must
/// clean up the child process when the returned future is dropped.
#[async_trait]
pub trait ExecRunner: Clone + Send + Sync + 'static {
    async fn run(
        &self,
        work_dir: &Path,
        command: &str,
        env: &[(String, String)],
    ) -> Result<String, ExecError>;
}

/// Runs commands with `sh -c`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShellExecRunner;

impl ShellExecRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecRunner for ShellExecRunner {
    async fn run(
        &self,
        work_dir: &Path,
        command: &str,
        env: &[(String, String)],
    ) -> Result<String, ExecError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(work_dir)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!(command, work_dir = %work_dir.display(), "running shell command");
        let output = cmd.output().await.map_err(ExecError::Spawn)?;
        if !output.status.success() {
            return Err(ExecError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{ExecError, ExecRunner};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    /// Scripted outcome for a command
    #[derive(Debug, Clone)]
    pub enum FakeResponse {
        Ok(String),
        Fail(String),
        /// Succeed with the output after a delay
        Delay(Duration, String),
        /// Never complete
        Hang,
    }

    /// Recorded invocation
    #[derive(Debug, Clone)]
    pub struct ExecCall {
        pub work_dir: PathBuf,
        pub command: String,
        pub env: Vec<(String, String)>,
    }

    impl ExecCall {
        pub fn env_var(&self, key: &str) -> Option<&str> {
            self.env.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
        }
    }

    #[derive(Default)]
    struct FakeExecState {
        responses: HashMap<String, FakeResponse>,
        calls: Vec<ExecCall>,
    }

    /// Fake runner: unknown commands succeed with empty output.
    #[derive(Clone, Default)]
    pub struct FakeExecRunner {
        inner: Arc<Mutex<FakeExecState>>,
    }

    impl FakeExecRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, command: impl Into<String>, response: FakeResponse) {
            self.inner.lock().responses.insert(command.into(), response);
        }

        pub fn calls(&self) -> Vec<ExecCall> {
            self.inner.lock().calls.clone()
        }

        pub fn commands(&self) -> Vec<String> {
            self.inner.lock().calls.iter().map(|c| c.command.clone()).collect()
        }
    }

    #[async_trait]
    impl ExecRunner for FakeExecRunner {
        async fn run(
            &self,
            work_dir: &Path,
            command: &str,
            env: &[(String, String)],
        ) -> Result<String, ExecError> {
            let response = {
                let mut inner = self.inner.lock();
                inner.calls.push(ExecCall {
                    work_dir: work_dir.to_path_buf(),
                    command: command.to_string(),
                    env: env.to_vec(),
                });
                inner.responses.get(command).cloned()
            };
            match response {
                None => Ok(String::new()),
                Some(FakeResponse::Ok(out)) => Ok(out),
                Some(FakeResponse::Fail(stderr)) => Err(ExecError::Failed { code: Some(1), stderr }),
                Some(FakeResponse::Delay(delay, out)) => {
                    tokio::time::sleep(delay).await;
                    Ok(out)
                }
                Some(FakeResponse::Hang) => std::future::pending().await,
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExecCall, FakeExecRunner, FakeResponse};

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
