// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn captures_output() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "echo out; echo err >&2"]);
    let output = run_with_timeout(cmd, Duration::from_secs(5), "echo").await.unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_text(&output), "out");
    assert_eq!(stderr_text(&output), "err");
}

#[tokio::test]
async fn times_out() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "sleep 5"]);
    let err = run_with_timeout(cmd, Duration::from_millis(50), "sleep").await.unwrap_err();
    assert!(matches!(err, SubprocessError::Timeout { .. }), "got {err:?}");
    assert!(err.to_string().starts_with("sleep: timed out"));
}

#[tokio::test]
async fn missing_binary_is_spawn_error() {
    let cmd = Command::new("gc-definitely-not-a-binary");
    let err = run_with_timeout(cmd, Duration::from_secs(1), "missing").await.unwrap_err();
    assert!(matches!(err, SubprocessError::Spawn { .. }));
}
