// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use gc_engine::ScaleFailurePolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Default time between ticks
pub const DEFAULT_TICK: Duration = Duration::from_secs(30);

/// City root: `GC_CITY`, else the current directory.
pub fn city_root() -> PathBuf {
    if let Ok(dir) = std::env::var("GC_CITY") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Tick interval (default 30s, configurable via `GC_TICK_MS`).
pub fn tick_interval() -> Duration {
    std::env::var("GC_TICK_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TICK)
}

/// Global ceiling on automation timeouts (`GC_AUTOMATION_TIMEOUT_CAP_MS`).
pub fn automation_timeout_cap() -> Option<Duration> {
    std::env::var("GC_AUTOMATION_TIMEOUT_CAP_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

/// Scale-check failure policy (`GC_SCALE_POLICY`: `floor` or `hold`).
/// Unknown values fall back to `floor` with a warning.
pub fn scale_policy() -> ScaleFailurePolicy {
    match std::env::var("GC_SCALE_POLICY") {
        Ok(value) => value.parse().unwrap_or_else(|e: String| {
            tracing::warn!(error = %e, "ignoring GC_SCALE_POLICY");
            ScaleFailurePolicy::default()
        }),
        Err(_) => ScaleFailurePolicy::default(),
    }
}

/// Log filter directive: `RUST_LOG`, then `GC_LOG`, then `info`.
pub fn log_filter() -> String {
    std::env::var("RUST_LOG")
        .or_else(|_| std::env::var("GC_LOG"))
        .unwrap_or_else(|_| "info".to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
