// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup: stderr plus a daily-rolling file under the city state dir.

use crate::env;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log file prefix; the appender adds the date suffix.
pub const LOG_FILE: &str = "gcd.log";

/// Filter from `RUST_LOG` / `GC_LOG`. An unparseable directive falls back
/// to `info` rather than silencing the daemon.
pub fn filter() -> EnvFilter {
    EnvFilter::try_new(env::log_filter()).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Keep the returned guard alive for the
/// life of the process or buffered file output is lost.
pub fn init(log_dir: &Path) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let installed = tracing_subscriber::registry()
        .with(filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init();
    if let Err(e) = installed {
        eprintln!("gcd: logging already initialized: {e}");
    }
    guard
}
