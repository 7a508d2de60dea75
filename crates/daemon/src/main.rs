// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gcd`: the Gas City controller daemon.
//!
//! ```text
//! gcd [run]    tick the city in $GC_CITY (or the cwd) until SIGINT/SIGTERM
//! gcd sweep    remove stale agent worktrees, then exit
//! ```

use clap::Parser;
use gc_daemon::{env, lifecycle, logging, Cli, Command, Paths};
use std::process::ExitCode;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let command = Cli::parse().command();
    let paths = Paths::new(env::city_root());

    if std::fs::create_dir_all(&paths.logs).is_err() {
        eprintln!("gcd: cannot create {}", paths.logs.display());
    }
    let _guard = logging::init(&paths.logs);

    match command {
        Command::Run => run(paths).await,
        Command::Sweep => sweep(paths).await,
    }
}

async fn run(paths: Paths) -> ExitCode {
    let daemon = match lifecycle::startup(paths).await {
        Ok(daemon) => daemon,
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());
    lifecycle::run(daemon, env::tick_interval(), shutdown).await;
    info!("stopped");
    ExitCode::SUCCESS
}

async fn sweep(paths: Paths) -> ExitCode {
    match lifecycle::sweep(&paths).await {
        Ok(report) => {
            for path in &report.removed {
                println!("removed  {}", path.display());
            }
            for (path, flags) in &report.skipped {
                println!("skipped  {} ({flags})", path.display());
            }
            for (path, reason) in &report.failed {
                println!("failed   {} ({reason})", path.display());
            }
            if report.failed.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!(error = %e, "sweep failed");
            ExitCode::FAILURE
        }
    }
}

/// Cancel `token` on the first SIGINT or SIGTERM.
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
        info!("shutdown requested");
        token.cancel();
    });
}
