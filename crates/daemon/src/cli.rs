// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gcd` command line

use clap::{Parser, Subcommand};

/// Gas City controller daemon
#[derive(Parser)]
#[command(name = "gcd", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The subcommand to run; bare `gcd` means `gcd run`.
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Tick the city in $GC_CITY (or the cwd) until SIGINT or SIGTERM
    Run,
    /// Remove stale agent worktrees, then exit
    Sweep,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
