// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gas City daemon library: city configuration, environment, logging and
//! the control-loop lifecycle behind the `gcd` binary.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod cli;
pub mod config;
pub mod env;
pub mod lifecycle;
pub mod logging;

pub use cli::{Cli, Command};
pub use config::{CityConfig, ConfigError, CITY_FILE};
pub use lifecycle::{run, startup, sweep, CityDaemon, Daemon, DaemonError, Paths};
