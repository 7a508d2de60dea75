// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external I/O: sessions, the bead store, the event log and
//! shell execution. Each seam is a trait with a real implementation and a
//! fake for tests (behind the `test-support` feature).

pub mod event_log;
pub mod exec;
pub mod session;
pub mod store;
pub mod subprocess;

pub use event_log::{EventSink, JsonlEventLog};
pub use exec::{ExecError, ExecRunner, ShellExecRunner};
pub use session::{SessionAdapter, SessionError, TmuxSessionAdapter};
pub use store::{BeadStore, Formula, JsonFileBeadStore, MemoryBeadStore, StoreError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use event_log::FakeEventSink;
#[cfg(any(test, feature = "test-support"))]
pub use exec::{ExecCall, FakeExecRunner, FakeResponse};
#[cfg(any(test, feature = "test-support"))]
pub use session::{FakeSessionAdapter, SessionCall};
