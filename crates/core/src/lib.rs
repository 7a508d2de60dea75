// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gc-core: domain types for the Gas City control loop.
//!
//! Everything here is pure: no processes, no filesystem, no sockets. The
//! adapters crate owns I/O and the engine crate owns the control logic.

pub mod macros;

pub mod agent;
pub mod automation;
pub mod bead;
pub mod clock;
pub mod duration;
pub mod event;
pub mod id;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent::{
    qualified_name, validate_name, AgentInstance, AgentSpec, Isolation, NameError, PoolSpec,
    MAX_POOL_SIZE,
};
pub use automation::{Automation, AutomationAction, Gate};
pub use bead::{Bead, BeadId, BeadStatus, BeadUpdate, NewBead};
pub use clock::{Clock, FakeClock, SystemClock};
pub use duration::{format_duration, parse_duration};
pub use event::{Event, EventRecord, StopReason};
pub use id::short;
pub use session::{session_name, session_prefix, ConfigHash, SessionConfig, SessionName};
