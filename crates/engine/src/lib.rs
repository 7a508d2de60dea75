// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Control logic for a city: session reconciliation, pool scaling,
//! worktree management and automation dispatch.

pub mod automation;
pub mod controller;
pub mod pool;
pub mod reconcile;
pub mod template;
pub mod worktree;

#[cfg(test)]
mod test_helpers;

pub use automation::{AutomationDispatcher, AutomationError};
pub use controller::{Controller, ControllerDeps, TickReport};
pub use pool::{
    instance_name, materialize_pool, parse_scale_output, PoolContext, PoolScaler, ScaleError,
    ScaleFailurePolicy,
};
pub use reconcile::{ReconcileError, ReconcileReport, Reconciler, CITY_STARTED};
pub use template::{expand, TemplateVars};
pub use worktree::{
    RigRef, SafetyFlags, SweepReport, Worktree, WorktreeError, WorktreeManager, WorktreeProvider,
};

/// Actor recorded on every event the controller emits.
pub const ACTOR: &str = "gc";
