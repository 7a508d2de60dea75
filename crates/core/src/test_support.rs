// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{session_name, AgentInstance, SessionConfig};

// ── Proptest strategies ─────────────────────────────────────────────────

pub mod strategies {
    use crate::SessionConfig;
    use proptest::prelude::*;

    pub fn arb_session_config() -> impl Strategy<Value = SessionConfig> {
        (
            "[a-z]{1,8}( --[a-z]{1,6})?",
            "/[a-z]{1,6}(/[a-z]{1,6})?",
            proptest::collection::btree_map("[A-Z]{1,6}", "[a-z0-9]{0,6}", 0..4),
        )
            .prop_map(|(command, dir, env)| SessionConfig { command, work_dir: dir.into(), env })
    }
}

// ── Factory functions ───────────────────────────────────────────────────

/// City name used by test fixtures.
pub const TEST_CITY: &str = "test";

/// A desired agent in [`TEST_CITY`] running `command` in `/work/{name}`.
pub fn agent_instance(qualified: &str, command: &str) -> AgentInstance {
    let dir = format!("/work/{}", qualified);
    AgentInstance::new(
        qualified,
        session_name(TEST_CITY, qualified, None),
        SessionConfig::new(command, dir).with_env("GC_AGENT", qualified),
    )
}
