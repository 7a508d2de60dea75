// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[yare::parameterized(
    city_scoped = { None,         "mayor",  "mayor" },
    rig_scoped  = { Some("demo"), "worker", "demo/worker" },
    empty_rig   = { Some(""),     "mayor",  "mayor" },
)]
fn qualified_name_cases(rig: Option<&str>, name: &str, expected: &str) {
    assert_eq!(qualified_name(rig, name), expected);
}

#[yare::parameterized(
    plain       = { "worker",    true },
    dashed      = { "db-health", true },
    underscored = { "db_health", true },
    empty       = { "",          false },
    blank       = { "  ",        false },
    slash       = { "a/b",       false },
    double      = { "a--b",      false },
    dot         = { "a.b",       false },
    colon       = { "a:b",       false },
    leading     = { "-a",        false },
    trailing    = { "a-",        false },
)]
fn validate_name_cases(name: &str, ok: bool) {
    assert_eq!(validate_name("agent", name).is_ok(), ok);
}

#[test]
fn agent_spec_setters_chain() {
    let spec = AgentSpec::new("worker", "claude")
        .rig("demo")
        .work_dir("${city.root}/demo")
        .pool(PoolSpec::new(0, 5, "echo 3"))
        .isolation(Isolation::Worktree)
        .suspended(true);
    assert_eq!(spec.qualified_name(), "demo/worker");
    assert_eq!(spec.pool.as_ref().map(|p| p.max), Some(5));
    assert_eq!(spec.isolation, Isolation::Worktree);
    assert!(spec.suspended);
}

#[test]
fn isolation_display_and_serde() {
    assert_eq!(Isolation::Worktree.to_string(), "worktree");
    let parsed: Isolation = serde_json::from_str("\"worktree\"").unwrap();
    assert_eq!(parsed, Isolation::Worktree);
    assert_eq!(Isolation::default(), Isolation::None);
}

#[test]
fn singleton_pool() {
    assert!(PoolSpec::new(0, 1, "true").is_singleton());
    assert!(!PoolSpec::new(1, 2, "true").is_singleton());
}

proptest! {
    #[test]
    fn pool_clamp_stays_in_bounds(min in 0u32..10, span in 0u32..10, n in any::<i64>()) {
        let pool = PoolSpec::new(min, min + span, "true");
        let count = pool.clamp(n);
        prop_assert!(count >= pool.min && count <= pool.max);
        if n >= i64::from(pool.min) && n <= i64::from(pool.max) {
            prop_assert_eq!(i64::from(count), n);
        }
    }
}

#[test]
fn clamp_tolerates_inverted_bounds() {
    let pool = PoolSpec::new(3, 1, "true");
    assert_eq!(pool.clamp(0), 1);
    assert_eq!(pool.clamp(10), 1);
}
