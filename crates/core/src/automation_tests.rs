// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn cooldown(name: &str) -> Automation {
    Automation::new(
        name,
        Gate::Cooldown { interval: Duration::from_secs(3600) },
        AutomationAction::Exec { script: "check.sh".to_string() },
    )
}

#[test]
fn tracking_label_is_scoped_by_rig() {
    assert_eq!(cooldown("db-health").tracking_label(), "automation-run:db-health");
    assert_eq!(
        cooldown("db-health").rig("demo").tracking_label(),
        "automation-run:db-health:rig:demo"
    );
    assert_ne!(
        cooldown("db-health").rig("demo").tracking_label(),
        cooldown("db-health").rig("prod").tracking_label()
    );
}

#[yare::parameterized(
    none               = { None,         None,              None },
    city_pool          = { None,         Some("dog"),       Some("pool:dog") },
    rig_pool           = { Some("demo"), Some("dog"),       Some("pool:demo/dog") },
    already_qualified  = { Some("demo"), Some("other/dog"), Some("pool:other/dog") },
    empty_pool         = { Some("demo"), Some(""),          None },
)]
fn pool_label_cases(rig: Option<&str>, pool: Option<&str>, expected: Option<&str>) {
    let mut auto = cooldown("a");
    auto.rig = rig.map(str::to_string);
    auto.pool = pool.map(str::to_string);
    assert_eq!(auto.pool_label().as_deref(), expected);
}

#[yare::parameterized(
    exec_default       = { true,  None,      None,      60 },
    formula_default    = { false, None,      None,      30 },
    declared_overrides = { true,  Some(120), None,      120 },
    cap_bounds_default = { true,  None,      Some(10),  10 },
    cap_bounds_declared = { false, Some(90), Some(45),  45 },
    cap_above          = { false, None,      Some(600), 30 },
)]
fn effective_timeout_cases(exec: bool, declared: Option<u64>, cap: Option<u64>, expected: u64) {
    let action = if exec {
        AutomationAction::Exec { script: "x".to_string() }
    } else {
        AutomationAction::Formula { formula: "mol-x".to_string() }
    };
    let mut auto = Automation::new("a", Gate::Manual, action);
    auto.timeout = declared.map(Duration::from_secs);
    assert_eq!(
        auto.effective_timeout(cap.map(Duration::from_secs)),
        Duration::from_secs(expected)
    );
}

#[test]
fn gate_and_action_display() {
    assert_eq!(Gate::Manual.to_string(), "manual");
    assert_eq!(Gate::Cooldown { interval: Duration::ZERO }.to_string(), "cooldown");
    assert_eq!(Gate::Condition { check: "true".into() }.to_string(), "condition");
    assert_eq!(AutomationAction::Exec { script: "s".into() }.to_string(), "exec");
    assert!(cooldown("a").action.is_exec());
    assert!(!cooldown("a").is_manual());
}
