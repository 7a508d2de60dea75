// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

const CITY: &str = r#"
[city]
name = "gastown"
session_template = "${city}-${agent}"

[[rigs]]
name = "demo"
path = "rigs/demo"

[[rigs]]
name = "legacy"
path = "/srv/legacy"
suspended = true

[[agents]]
name = "mayor"
command = "claude"

[[agents]]
name = "polecat"
rig = "demo"
command = "claude --worker"
isolation = "worktree"
session_setup = ["cd ${work_dir}"]
env = { MODEL = "opus" }

[agents.pool]
max = 5
check = "bd ready --count"

[[agents]]
name = "witness"
rig = "legacy"
command = "claude"

[[automations]]
name = "db-health"
rig = "demo"
gate = "cooldown"
interval = "1h"
exec = "scripts/db-health.sh"
timeout = "2m"

[[automations]]
name = "triage"
gate = "condition"
check = "test -n \"$(bd ready)\""
formula = "triage"
pool = "polecat"

[[automations]]
name = "deploy"
gate = "manual"
exec = "deploy.sh"

[[formulas]]
name = "triage"
steps = ["read", "label"]
"#;

fn parse_city(text: &str) -> Result<CityConfig, ConfigError> {
    parse(Path::new("/city"), text)
}

#[test]
fn parses_full_city() {
    let city = parse_city(CITY).unwrap();
    assert_eq!(city.name, "gastown");
    assert_eq!(city.rigs[0], RigRef::new("demo", "/city/rigs/demo"));
    assert_eq!(city.rigs[1].path, PathBuf::from("/srv/legacy"));

    let mayor = &city.agents[0];
    assert_eq!(mayor.qualified_name(), "mayor");
    assert_eq!(mayor.work_dir, "");
    assert_eq!(mayor.session_template.as_deref(), Some("${city}-${agent}"));

    let polecat = &city.agents[1];
    assert_eq!(polecat.qualified_name(), "demo/polecat");
    assert_eq!(polecat.work_dir, "/city/rigs/demo");
    assert_eq!(polecat.isolation, Isolation::Worktree);
    assert_eq!(polecat.pool, Some(PoolSpec::new(0, 5, "bd ready --count")));
    assert_eq!(polecat.env["MODEL"], "opus");
    assert!(!polecat.suspended);

    // Inherited from the rig
    assert!(city.agents[2].suspended);

    assert_eq!(city.formulas, vec![Formula::new("triage", vec!["read".into(), "label".into()])]);
}

#[test]
fn parses_automations() {
    let city = parse_city(CITY).unwrap();
    let by_name = |n: &str| city.automations.iter().find(|a| a.name == n).unwrap();

    let db = by_name("db-health");
    assert_eq!(db.gate, Gate::Cooldown { interval: Duration::from_secs(3600) });
    assert_eq!(db.rig.as_deref(), Some("demo"));
    assert_eq!(db.timeout, Some(Duration::from_secs(120)));

    let triage = by_name("triage");
    assert!(matches!(triage.gate, Gate::Condition { .. }));
    assert_eq!(triage.action, AutomationAction::Formula { formula: "triage".into() });
    assert_eq!(triage.pool.as_deref(), Some("polecat"));

    // Manual gates load; the dispatcher drops them
    assert!(by_name("deploy").is_manual());
}

#[test]
fn city_suspension_covers_every_agent() {
    let text = r#"
[city]
name = "c"
suspended = true

[[agents]]
name = "mayor"
command = "claude"
"#;
    assert!(parse_city(text).unwrap().agents[0].suspended);
}

#[test]
fn city_name_defaults_to_directory() {
    let city = parse(Path::new("/srv/gastown"), "").unwrap();
    assert_eq!(city.name, "gastown");
    assert!(city.agents.is_empty());
}

#[test]
fn per_rig_automation_yields_to_rig_definition() {
    let text = r#"
[[rigs]]
name = "a"
path = "a"

[[rigs]]
name = "b"
path = "b"

[[automations]]
name = "lint"
gate = "cooldown"
interval = "10m"
exec = "lint.sh"
per_rig = true

[[automations]]
name = "lint"
rig = "b"
gate = "cooldown"
interval = "1h"
exec = "lint-strict.sh"
"#;
    let city = parse_city(text).unwrap();
    let mut scoped: Vec<_> = city
        .automations
        .iter()
        .map(|a| (a.scoped_name(), a.action.clone()))
        .collect();
    scoped.sort_by(|x, y| x.0.cmp(&y.0));
    assert_eq!(
        scoped,
        vec![
            ("lint:rig:a".to_string(), AutomationAction::Exec { script: "lint.sh".into() }),
            ("lint:rig:b".to_string(), AutomationAction::Exec { script: "lint-strict.sh".into() }),
        ]
    );
}

#[yare::parameterized(
    slash_in_agent  = { "[[agents]]\nname = \"a/b\"\ncommand = \"x\"\n", "must not contain '/'" },
    dashes_in_rig   = { "[[rigs]]\nname = \"a--b\"\npath = \"x\"\n", "must not contain '--'" },
    unknown_rig     = { "[[agents]]\nname = \"a\"\nrig = \"nope\"\ncommand = \"x\"\n", "unknown rig 'nope'" },
    empty_command   = { "[[agents]]\nname = \"a\"\ncommand = \" \"\n", "has no command" },
    pool_inverted   = { "[[agents]]\nname = \"a\"\ncommand = \"x\"\n[agents.pool]\nmin = 3\nmax = 1\ncheck = \"c\"\n", "min 3 exceeds max 1" },
    duplicate_agent = { "[[agents]]\nname = \"a\"\ncommand = \"x\"\n[[agents]]\nname = \"a\"\ncommand = \"y\"\n", "duplicate agent 'a'" },
    dotted_agent    = { "[[agents]]\nname = \"a.b\"\ncommand = \"x\"\n", "must not contain '.'" },
    edge_dash_rig   = { "[[rigs]]\nname = \"a-\"\npath = \"x\"\n", "must not start or end with '-'" },
    pool_too_large  = { "[[agents]]\nname = \"a\"\ncommand = \"x\"\n[agents.pool]\nmax = 1000\ncheck = \"c\"\n", "exceeds the limit" },
    no_action       = { "[[automations]]\nname = \"a\"\ngate = \"manual\"\n", "exactly one of" },
    two_actions     = { "[[automations]]\nname = \"a\"\ngate = \"manual\"\nexec = \"x\"\nformula = \"y\"\n", "exactly one of" },
    no_interval     = { "[[automations]]\nname = \"a\"\ngate = \"cooldown\"\nexec = \"x\"\n", "needs an interval" },
    bad_interval    = { "[[automations]]\nname = \"a\"\ngate = \"cooldown\"\ninterval = \"soon\"\nexec = \"x\"\n", "interval" },
    no_check        = { "[[automations]]\nname = \"a\"\ngate = \"condition\"\nexec = \"x\"\n", "needs a check" },
)]
fn rejects_invalid(text: &str, expected: &str) {
    let err = parse_city(text).unwrap_err();
    assert!(err.to_string().contains(expected), "{err}");
}

#[test]
fn unknown_fields_are_parse_errors() {
    let err = parse_city("[city]\nnmae = \"typo\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn load_reads_city_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(CITY_FILE), CITY).unwrap();
    let city = load(dir.path()).unwrap();
    assert_eq!(city.root, dir.path());
    assert_eq!(city.agents.len(), 3);
}

#[test]
fn load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load(dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn load_parse_error_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(CITY_FILE), "[city\n").unwrap();
    match load(dir.path()).unwrap_err() {
        ConfigError::Parse { path, .. } => assert_eq!(path, dir.path().join(CITY_FILE)),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn pool_instances_claim_their_session_names() {
    let text = r#"
[city]
name = "c"

[[agents]]
name = "worker"
command = "claude"

[agents.pool]
max = 3
check = "echo 3"

[[agents]]
name = "worker-2"
command = "claude"
"#;
    let err = parse_city(text).unwrap_err();
    assert!(err.to_string().contains("would share session 'gc-c-worker-2'"), "{err}");
}

#[test]
fn session_template_collisions_are_rejected() {
    let text = r#"
[city]
name = "c"

[[agents]]
name = "a"
command = "claude"
session_template = "x-${agent}"

[[agents]]
name = "x-a"
command = "claude"
"#;
    let err = parse_city(text).unwrap_err();
    assert!(err.to_string().contains("would share session"), "{err}");
}

#[test]
fn derived_city_name_may_contain_dots() {
    let city = parse(Path::new("/srv/gas.town"), "").unwrap();
    assert_eq!(city.name, "gas.town");
}
