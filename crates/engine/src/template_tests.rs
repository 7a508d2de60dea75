// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn vars() -> TemplateVars {
    TemplateVars::new("worker-2", Some("demo"), Path::new("/city"), "gastown")
        .with_work_dir(Path::new("/city/demo"))
}

#[yare::parameterized(
    plain        = { "no placeholders", "no placeholders" },
    agent        = { "/tmp/${agent}", "/tmp/worker-2" },
    rig          = { "${city.root}/rigs/${rig}", "/city/rigs/demo" },
    city_name    = { "${city.name}-${agent}", "gastown-worker-2" },
    work_dir     = { "cd ${work_dir} && make", "cd /city/demo && make" },
    repeated     = { "${agent}/${agent}", "worker-2/worker-2" },
    unknown      = { "${agent}/${nope}", "${agent}/${nope}" },
    unterminated = { "${agent}/${rig", "${agent}/${rig" },
    empty_name   = { "${}", "${}" },
    bad_name     = { "${1abc}", "${1abc}" },
)]
fn expands(template: &str, expected: &str) {
    assert_eq!(expand(template, &vars()), expected);
}

#[test]
fn missing_rig_expands_empty() {
    let vars = TemplateVars::new("mayor", None, Path::new("/city"), "gastown");
    assert_eq!(expand("x${rig}y", &vars), "xy");
}

#[test]
fn work_dir_unset_fails_open() {
    let vars = TemplateVars::new("mayor", None, Path::new("/city"), "gastown");
    assert_eq!(expand("cd ${work_dir}", &vars), "cd ${work_dir}");
}
