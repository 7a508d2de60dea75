// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn bead() -> Bead {
    Bead::from_new(
        BeadId::new("gc-1"),
        NewBead::new("task", "fix flaky test").label("pool:demo/worker"),
        1_000,
    )
}

#[test]
fn from_new_starts_open() {
    let b = bead();
    assert_eq!(b.status, BeadStatus::Open);
    assert_eq!(b.created_at_ms, 1_000);
    assert!(b.has_label("pool:demo/worker"));
    assert!(!b.has_label("pool:demo"));
}

#[test]
fn apply_update_adds_removes_and_closes() {
    let mut b = bead();
    b.apply(BeadUpdate {
        title: Some("renamed".to_string()),
        status: Some(BeadStatus::Closed),
        add_labels: vec!["done".to_string(), "done".to_string()],
        remove_labels: vec!["pool:demo/worker".to_string()],
    });
    assert_eq!(b.title, "renamed");
    assert_eq!(b.status, BeadStatus::Closed);
    assert_eq!(b.labels, vec!["done".to_string()]);
}

#[test]
fn serde_omits_empty_fields() {
    let b = Bead::from_new(BeadId::new("gc-2"), NewBead::new("automation-run", "x"), 5);
    let json = serde_json::to_value(&b).unwrap();
    assert!(json.get("labels").is_none());
    assert!(json.get("parent").is_none());
    assert_eq!(json["status"], "open");

    let parsed: Bead = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, b);
}
