// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gc_core::{BeadStatus, FakeClock};
use std::time::Duration;

fn store() -> (MemoryBeadStore<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    (MemoryBeadStore::with_clock(clock.clone()), clock)
}

#[tokio::test]
async fn create_get_close() {
    let (store, _) = store();
    let id = store.create(NewBead::new("task", "fix the roof").label("urgent")).await.unwrap();
    let bead = store.get(&id).await.unwrap();
    assert_eq!(bead.title, "fix the roof");
    assert_eq!(bead.status, BeadStatus::Open);
    assert!(bead.has_label("urgent"));

    store.close(&id).await.unwrap();
    assert_eq!(store.get(&id).await.unwrap().status, BeadStatus::Closed);
}

#[tokio::test]
async fn get_missing_is_not_found() {
    let (store, _) = store();
    let err = store.get(&BeadId::new("gc-nope")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn latest_with_label_prefers_newest() {
    let (store, clock) = store();
    store.create(NewBead::new("run", "first").label("x")).await.unwrap();
    clock.advance(Duration::from_secs(10));
    let second = store.create(NewBead::new("run", "second").label("x")).await.unwrap();
    clock.advance(Duration::from_secs(10));
    store.create(NewBead::new("run", "unrelated").label("y")).await.unwrap();

    let latest = store.latest_with_label("x").await.unwrap().unwrap();
    assert_eq!(latest.id, second);
    assert!(store.latest_with_label("z").await.unwrap().is_none());
}

#[tokio::test]
async fn latest_with_label_tie_goes_to_later_bead() {
    let (store, _) = store();
    store.create(NewBead::new("run", "a").label("x")).await.unwrap();
    let b = store.create(NewBead::new("run", "b").label("x")).await.unwrap();
    assert_eq!(store.latest_with_label("x").await.unwrap().unwrap().id, b);
}

#[tokio::test]
async fn mol_cook_creates_molecule_with_steps() {
    let (store, _) = store();
    store.register_formula(Formula::new("triage", vec!["read".into(), "label".into()]));

    let labels = vec!["pool:mayor".to_string()];
    let root = store.mol_cook("triage", "triage run", &labels).await.unwrap();

    let bead = store.get(&root).await.unwrap();
    assert_eq!(bead.kind, MOLECULE_KIND);
    assert!(bead.has_label("pool:mayor"));
    assert!(bead.has_label("formula:triage"));

    let children = store.children(&root).await.unwrap();
    let titles: Vec<_> = children.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["read", "label"]);
    assert!(children.iter().all(|c| c.kind == STEP_KIND));
}

#[tokio::test]
async fn mol_cook_unknown_formula() {
    let (store, _) = store();
    let err = store.mol_cook("missing", "t", &[]).await.unwrap_err();
    assert!(matches!(err, StoreError::UnknownFormula(ref f) if f == "missing"));
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_labels() {
    let (store, _) = store();
    let id = store.create(NewBead::new("task", "t").label("a")).await.unwrap();
    let update = BeadUpdate {
        add_labels: vec!["b".into()],
        remove_labels: vec!["a".into()],
        ..BeadUpdate::default()
    };
    let bead = store.update(&id, update).await.unwrap();
    assert_eq!(bead.labels, vec!["b".to_string()]);
}

#[tokio::test]
async fn injected_faults() {
    let (store, _) = store();
    store.register_formula(Formula::new("f", vec![]));
    store.set_fail_create(true);
    store.set_fail_cook(true);
    assert!(store.create(NewBead::new("task", "t")).await.is_err());
    assert!(store.mol_cook("f", "t", &[]).await.is_err());

    store.set_fail_create(false);
    assert!(store.create(NewBead::new("task", "t")).await.is_ok());
}

#[tokio::test]
async fn tracking_records_keep_only_the_latest_run() {
    let (store, clock) = store();
    let label = "automation-run:db-health:rig:demo";
    store.create(NewBead::new("automation-run", "run 1").label(label)).await.unwrap();
    store.create(NewBead::new("automation-run", "other").label("automation-run:db-health")).await.unwrap();
    store.create(NewBead::new("task", "follow-up").label(label)).await.unwrap();
    clock.advance(Duration::from_secs(60));
    let latest = store
        .create(NewBead::new("automation-run", "run 2").label(label).label("exec"))
        .await
        .unwrap();

    let beads = store.list().await.unwrap();
    let titles: Vec<_> = beads.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["other", "follow-up", "run 2"]);
    assert_eq!(store.latest_with_label(label).await.unwrap().map(|b| b.id), Some(latest));
}
