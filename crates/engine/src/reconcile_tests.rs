// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::FakeWorktrees;
use gc_adapters::{FakeEventSink, FakeSessionAdapter, SessionCall};
use gc_core::test_support::{agent_instance, TEST_CITY};
use gc_core::{session_prefix, ConfigHash};
use std::path::PathBuf;

struct Harness {
    sessions: FakeSessionAdapter,
    events: FakeEventSink,
    worktrees: FakeWorktrees,
    reconciler: Reconciler<FakeSessionAdapter, FakeEventSink, FakeWorktrees>,
}

fn harness() -> Harness {
    let sessions = FakeSessionAdapter::new();
    let events = FakeEventSink::new();
    let worktrees = FakeWorktrees::new();
    let reconciler = Reconciler::new(sessions.clone(), events.clone(), worktrees.clone());
    Harness { sessions, events, worktrees, reconciler }
}

fn prefix() -> String {
    session_prefix(TEST_CITY)
}

async fn run(h: &Harness, desired: &[AgentInstance], suspended: &[&AgentInstance]) -> ReconcileReport {
    let suspended: HashSet<SessionName> = suspended.iter().map(|a| a.session.clone()).collect();
    h.reconciler.reconcile(desired, &suspended, &prefix()).await
}

#[tokio::test]
async fn starts_absent_agents_and_stores_hash() {
    let h = harness();
    let mayor = agent_instance("mayor", "claude");
    let report = run(&h, std::slice::from_ref(&mayor), &[]).await;

    assert_eq!(report.started, 1);
    assert_eq!(report.lines.last().map(String::as_str), Some(CITY_STARTED));
    assert_eq!(h.sessions.stored_hash(mayor.session.as_str()), Some(mayor.config.fingerprint()));
    assert_eq!(h.events.names(), vec!["agent.started"]);
    assert_eq!(h.events.recorded()[0].0, ACTOR);
}

#[tokio::test]
async fn second_pass_is_idempotent() {
    let h = harness();
    let desired = vec![agent_instance("mayor", "claude"), agent_instance("demo/witness", "claude")];
    run(&h, &desired, &[]).await;
    h.sessions.clear_calls();
    h.events.clear();

    let report = run(&h, &desired, &[]).await;
    assert!(report.is_noop());
    assert_eq!(report.lines, vec![CITY_STARTED.to_string()]);
    assert!(h.sessions.calls().is_empty());
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn drift_restarts_exactly_once() {
    let h = harness();
    let old = agent_instance("mayor", "claude");
    run(&h, std::slice::from_ref(&old), &[]).await;

    let mut new = old.clone();
    new.config.command = "claude --resume".to_string();
    h.sessions.clear_calls();
    h.events.clear();

    let report = run(&h, std::slice::from_ref(&new), &[]).await;
    assert_eq!(report.restarted, 1);
    assert_eq!(
        h.sessions.calls(),
        vec![
            SessionCall::Stop(new.session.clone()),
            SessionCall::Start(new.session.clone()),
            SessionCall::StoreHash(new.session.clone(), new.config.fingerprint()),
        ]
    );
    assert_eq!(h.events.names(), vec!["agent.started"]);

    h.sessions.clear_calls();
    let report = run(&h, std::slice::from_ref(&new), &[]).await;
    assert!(report.is_noop());
    assert!(h.sessions.calls().is_empty());
}

#[tokio::test]
async fn missing_hash_is_not_drift() {
    let h = harness();
    let mayor = agent_instance("mayor", "claude");
    h.sessions.add_running(mayor.session.clone(), None);

    let report = run(&h, std::slice::from_ref(&mayor), &[]).await;
    assert!(report.is_noop());
}

#[tokio::test]
async fn hash_lookup_error_is_not_drift() {
    let h = harness();
    let mayor = agent_instance("mayor", "claude");
    h.sessions.add_running(mayor.session.clone(), Some(ConfigHash::new("stale")));
    h.sessions.set_fail_hash_lookup(true);

    let report = run(&h, std::slice::from_ref(&mayor), &[]).await;
    assert!(report.is_noop());
    assert!(h.sessions.is_running(&mayor.session).await);
}

#[tokio::test]
async fn drift_stop_failure_skips_start() {
    let h = harness();
    let mayor = agent_instance("mayor", "claude");
    h.sessions.add_running(mayor.session.clone(), Some(ConfigHash::new("stale")));
    h.sessions.fail_stop(mayor.session.clone());

    let report = run(&h, std::slice::from_ref(&mayor), &[]).await;
    assert_eq!(report.failed, 1);
    assert_eq!(h.sessions.calls(), vec![SessionCall::Stop(mayor.session.clone())]);
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn suspended_running_agent_is_stopped() {
    let h = harness();
    let mayor = agent_instance("mayor", "claude");
    h.sessions.add_running(mayor.session.clone(), Some(mayor.config.fingerprint()));

    let report = run(&h, std::slice::from_ref(&mayor), &[&mayor]).await;
    assert_eq!(report.stopped, 1);
    assert!(!h.sessions.is_running(&mayor.session).await);
    assert_eq!(
        h.events.events(),
        vec![Event::AgentStopped {
            agent: "mayor".to_string(),
            session: mayor.session.clone(),
            reason: StopReason::Suspended,
        }]
    );
}

#[tokio::test]
async fn suspended_absent_agent_is_left_alone() {
    let h = harness();
    let mayor = agent_instance("mayor", "claude");
    let report = run(&h, std::slice::from_ref(&mayor), &[&mayor]).await;
    assert_eq!(report.lines, vec!["Skipped suspended agent 'mayor'".to_string(), CITY_STARTED.to_string()]);
    assert!(h.sessions.calls().is_empty());
}

#[tokio::test]
async fn orphans_are_stopped() {
    let h = harness();
    let mayor = agent_instance("mayor", "claude");
    let orphan = format!("{}worker-4", prefix());
    h.sessions.add_running(orphan.as_str(), None);
    h.sessions.add_running("gc-other-city-mayor", None);

    let report = run(&h, std::slice::from_ref(&mayor), &[]).await;
    assert_eq!(report.started, 1);
    assert_eq!(report.stopped, 1);
    assert_eq!(
        h.sessions.running(),
        vec![SessionName::new("gc-other-city-mayor"), mayor.session.clone()]
    );
    assert!(h.events.events().contains(&Event::AgentStopped {
        agent: orphan.clone(),
        session: SessionName::new(orphan),
        reason: StopReason::Orphaned,
    }));
}

#[tokio::test]
async fn list_failure_skips_orphan_sweep() {
    let h = harness();
    h.sessions.add_running(format!("{}ghost", prefix()), None);
    h.sessions.set_fail_list(true);

    let report = run(&h, &[], &[]).await;
    assert_eq!(report.lines, vec![CITY_STARTED.to_string()]);
    assert_eq!(h.sessions.running().len(), 1);
}

#[tokio::test]
async fn start_failure_does_not_stop_the_pass() {
    let h = harness();
    let a = agent_instance("a", "run");
    let b = agent_instance("b", "run");
    h.sessions.fail_start(a.session.clone());

    let report = run(&h, &[a.clone(), b.clone()], &[]).await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.started, 1);
    assert!(h.sessions.is_running(&b.session).await);
    assert!(report.lines[0].starts_with("Failed agent 'a'"));
    assert_eq!(report.lines.last().map(String::as_str), Some(CITY_STARTED));
}

#[tokio::test]
async fn worktree_agents_sync_before_start() {
    let h = harness();
    let mut agent = agent_instance("demo/polecat", "run");
    agent.worktree = Some(PathBuf::from("/city/worktrees/demo/polecat"));
    agent.session_setup = vec!["tmux set status off".to_string()];

    run(&h, std::slice::from_ref(&agent), &[]).await;
    assert_eq!(h.worktrees.synced(), vec![PathBuf::from("/city/worktrees/demo/polecat")]);
    assert!(h
        .sessions
        .calls()
        .contains(&SessionCall::Setup(agent.session.clone(), "tmux set status off".to_string())));
}
