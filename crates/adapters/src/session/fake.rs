// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory session adapter with a call log and failure injection

use super::{SessionAdapter, SessionError};
use async_trait::async_trait;
use gc_core::{ConfigHash, SessionConfig, SessionName};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Recorded mutating call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Start(SessionName),
    Stop(SessionName),
    StoreHash(SessionName, ConfigHash),
    Setup(SessionName, String),
}

/// A live fake session
#[derive(Debug, Clone)]
pub struct FakeSession {
    pub config: Option<SessionConfig>,
    pub hash: Option<ConfigHash>,
}

#[derive(Default)]
struct FakeSessionState {
    sessions: BTreeMap<SessionName, FakeSession>,
    calls: Vec<SessionCall>,
    fail_start: HashSet<SessionName>,
    fail_stop: HashSet<SessionName>,
    fail_list: bool,
    fail_hash_lookup: bool,
}

/// Fake session adapter for testing
#[derive(Clone, Default)]
pub struct FakeSessionAdapter {
    inner: Arc<Mutex<FakeSessionState>>,
}

impl FakeSessionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a running session that was started outside the adapter.
    pub fn add_running(&self, name: impl Into<SessionName>, hash: Option<ConfigHash>) {
        self.inner.lock().sessions.insert(name.into(), FakeSession { config: None, hash });
    }

    /// Make the session vanish, as if its process exited.
    pub fn kill_externally(&self, name: &str) {
        self.inner.lock().sessions.remove(name);
    }

    pub fn fail_start(&self, name: impl Into<SessionName>) {
        self.inner.lock().fail_start.insert(name.into());
    }

    pub fn fail_stop(&self, name: impl Into<SessionName>) {
        self.inner.lock().fail_stop.insert(name.into());
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.inner.lock().fail_list = fail;
    }

    pub fn set_fail_hash_lookup(&self, fail: bool) {
        self.inner.lock().fail_hash_lookup = fail;
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Names of live sessions, sorted.
    pub fn running(&self) -> Vec<SessionName> {
        self.inner.lock().sessions.keys().cloned().collect()
    }

    pub fn session(&self, name: &str) -> Option<FakeSession> {
        self.inner.lock().sessions.get(name).cloned()
    }

    pub fn stored_hash(&self, name: &str) -> Option<ConfigHash> {
        self.inner.lock().sessions.get(name).and_then(|s| s.hash.clone())
    }
}

#[async_trait]
impl SessionAdapter for FakeSessionAdapter {
    async fn is_running(&self, name: &SessionName) -> bool {
        self.inner.lock().sessions.contains_key(name)
    }

    async fn start(&self, name: &SessionName, config: &SessionConfig) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::Start(name.clone()));
        if inner.fail_start.contains(name) {
            return Err(SessionError::SpawnFailed(format!("{name}: injected failure")));
        }
        if inner.sessions.contains_key(name) {
            return Err(SessionError::SpawnFailed(format!("duplicate session: {name}")));
        }
        inner
            .sessions
            .insert(name.clone(), FakeSession { config: Some(config.clone()), hash: None });
        Ok(())
    }

    async fn stop(&self, name: &SessionName) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::Stop(name.clone()));
        if inner.fail_stop.contains(name) {
            return Err(SessionError::CommandFailed(format!("{name}: injected failure")));
        }
        inner.sessions.remove(name);
        Ok(())
    }

    async fn list_running(&self, prefix: &str) -> Result<Vec<SessionName>, SessionError> {
        let inner = self.inner.lock();
        if inner.fail_list {
            return Err(SessionError::CommandFailed("injected list failure".to_string()));
        }
        Ok(inner.sessions.keys().filter(|n| n.as_str().starts_with(prefix)).cloned().collect())
    }

    async fn store_config_hash(
        &self,
        name: &SessionName,
        hash: &ConfigHash,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::StoreHash(name.clone(), hash.clone()));
        match inner.sessions.get_mut(name) {
            Some(session) => {
                session.hash = Some(hash.clone());
                Ok(())
            }
            None => Err(SessionError::NotFound(name.to_string())),
        }
    }

    async fn config_hash(&self, name: &SessionName) -> Result<Option<ConfigHash>, SessionError> {
        let inner = self.inner.lock();
        if inner.fail_hash_lookup {
            return Err(SessionError::CommandFailed("injected hash lookup failure".to_string()));
        }
        match inner.sessions.get(name) {
            Some(session) => Ok(session.hash.clone()),
            None => Err(SessionError::NotFound(name.to_string())),
        }
    }

    async fn run_setup(&self, name: &SessionName, command: &str) -> Result<(), SessionError> {
        self.inner.lock().calls.push(SessionCall::Setup(name.clone(), command.to_string()));
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
