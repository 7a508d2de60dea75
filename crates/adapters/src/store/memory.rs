// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory bead store

use super::{BeadStore, Formula, StoreError, MOLECULE_KIND, STEP_KIND};
use async_trait::async_trait;
use gc_core::automation::TRACKING_KIND;
use gc_core::{Bead, BeadId, BeadUpdate, Clock, NewBead, SystemClock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// The `automation-run:<scoped>` label of a tracking record.
fn tracking_label(labels: &[String]) -> Option<&str> {
    labels
        .iter()
        .map(String::as_str)
        .find(|l| l.strip_prefix(TRACKING_KIND).is_some_and(|rest| rest.starts_with(':')))
}

#[derive(Default)]
struct Faults {
    create: bool,
    cook: bool,
}

#[derive(Default)]
struct StoreState {
    beads: Vec<Bead>,
    formulas: HashMap<String, Formula>,
    faults: Faults,
}

/// Bead store held entirely in memory. Also the working set behind
/// [`JsonFileBeadStore`](super::JsonFileBeadStore).
#[derive(Clone)]
pub struct MemoryBeadStore<C: Clock = SystemClock> {
    state: Arc<Mutex<StoreState>>,
    clock: C,
}

impl MemoryBeadStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryBeadStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryBeadStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { state: Arc::new(Mutex::new(StoreState::default())), clock }
    }

    /// Insert an existing bead as-is (used when loading from disk).
    pub fn insert(&self, bead: Bead) {
        self.state.lock().beads.push(bead);
    }

    pub(super) fn snapshot(&self) -> Vec<Bead> {
        self.state.lock().beads.clone()
    }

    pub(super) fn create_now(&self, new: NewBead) -> Result<BeadId, StoreError> {
        let mut state = self.state.lock();
        if state.faults.create {
            return Err(StoreError::Injected("injected create failure".to_string()));
        }
        if new.kind == TRACKING_KIND {
            // Only the latest run record per automation is ever read
            if let Some(label) = tracking_label(&new.labels) {
                let label = label.to_string();
                state.beads.retain(|b| !(b.kind == TRACKING_KIND && b.has_label(&label)));
            }
        }
        let id = BeadId::generate();
        state.beads.push(Bead::from_new(id.clone(), new, self.clock.epoch_ms()));
        Ok(id)
    }

    pub(super) fn latest_now(&self, label: &str) -> Option<Bead> {
        let state = self.state.lock();
        state.beads.iter().filter(|b| b.has_label(label)).max_by_key(|b| b.created_at_ms).cloned()
    }

    pub(super) fn update_now(&self, id: &BeadId, update: BeadUpdate) -> Result<Bead, StoreError> {
        let mut state = self.state.lock();
        let bead = state
            .beads
            .iter_mut()
            .find(|b| &b.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        bead.apply(update);
        Ok(bead.clone())
    }

    pub(super) fn cook_now(
        &self,
        formula: &str,
        title: &str,
        labels: &[String],
    ) -> Result<BeadId, StoreError> {
        let mut state = self.state.lock();
        if state.faults.cook {
            return Err(StoreError::Injected(format!("injected cook failure: {formula}")));
        }
        let steps = match state.formulas.get(formula) {
            Some(f) => f.steps.clone(),
            None => return Err(StoreError::UnknownFormula(formula.to_string())),
        };

        let now = self.clock.epoch_ms();
        let root_id = BeadId::generate();
        let root = NewBead::new(MOLECULE_KIND, title)
            .labels(labels.to_vec())
            .label(format!("formula:{formula}"));
        state.beads.push(Bead::from_new(root_id.clone(), root, now));
        for step in steps {
            let child = NewBead::new(STEP_KIND, step).parent(root_id.clone());
            state.beads.push(Bead::from_new(BeadId::generate(), child, now));
        }
        Ok(root_id)
    }
}

#[cfg(any(test, feature = "test-support"))]
impl<C: Clock> MemoryBeadStore<C> {
    pub fn set_fail_create(&self, fail: bool) {
        self.state.lock().faults.create = fail;
    }

    pub fn set_fail_cook(&self, fail: bool) {
        self.state.lock().faults.cook = fail;
    }
}

#[async_trait]
impl<C: Clock> BeadStore for MemoryBeadStore<C> {
    fn register_formula(&self, formula: Formula) {
        self.state.lock().formulas.insert(formula.name.clone(), formula);
    }

    async fn latest_with_label(&self, label: &str) -> Result<Option<Bead>, StoreError> {
        Ok(self.latest_now(label))
    }

    async fn create(&self, new: NewBead) -> Result<BeadId, StoreError> {
        self.create_now(new)
    }

    async fn get(&self, id: &BeadId) -> Result<Bead, StoreError> {
        let state = self.state.lock();
        state
            .beads
            .iter()
            .find(|b| &b.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn list(&self) -> Result<Vec<Bead>, StoreError> {
        Ok(self.snapshot())
    }

    async fn children(&self, parent: &BeadId) -> Result<Vec<Bead>, StoreError> {
        let state = self.state.lock();
        Ok(state.beads.iter().filter(|b| b.parent.as_ref() == Some(parent)).cloned().collect())
    }

    async fn update(&self, id: &BeadId, update: BeadUpdate) -> Result<Bead, StoreError> {
        self.update_now(id, update)
    }

    async fn mol_cook(
        &self,
        formula: &str,
        title: &str,
        labels: &[String],
    ) -> Result<BeadId, StoreError> {
        self.cook_now(formula, title, labels)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
