// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bead (work item) store adapters

mod file;
mod memory;

pub use file::JsonFileBeadStore;
pub use memory::MemoryBeadStore;

use async_trait::async_trait;
use gc_core::{Bead, BeadId, BeadStatus, BeadUpdate, NewBead};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of the root bead created by cooking a formula.
pub const MOLECULE_KIND: &str = "molecule";

/// Kind of each step bead under a molecule.
pub const STEP_KIND: &str = "step";

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bead not found: {0}")]
    NotFound(BeadId),
    #[error("unknown formula: {0}")]
    UnknownFormula(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt store: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("{0}")]
    Injected(String),
}

/// A named work template. Cooking it creates a molecule bead with one
/// child step bead per entry in `steps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<String>,
}

impl Formula {
    pub fn new(name: impl Into<String>, steps: Vec<String>) -> Self {
        Self { name: name.into(), steps }
    }
}

/// Store of beads, the controller's unit of tracked work.
#[async_trait]
pub trait BeadStore: Clone + Send + Sync + 'static {
    /// Make `formula` available to [`BeadStore::mol_cook`], replacing any
    /// formula of the same name.
    fn register_formula(&self, formula: Formula);

    async fn create(&self, new: NewBead) -> Result<BeadId, StoreError>;

    async fn get(&self, id: &BeadId) -> Result<Bead, StoreError>;

    /// All beads in creation order.
    async fn list(&self) -> Result<Vec<Bead>, StoreError>;

    async fn children(&self, parent: &BeadId) -> Result<Vec<Bead>, StoreError>;

    async fn update(&self, id: &BeadId, update: BeadUpdate) -> Result<Bead, StoreError>;

    /// Instantiate `formula` as a molecule titled `title`, applying `labels`
    /// to the root bead. Returns the root bead's ID.
    async fn mol_cook(
        &self,
        formula: &str,
        title: &str,
        labels: &[String],
    ) -> Result<BeadId, StoreError>;

    async fn close(&self, id: &BeadId) -> Result<(), StoreError> {
        let update = BeadUpdate { status: Some(BeadStatus::Closed), ..BeadUpdate::default() };
        self.update(id, update).await.map(|_| ())
    }

    /// Most recently created bead carrying `label`. Ties on timestamp go to
    /// the later-created bead.
    async fn latest_with_label(&self, label: &str) -> Result<Option<Bead>, StoreError> {
        let beads = self.list().await?;
        Ok(beads.into_iter().filter(|b| b.has_label(label)).max_by_key(|b| b.created_at_ms))
    }
}
