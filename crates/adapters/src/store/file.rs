// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bead store persisted as a JSON array on disk

use super::{BeadStore, Formula, MemoryBeadStore, StoreError};
use async_trait::async_trait;
use gc_core::{Bead, BeadId, BeadUpdate, Clock, NewBead, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File-backed bead store.
///
/// The whole set is rewritten after every mutation: serialized to a
/// sibling temp file, then renamed over the original, so a crash never
/// leaves a half-written store behind.
#[derive(Clone)]
pub struct JsonFileBeadStore<C: Clock = SystemClock> {
    inner: MemoryBeadStore<C>,
    path: Arc<PathBuf>,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl JsonFileBeadStore<SystemClock> {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with_clock(path, SystemClock).await
    }
}

impl<C: Clock> JsonFileBeadStore<C> {
    /// Open the store at `path`, loading existing beads. A missing file is
    /// an empty store.
    pub async fn open_with_clock(path: impl Into<PathBuf>, clock: C) -> Result<Self, StoreError> {
        let path = path.into();
        let inner = MemoryBeadStore::with_clock(clock);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let beads: Vec<Bead> = serde_json::from_slice(&bytes)?;
                tracing::debug!(path = %path.display(), count = beads.len(), "loaded bead store");
                for bead in beads {
                    inner.insert(bead);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(Self { inner, path: Arc::new(path), write_lock: Arc::new(tokio::sync::Mutex::new(())) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let json = serde_json::to_vec_pretty(&self.inner.snapshot())?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &*self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl<C: Clock> BeadStore for JsonFileBeadStore<C> {
    fn register_formula(&self, formula: Formula) {
        self.inner.register_formula(formula);
    }

    async fn create(&self, new: NewBead) -> Result<BeadId, StoreError> {
        let id = self.inner.create_now(new)?;
        self.persist().await?;
        Ok(id)
    }

    async fn get(&self, id: &BeadId) -> Result<Bead, StoreError> {
        self.inner.get(id).await
    }

    async fn list(&self) -> Result<Vec<Bead>, StoreError> {
        self.inner.list().await
    }

    async fn latest_with_label(&self, label: &str) -> Result<Option<Bead>, StoreError> {
        Ok(self.inner.latest_now(label))
    }

    async fn children(&self, parent: &BeadId) -> Result<Vec<Bead>, StoreError> {
        self.inner.children(parent).await
    }

    async fn update(&self, id: &BeadId, update: BeadUpdate) -> Result<Bead, StoreError> {
        let bead = self.inner.update_now(id, update)?;
        self.persist().await?;
        Ok(bead)
    }

    async fn mol_cook(
        &self,
        formula: &str,
        title: &str,
        labels: &[String],
    ) -> Result<BeadId, StoreError> {
        let id = self.inner.cook_now(formula, title, labels)?;
        self.persist().await?;
        Ok(id)
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
