// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Beads: the generic record type of the work/tracking store.
//!
//! Work items, molecules cooked from formulas and automation tracking
//! records are all beads, told apart by `kind` and labels.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier of a bead in the store.
    pub struct BeadId("gc-");
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeadStatus {
    #[default]
    Open,
    Closed,
}

crate::simple_display! {
    BeadStatus {
        Open => "open",
        Closed => "closed",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bead {
    pub id: BeadId,
    pub title: String,
    pub kind: String,
    #[serde(default)]
    pub status: BeadStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<BeadId>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub created_at_ms: u64,
}

impl Bead {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Materialize a creation request with an assigned ID and timestamp.
    pub fn from_new(id: BeadId, new: NewBead, created_at_ms: u64) -> Self {
        Self {
            id,
            title: new.title,
            kind: new.kind,
            status: BeadStatus::Open,
            labels: new.labels,
            parent: new.parent,
            description: new.description,
            created_at_ms,
        }
    }

    pub fn apply(&mut self, update: BeadUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.labels.retain(|l| !update.remove_labels.contains(l));
        for label in update.add_labels {
            if !self.labels.contains(&label) {
                self.labels.push(label);
            }
        }
    }
}

/// Request to create a bead; the store assigns ID and timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBead {
    pub title: String,
    pub kind: String,
    pub labels: Vec<String>,
    pub parent: Option<BeadId>,
    pub description: String,
}

impl NewBead {
    pub fn new(kind: impl Into<String>, title: impl Into<String>) -> Self {
        Self { kind: kind.into(), title: title.into(), ..Self::default() }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    crate::setters! {
        into {
            description: String,
        }
        set {
            labels: Vec<String>,
        }
        option {
            parent: BeadId,
        }
    }
}

/// Partial update applied by `BeadStore::update`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeadUpdate {
    pub title: Option<String>,
    pub status: Option<BeadStatus>,
    pub add_labels: Vec<String>,
    pub remove_labels: Vec<String>,
}

#[cfg(test)]
#[path = "bead_tests.rs"]
mod tests;
