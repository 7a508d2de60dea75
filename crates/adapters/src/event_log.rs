// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only event recording

use gc_core::{Clock, Event, EventRecord, SystemClock};
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Destination for controller events.
///
/// Recording is fire-and-forget: a sink that cannot write logs a warning
/// and drops the event rather than failing the operation that emitted it.
pub trait EventSink: Clone + Send + Sync + 'static {
    fn record(&self, actor: &str, event: Event);
}

/// Writes one JSON object per line to a file.
#[derive(Clone)]
pub struct JsonlEventLog<C: Clock = SystemClock> {
    path: Arc<PathBuf>,
    clock: C,
    lock: Arc<Mutex<()>>,
}

impl JsonlEventLog<SystemClock> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, SystemClock)
    }
}

impl<C: Clock> JsonlEventLog<C> {
    pub fn with_clock(path: impl Into<PathBuf>, clock: C) -> Self {
        Self { path: Arc::new(path.into()), clock, lock: Arc::new(Mutex::new(())) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: &EventRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let _guard = self.lock.lock();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file =
            std::fs::OpenOptions::new().create(true).append(true).open(self.path.as_path())?;
        file.write_all(line.as_bytes())
    }
}

impl<C: Clock> EventSink for JsonlEventLog<C> {
    fn record(&self, actor: &str, event: Event) {
        tracing::info!(actor, "{}", event.log_summary());
        let record = EventRecord::new(actor, event, self.clock.epoch_ms());
        if let Err(e) = self.append(&record) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to append event");
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::EventSink;
    use gc_core::Event;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Collects events in memory
    #[derive(Clone, Default)]
    pub struct FakeEventSink {
        events: Arc<Mutex<Vec<(String, Event)>>>,
    }

    impl FakeEventSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// All recorded `(actor, event)` pairs, in order
        pub fn recorded(&self) -> Vec<(String, Event)> {
            self.events.lock().clone()
        }

        pub fn events(&self) -> Vec<Event> {
            self.events.lock().iter().map(|(_, e)| e.clone()).collect()
        }

        /// Names of recorded events, in order
        pub fn names(&self) -> Vec<&'static str> {
            self.events.lock().iter().map(|(_, e)| e.name()).collect()
        }

        pub fn clear(&self) {
            self.events.lock().clear();
        }
    }

    impl EventSink for FakeEventSink {
        fn record(&self, actor: &str, event: Event) {
            self.events.lock().push((actor.to_string(), event));
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeEventSink;

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
