//! ActionJournal implementations.
//!
//! The journal is an in-memory record of what was dispatched and who caused
//! it. It is a debugging and assertion aid, not a persistence layer.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bus::lock;

/// One dispatched action as the store saw it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the store's total dispatch order, starting at 1.
    pub seq: u64,
    pub ts: DateTime<Utc>,
    pub action_type: String,
    /// `"user"` for external dispatches, otherwise the emitting epic's name.
    pub origin: String,
    pub payload: serde_json::Value,
}

/// Receives every action the store dispatches, under the dispatch lock.
///
/// Implemented by `MemoryJournal` and by `Arc<J>` so a journal can be shared
/// with the test that inspects it.
pub trait ActionJournal: Send + Sync {
    fn record(&self, entry: JournalEntry);
}

// ---------------------------------------------------------------------------
// MemoryJournal
// ---------------------------------------------------------------------------

/// In-memory journal. Thread-safe.
#[derive(Default)]
pub struct MemoryJournal {
    entries: Mutex<Vec<JournalEntry>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        lock(&self.entries).clone()
    }

    /// Discriminants in dispatch order.
    pub fn action_types(&self) -> Vec<String> {
        lock(&self.entries)
            .iter()
            .map(|e| e.action_type.clone())
            .collect()
    }

    pub fn of_type(&self, action_type: &str) -> Vec<JournalEntry> {
        lock(&self.entries)
            .iter()
            .filter(|e| e.action_type == action_type)
            .cloned()
            .collect()
    }

    pub fn count(&self, action_type: &str) -> usize {
        lock(&self.entries)
            .iter()
            .filter(|e| e.action_type == action_type)
            .count()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ActionJournal for MemoryJournal {
    fn record(&self, entry: JournalEntry) {
        lock(&self.entries).push(entry);
    }
}

impl<J: ActionJournal + ?Sized> ActionJournal for Arc<J> {
    fn record(&self, entry: JournalEntry) {
        (**self).record(entry)
    }
}
