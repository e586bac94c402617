//! Per-thread message history.
//!
//! Records carrying the reserved `history` name are decoded into a
//! thread-local [`MessageHistory`] instead of being delivered to handlers.
//! The history is reset before every record is read.

use crate::marshal::ReadMarshallable;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// Name of the record that carries message history.
pub const HISTORY: &str = "history";

thread_local! {
    static CURRENT: RefCell<MessageHistory> = RefCell::new(MessageHistory::default());
}

/// Where a message came from and when it passed through each stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageHistory {
    sources: Vec<(u32, u64)>,
    timings: Vec<u64>,
}

impl MessageHistory {
    /// Run `f` against this thread's history.
    ///
    /// Calls must not nest.
    pub fn with<R>(f: impl FnOnce(&mut MessageHistory) -> R) -> R {
        CURRENT.with(|history| f(&mut history.borrow_mut()))
    }

    /// A copy of this thread's history.
    pub fn snapshot() -> MessageHistory {
        Self::with(|history| history.clone())
    }

    /// Clear sources and timings, keeping their capacity.
    pub fn reset(&mut self) {
        self.sources.clear();
        self.timings.clear();
    }

    /// Record that the message was read from `source_id` at `index`.
    pub fn add_source(&mut self, source_id: u32, index: u64) {
        self.sources.push((source_id, index));
    }

    /// Record a timestamp in nanoseconds.
    pub fn add_timing(&mut self, nanos: u64) {
        self.timings.push(nanos);
    }

    /// `(source id, index)` pairs in the order they were added.
    pub fn sources(&self) -> &[(u32, u64)] {
        &self.sources
    }

    /// Timestamps in the order they were added.
    pub fn timings(&self) -> &[u64] {
        &self.timings
    }

    /// True if neither sources nor timings are recorded.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.timings.is_empty()
    }
}

impl ReadMarshallable for MessageHistory {
    fn reset(&mut self) {
        MessageHistory::reset(self);
    }
}
