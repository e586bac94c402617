//! # In-Memory Queue
//!
//! An append-only record log held in memory, with any number of independent
//! tailers. Good for tests and for wiring components inside one process.
//!
//! ```rust,ignore
//! let queue = InMemoryQueue::text();
//! queue.appender().write("deposit", &Deposit { amount: 10 })?;
//!
//! let mut tailer = queue.tailer();
//! let document = tailer.reading_document();
//! assert!(document.is_data());
//! ```

use serde::Serialize;
use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};
use wirecall_core::{DocumentContext, ExcerptTailer, Wire, WireError, WireKind, write_document};

type Record = Arc<[u8]>;

/// Shared in-memory record log. Clones share the same records.
#[derive(Clone)]
pub struct InMemoryQueue {
    kind: WireKind,
    records: Arc<RwLock<Vec<Record>>>,
}

impl InMemoryQueue {
    /// Create an empty queue of the given encoding.
    pub fn new(kind: WireKind) -> Self {
        Self {
            kind,
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Create an empty text queue.
    pub fn text() -> Self {
        Self::new(WireKind::Text)
    }

    /// Create an empty binary queue.
    pub fn binary() -> Self {
        Self::new(WireKind::Binary)
    }

    /// The encoding of every record in this queue.
    pub fn kind(&self) -> WireKind {
        self.kind
    }

    /// Number of records written.
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A writer appending to the end of this queue.
    pub fn appender(&self) -> QueueAppender {
        QueueAppender {
            queue: self.clone(),
            scratch: Vec::new(),
        }
    }

    /// A reader starting at the first record.
    pub fn tailer(&self) -> QueueTailer {
        QueueTailer {
            queue: self.clone(),
            index: 0,
        }
    }

    fn push(&self, record: Record) -> u64 {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.push(record);
        (records.len() - 1) as u64
    }

    fn get(&self, index: u64) -> Option<Record> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        usize::try_from(index)
            .ok()
            .and_then(|index| records.get(index))
            .cloned()
    }
}

impl fmt::Debug for InMemoryQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryQueue")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}

// ============================================================================
// Appender
// ============================================================================

/// Writes records to the end of an [`InMemoryQueue`].
#[derive(Debug)]
pub struct QueueAppender {
    queue: InMemoryQueue,
    scratch: Vec<u8>,
}

impl QueueAppender {
    /// Encode `value` under `name` and append it. Returns the record's index.
    pub fn write<T>(&mut self, name: &str, value: &T) -> Result<u64, WireError>
    where
        T: Serialize + ?Sized,
    {
        self.scratch.clear();
        write_document(self.queue.kind, name, value, &mut self.scratch)?;
        Ok(self.queue.push(Arc::from(self.scratch.as_slice())))
    }

    /// Append pre-encoded bytes as one record, unchecked.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> u64 {
        self.queue.push(Arc::from(bytes))
    }
}

// ============================================================================
// Tailer
// ============================================================================

/// Reads records from an [`InMemoryQueue`] in order.
#[derive(Debug, Clone)]
pub struct QueueTailer {
    queue: InMemoryQueue,
    index: u64,
}

impl QueueTailer {
    /// Index of the next record to read.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Position the tailer at `index`. Returns false if that is past the end.
    pub fn move_to_index(&mut self, index: u64) -> bool {
        if index > self.queue.len() as u64 {
            return false;
        }
        self.index = index;
        true
    }

    /// Go back to the first record.
    pub fn to_start(&mut self) -> &mut Self {
        self.index = 0;
        self
    }

    /// Skip past every record written so far.
    pub fn to_end(&mut self) -> &mut Self {
        self.index = self.queue.len() as u64;
        self
    }
}

impl ExcerptTailer for QueueTailer {
    type Document<'a> = QueueDocument<'a>;

    fn reading_document(&mut self) -> QueueDocument<'_> {
        let record = self.queue.get(self.index);
        QueueDocument {
            tailer: self,
            record,
        }
    }
}

/// A scoped read over one queue record. Dropping it moves the tailer past
/// the record, if there was one.
pub struct QueueDocument<'a> {
    tailer: &'a mut QueueTailer,
    record: Option<Record>,
}

impl QueueDocument<'_> {
    /// Index of the record under read.
    pub fn index(&self) -> u64 {
        self.tailer.index
    }
}

impl DocumentContext for QueueDocument<'_> {
    fn is_data(&self) -> bool {
        self.record.is_some()
    }

    fn wire(&self) -> Option<Wire<'_>> {
        let kind = self.tailer.queue.kind;
        self.record.as_deref().map(|bytes| Wire::new(kind, bytes))
    }
}

impl Drop for QueueDocument<'_> {
    fn drop(&mut self) {
        if self.record.is_some() {
            self.tailer.index += 1;
        }
    }
}
