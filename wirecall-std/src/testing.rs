//! Testing utilities for wirecall.
//!
//! # Features
//!
//! - [`RecordingHandler`]: a handler object that records every value it receives
//! - [`UnknownRecorder`]: a default handler that records unknown records
//! - [`FailingHandler`]: a handler object whose methods fail or panic
//! - [`capture_logs`]: run a closure and collect everything it logged

use serde::de::DeserializeOwned;
use std::{
    io,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};
use tracing::Level;
use wirecall_core::{DefaultHandler, MethodHandlers, Methods, ValueIn};

// ============================================================================
// Recording Handler
// ============================================================================

/// A handler object with one method, `name`, that records each argument.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = Arc::new(RecordingHandler::<u32>::new("count"));
/// let mut reader = MethodReader::builder(queue.tailer())
///     .handler(Arc::clone(&recorder))
///     .build()?;
///
/// reader.process_all();
/// assert_eq!(recorder.values(), vec![1, 2, 3]);
/// ```
pub struct RecordingHandler<T> {
    name: String,
    values: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone> RecordingHandler<T> {
    /// Create a recorder for records named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The method name this recorder registers.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A clone of the recorded values, in arrival order.
    pub fn values(&self) -> Vec<T> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of recorded values.
    pub fn count(&self) -> usize {
        self.values.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Forget all recorded values.
    pub fn clear(&self) {
        self.values.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl<T> MethodHandlers for RecordingHandler<T>
where
    T: DeserializeOwned + Clone + Send + 'static,
{
    fn register_methods(self: Arc<Self>, methods: &mut Methods<'_>) {
        let values = Arc::clone(&self.values);
        methods.on(&self.name, move |value: T| {
            values.lock().unwrap_or_else(PoisonError::into_inner).push(value);
        });
    }
}

// ============================================================================
// Unknown Recorder
// ============================================================================

/// A default handler that records the name and text of every unknown record.
#[derive(Debug, Clone, Default)]
pub struct UnknownRecorder {
    seen: Arc<Mutex<Vec<(String, String)>>>,
}

impl UnknownRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(name, value text)` pairs, in arrival order.
    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Recorded names, in arrival order.
    pub fn names(&self) -> Vec<String> {
        self.seen().into_iter().map(|(name, _)| name).collect()
    }
}

impl DefaultHandler for UnknownRecorder {
    fn on_unknown(&self, name: &str, value: &mut ValueIn<'_, '_>) {
        let text = value.text().into_owned();
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_owned(), text));
    }
}

// ============================================================================
// Failing Handler
// ============================================================================

/// A handler object whose methods misbehave.
///
/// - `fail` returns an error
/// - `panic` panics
/// - `count` succeeds and counts calls
///
/// All three take a `u32`.
#[derive(Debug, Default)]
pub struct FailingHandler {
    attempts: AtomicUsize,
    successes: AtomicUsize,
}

impl FailingHandler {
    /// Create the handler with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls that reached any method body.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Calls to `count`.
    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }
}

impl MethodHandlers for FailingHandler {
    fn register_methods(self: Arc<Self>, methods: &mut Methods<'_>) {
        let (fails, panics, counts) = (Arc::clone(&self), Arc::clone(&self), self);
        methods
            .on("fail", move |value: u32| {
                fails.attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(format!("refusing {value}"))
            })
            .on("panic", move |value: u32| -> () {
                panics.attempts.fetch_add(1, Ordering::SeqCst);
                panic!("cannot take {value}")
            })
            .on("count", move |_: u32| {
                counts.attempts.fetch_add(1, Ordering::SeqCst);
                counts.successes.fetch_add(1, Ordering::SeqCst);
            });
    }
}

// ============================================================================
// Log capture
// ============================================================================

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber at `TRACE` and return its result
/// together with everything logged, as plain text.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    capture_logs_at(Level::TRACE, f)
}

/// Like [`capture_logs`], with a maximum level.
pub fn capture_logs_at<R>(level: Level, f: impl FnOnce() -> R) -> (R, String) {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.0.lock().unwrap_or_else(PoisonError::into_inner).clone();
    (result, String::from_utf8_lossy(&bytes).into_owned())
}
