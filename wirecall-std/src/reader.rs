//! # Method Reader
//!
//! Replays records from an [`ExcerptTailer`] onto handler objects.
//!
//! A [`MethodReaderBuilder`] collects handler objects in order and builds an
//! immutable name to method table once. The resulting [`MethodReader`] reads
//! one record per [`process_next`](MethodReader::process_next) call and hands
//! it to the method registered under the record's name, or to the default
//! handler when there is none.
//!
//! # Example
//!
//! ```rust,ignore
//! let queue = InMemoryQueue::binary();
//! let mut reader = MethodReader::builder(queue.tailer())
//!     .handler(Arc::new(Ledger::default()))
//!     .handler(Arc::new(Audit::default()))
//!     .build()?;
//!
//! while reader.process_next() {}
//! ```

use crate::options::ReaderOptions;
use std::{
    any::type_name,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use wirecall_core::{
    DefaultHandler, DispatchTable, DocumentContext, ExcerptTailer, MessageHistory,
    MethodHandlers, Methods, RegistryError, WarnUnknown, Wire, panic_message,
};

// ============================================================================
// MethodReaderBuilder
// ============================================================================

/// Builder for a [`MethodReader`].
///
/// Handler objects are scanned in the order they were added; when two
/// methods share a name, the one added first is kept.
pub struct MethodReaderBuilder<T> {
    tailer: T,
    handlers: Vec<Arc<dyn MethodHandlers>>,
    default_handler: Option<Arc<dyn DefaultHandler>>,
    default_set_twice: bool,
    options: ReaderOptions,
}

impl<T: ExcerptTailer> MethodReaderBuilder<T> {
    /// Start a builder reading from `tailer`.
    pub fn new(tailer: T) -> Self {
        Self {
            tailer,
            handlers: Vec::new(),
            default_handler: None,
            default_set_twice: false,
            options: ReaderOptions::default(),
        }
    }

    /// Add a handler object.
    pub fn handler<H: MethodHandlers>(mut self, handler: Arc<H>) -> Self {
        self.handler_mut(handler);
        self
    }

    /// Add a handler object (mutable version).
    pub fn handler_mut<H: MethodHandlers>(&mut self, handler: Arc<H>) {
        self.handlers.push(handler);
    }

    /// Add a type-erased handler object. It is still logged under its
    /// concrete type name.
    pub fn handler_dyn(mut self, handler: Arc<dyn MethodHandlers>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Set the handler for names with no registered method. May be set once.
    pub fn default_handler<D: DefaultHandler>(mut self, handler: D) -> Self {
        if self.default_handler.is_some() {
            self.default_set_twice = true;
        } else {
            self.default_handler = Some(Arc::new(handler));
        }
        self
    }

    /// Replace the reader options.
    pub fn options(mut self, options: ReaderOptions) -> Self {
        self.options = options;
        self
    }

    /// Turn diagnostic capture on or off.
    pub fn debug(mut self, debug: bool) -> Self {
        self.options = self.options.with_debug(debug);
        self
    }

    /// Number of handler objects added so far.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True if no handler objects were added.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Build the dispatch table.
    ///
    /// If the first handler object is itself a default handler it is
    /// installed as such and not scanned for methods. The `history` name is
    /// claimed last, only if no handler took it.
    pub fn build(self) -> Result<MethodReader<T>, RegistryError> {
        let Self {
            tailer,
            handlers,
            mut default_handler,
            default_set_twice,
            options,
        } = self;

        if handlers.is_empty() {
            return Err(RegistryError::NoHandlers);
        }
        if default_set_twice {
            return Err(RegistryError::DefaultHandlerAlreadySet);
        }

        let mut table = DispatchTable::new();
        for (index, handler) in handlers.into_iter().enumerate() {
            if index == 0 {
                if let Some(fallback) = Arc::clone(&handler).as_default_handler() {
                    if default_handler.replace(fallback).is_some() {
                        return Err(RegistryError::DefaultHandlerAlreadySet);
                    }
                    continue;
                }
            }

            let mut methods = Methods::new(&mut table, handler.handler_name(), options.debug());
            handler.register_methods(&mut methods);
            methods.finish()?;
        }

        let mut methods = Methods::new(&mut table, type_name::<Self>(), false);
        methods.register_history();
        methods.finish()?;

        tracing::debug!(entries = table.len(), debug = options.debug(), "method reader built");

        Ok(MethodReader {
            tailer,
            table,
            default_handler: default_handler.unwrap_or_else(|| Arc::new(WarnUnknown)),
        })
    }
}

// ============================================================================
// MethodReader
// ============================================================================

/// Reads records one at a time and dispatches them by name.
///
/// `process_next` takes `&mut self`: one reader serves one consumer at a
/// time. The reader may be moved to another thread.
pub struct MethodReader<T> {
    tailer: T,
    table: DispatchTable,
    default_handler: Arc<dyn DefaultHandler>,
}

impl<T: ExcerptTailer> MethodReader<T> {
    /// Start building a reader over `tailer`.
    pub fn builder(tailer: T) -> MethodReaderBuilder<T> {
        MethodReaderBuilder::new(tailer)
    }

    /// Build a reader from handler objects in order, with default options.
    pub fn new<I>(tailer: T, handlers: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = Arc<dyn MethodHandlers>>,
    {
        handlers
            .into_iter()
            .fold(MethodReaderBuilder::new(tailer), MethodReaderBuilder::handler_dyn)
            .build()
    }

    /// Read and dispatch one record.
    ///
    /// Returns `false` if no record was ready, `true` if one was consumed,
    /// whatever happened while dispatching it.
    pub fn process_next(&mut self) -> bool {
        MessageHistory::with(MessageHistory::reset);

        let document = self.tailer.reading_document();
        if !document.is_data() {
            return false;
        }
        let Some(mut wire) = document.wire() else {
            return false;
        };

        dispatch(&mut self.table, self.default_handler.as_ref(), &mut wire);
        true
    }

    /// Call [`process_next`](Self::process_next) until no record is ready.
    /// Returns the number of records consumed.
    pub fn process_all(&mut self) -> usize {
        let mut count = 0;
        while self.process_next() {
            count += 1;
        }
        count
    }
}

impl<T> MethodReader<T> {
    /// True if a method is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains(name)
    }

    /// Registered names, in no particular order.
    pub fn handled_names(&self) -> impl Iterator<Item = &str> {
        self.table.names()
    }

    /// Number of registered names, including `history`.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True if no names are registered.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The dispatch table.
    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// The underlying tailer.
    pub fn tailer(&self) -> &T {
        &self.tailer
    }

    /// The underlying tailer, mutably.
    pub fn tailer_mut(&mut self) -> &mut T {
        &mut self.tailer
    }

    /// Drop the table and return the tailer.
    pub fn into_tailer(self) -> T {
        self.tailer
    }
}

impl<T: fmt::Debug> fmt::Debug for MethodReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodReader")
            .field("tailer", &self.tailer)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

fn dispatch(table: &mut DispatchTable, fallback: &dyn DefaultHandler, wire: &mut Wire<'_>) {
    let name = match wire.read_event_name() {
        Ok(name) => name,
        Err(error) => {
            tracing::error!(%error, "unreadable message header, skipping record");
            return;
        }
    };

    let mut value = wire.value_in();
    match table.get_mut(name) {
        Some(entry) => entry.invoke(&mut value),
        None => {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| fallback.on_unknown(name, &mut value)));
            if let Err(payload) = outcome {
                let error = panic_message(payload.as_ref());
                tracing::error!(%name, %error, "default handler panicked");
            }
        }
    }
}
