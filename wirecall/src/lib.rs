//! # wirecall - Replay Log Records onto Handler Methods
//!
//! `wirecall` reads name-tagged records from an append-only log and calls the
//! handler method registered under each record's name, decoding the record's
//! value into the method's argument.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wirecall::prelude::*;
//!
//! #[derive(Debug, Deserialize, Serialize)]
//! struct Deposit { account: String, amount: i64 }
//!
//! #[derive(Default)]
//! struct Ledger { total: AtomicI64 }
//!
//! #[wirecall::methods]
//! impl Ledger {
//!     fn deposit(&self, deposit: Deposit) {
//!         self.total.fetch_add(deposit.amount, Ordering::SeqCst);
//!     }
//! }
//!
//! let queue = InMemoryQueue::binary();
//! queue.appender().write("deposit", &Deposit { account: "a".into(), amount: 5 })?;
//!
//! let mut reader = MethodReader::builder(queue.tailer())
//!     .handler(Arc::new(Ledger::default()))
//!     .build()?;
//!
//! while reader.process_next() {}
//! ```
//!
//! ## Argument Handling
//!
//! - `fn m(&self, arg: T)`: a new `T` is decoded for every record.
//! - `fn m(&self, arg: &T)` with `T: ReadMarshallable`: records are decoded
//!   into one reused `T`, lent to the method for the call only.
//!
//! Decode errors, errors returned by methods, and panics are logged at error
//! level and the reader moves on to the next record.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use wirecall_core::{
    // Errors
    BoxError,
    InvocationError,
    RegistryError,
    WireError,
    // Handlers
    DefaultHandler,
    MethodHandlers,
    MethodResult,
    WarnUnknown,
    // Registrar
    ArgumentStrategy,
    DispatchTable,
    HandlerEntry,
    Methods,
    // Capability
    ReadMarshallable,
    // History
    HISTORY,
    MessageHistory,
    // Log access
    DocumentContext,
    ExcerptTailer,
    // Wire
    MAX_NAME_LEN,
    ValueIn,
    Wire,
    WireKind,
    validate_name,
    write_document,
};

pub use wirecall_std::{
    DEBUG_ENV, InMemoryQueue, MethodReader, MethodReaderBuilder, QueueAppender, QueueDocument,
    QueueTailer, ReaderOptions,
};

/// Readable rendering of records for debug logging.
pub mod diagnostic {
    pub use wirecall_core::diagnostic::{SCRATCH_HEADROOM, log_message, render, scratch_capacity};
}

/// Testing utilities.
pub mod testing {
    pub use wirecall_std::testing::{
        FailingHandler, RecordingHandler, UnknownRecorder, capture_logs, capture_logs_at,
    };
}

/// Prelude module - common imports for wirecall.
///
/// # Usage
///
/// ```rust,ignore
/// use wirecall::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        DefaultHandler, ExcerptTailer, InMemoryQueue, MethodHandlers, MethodReader, Methods,
        ReadMarshallable, ReaderOptions, RegistryError, ValueIn,
    };
    pub use std::sync::Arc;
}

#[cfg(feature = "macros")]
pub use wirecall_macros::methods;
