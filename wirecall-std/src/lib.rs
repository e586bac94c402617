//! # wirecall-std
//!
//! Standard implementations for the wirecall message replay dispatcher.
//!
//! This crate provides:
//! - **Replay**: [`MethodReader`] and its [`MethodReaderBuilder`]
//! - **Configuration**: [`ReaderOptions`]
//! - **In-memory log**: [`InMemoryQueue`] with its appender and tailers
//! - **Testing**: recorders and log capture in [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use wirecall_core;

// Modules
pub mod options;
pub mod queue;
pub mod reader;
pub mod testing;

pub use options::{DEBUG_ENV, ReaderOptions};
pub use queue::{InMemoryQueue, QueueAppender, QueueDocument, QueueTailer};
pub use reader::{MethodReader, MethodReaderBuilder};
