//! # wirecall-core
//!
//! Core traits and wire primitives for the wirecall message replay dispatcher.
//!
//! This crate has everything a handler object or a log implementation needs
//! to plug into a reader, without the reader itself (see `wirecall-std`).
//!
//! # Pieces
//!
//! - **Wire** ([`Wire`], [`ValueIn`]): a record is a tag name followed by a
//!   value, in readable text (JSON) or compact binary (MessagePack) form.
//! - **Capability** ([`ReadMarshallable`]): marks argument types that can be
//!   decoded in place into one reused instance.
//! - **Scoped reads** ([`ExcerptTailer`], [`DocumentContext`]): how records
//!   are pulled from a log, one release-on-drop scope per record.
//! - **Handlers** ([`MethodHandlers`], [`DefaultHandler`]): objects whose
//!   methods receive decoded records, and the fallback for unknown names.
//! - **Registrar** ([`Methods`], [`DispatchTable`]): turns methods into
//!   named entries with first-registration-wins name resolution.
//! - **History** ([`MessageHistory`]): per-thread metadata carried by
//!   `history` records.
//!
//! # Error Types
//!
//! - [`WireError`] - Reading or writing a record failed
//! - [`InvocationError`] - One record's dispatch failed (isolated)
//! - [`RegistryError`] - A dispatch table could not be built

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod diagnostic;
mod error;
mod handler;
mod history;
mod marshal;
mod methods;
mod tailer;
mod wire;

// Re-exports
pub use error::{BoxError, InvocationError, RegistryError, WireError};
pub use handler::{DefaultHandler, MethodHandlers, MethodResult, WarnUnknown};
pub use history::{HISTORY, MessageHistory};
pub use marshal::ReadMarshallable;
pub use methods::{
    ArgumentStrategy, DispatchTable, Fresh, HandlerEntry, Methods, Reuse, panic_message,
};
pub use tailer::{DocumentContext, ExcerptTailer};
pub use wire::{MAX_NAME_LEN, ValueIn, Wire, WireKind, validate_name, write_document};
