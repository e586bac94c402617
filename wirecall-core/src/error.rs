//! Error types for wirecall.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`WireError`] - Errors reading or writing a record on the wire
//! - [`InvocationError`] - A single record's dispatch failed (logged, never propagated)
//! - [`RegistryError`] - The dispatch table could not be built

use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while reading or writing a record.
#[derive(Error, Debug)]
pub enum WireError {
    /// The record ended before the expected number of bytes.
    #[error("record truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes required to continue.
        needed: usize,
        /// Bytes actually left in the record.
        remaining: usize,
    },

    /// The record's tag name is missing or unusable.
    #[error("invalid message name: {0}")]
    InvalidName(String),

    /// Decoding or encoding the text (JSON) form failed.
    #[error("text wire error: {0}")]
    Text(#[from] serde_json::Error),

    /// Decoding the binary (MessagePack) form failed.
    #[error("binary decode error: {0}")]
    BinaryDecode(#[from] rmp_serde::decode::Error),

    /// Encoding the binary (MessagePack) form failed.
    #[error("binary encode error: {0}")]
    BinaryEncode(#[from] rmp_serde::encode::Error),
}

/// Failure of one handler invocation.
///
/// These are caught at the handler entry boundary, logged and discarded.
#[derive(Error, Debug)]
pub enum InvocationError {
    /// The record value could not be decoded into the argument.
    #[error("decode failed: {0}")]
    Decode(#[from] WireError),

    /// The handler method returned an error.
    #[error(transparent)]
    Failed(BoxError),

    /// The handler method panicked.
    #[error("handler panicked: {0}")]
    Panic(String),
}

/// Errors that make a dispatch table unusable. Raised only at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No handler objects were supplied.
    #[error("no handler objects supplied")]
    NoHandlers,

    /// A default handler was supplied more than once.
    #[error("default handler already set")]
    DefaultHandlerAlreadySet,

    /// A method name can never appear on the wire.
    #[error("invalid message name {name:?}: {reason}")]
    InvalidName {
        /// The offending name.
        name: String,
        /// Why the name was rejected.
        reason: &'static str,
    },
}

impl From<BoxError> for InvocationError {
    fn from(err: BoxError) -> Self {
        InvocationError::Failed(err)
    }
}
