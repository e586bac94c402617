//! # Handler Layer
//!
//! Handler objects expose their message methods through [`MethodHandlers`].
//! The trait replaces runtime reflection: an implementation lists the
//! object's eligible methods on a [`Methods`] registrar, either by hand or
//! through the `#[wirecall::methods]` attribute.
//!
//! Records whose name matches no method go to a [`DefaultHandler`]. Unless
//! one is supplied, [`WarnUnknown`] logs them and moves on.
//!
//! # Usage Patterns
//!
//! 1. **Generated**: `#[wirecall::methods] impl Ledger { fn deposit(&self, d: Deposit) {..} }`
//! 2. **Hand-written**: `impl MethodHandlers for Ledger { fn register_methods(..) {..} }`
//! 3. **Default handler first**: an object whose `as_default_handler` returns
//!    `Some` is installed as the fallback when supplied first.

use crate::{error::BoxError, methods::Methods, wire::ValueIn};
use std::sync::Arc;

/// Return types accepted from handler methods.
pub trait MethodResult {
    /// Convert into the dispatcher's result.
    fn into_result(self) -> Result<(), BoxError>;
}

impl MethodResult for () {
    fn into_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E: Into<BoxError>> MethodResult for Result<(), E> {
    fn into_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// Receives every record whose name has no registered method.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle unknown messages",
    label = "missing `DefaultHandler` implementation",
    note = "Implement `on_unknown`, or pass a closure `Fn(&str, &mut ValueIn)`."
)]
pub trait DefaultHandler: Send + Sync + 'static {
    /// Called with the record's name and value.
    fn on_unknown(&self, name: &str, value: &mut ValueIn<'_, '_>);
}

impl<F> DefaultHandler for F
where
    F: Fn(&str, &mut ValueIn<'_, '_>) + Send + Sync + 'static,
{
    fn on_unknown(&self, name: &str, value: &mut ValueIn<'_, '_>) {
        (self)(name, value)
    }
}

/// The fallback used when no default handler is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarnUnknown;

impl DefaultHandler for WarnUnknown {
    fn on_unknown(&self, name: &str, value: &mut ValueIn<'_, '_>) {
        let value = value.text();
        tracing::warn!(%name, %value, "unknown message");
    }
}

/// A handler object whose methods receive decoded records.
///
/// The registry keeps an `Arc` to the object for as long as it lives; the
/// object is shared, never owned exclusively.
///
/// # Example
///
/// ```rust,ignore
/// struct Ledger { total: AtomicI64 }
///
/// impl MethodHandlers for Ledger {
///     fn register_methods(self: Arc<Self>, methods: &mut Methods<'_>) {
///         let this = Arc::clone(&self);
///         methods.on("deposit", move |d: Deposit| this.deposit(d));
///         methods.on_ref("tick", move |t: &Tick| self.tick(t));
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not expose message methods",
    label = "missing `MethodHandlers` implementation",
    note = "Annotate the impl block with `#[wirecall::methods]` or implement `register_methods`."
)]
pub trait MethodHandlers: Send + Sync + 'static {
    /// List this object's message methods on `methods`.
    fn register_methods(self: Arc<Self>, methods: &mut Methods<'_>);

    /// Return `Some` if this object is itself a default handler.
    ///
    /// Only honoured for the first object supplied to a reader; that object
    /// is then not scanned for methods.
    fn as_default_handler(self: Arc<Self>) -> Option<Arc<dyn DefaultHandler>> {
        None
    }

    /// Label used for this object in registration logs. Resolves to the
    /// concrete type even behind `dyn MethodHandlers`.
    fn handler_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
