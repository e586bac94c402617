//! # Dispatch Table and Method Registrar
//!
//! Handler objects list their methods on a [`Methods`] registrar, which turns
//! each one into a [`HandlerEntry`] in a shared [`DispatchTable`].
//!
//! # Eligibility
//!
//! The registrar enforces, for every name offered to it:
//!
//! - the first registration of a name wins, across every handler object fed
//!   into the same table. Later ones are skipped silently;
//! - names that could never appear on the wire are a construction error.
//!
//! # Argument Materialization
//!
//! | method takes | slot | decode |
//! |--------------|------|--------|
//! | `T` | [`Fresh`] | new value per record, safe to keep |
//! | `&T`, `T: ReadMarshallable` | [`Reuse`] | in place into one instance, borrowed for the call only |

use crate::{
    diagnostic,
    error::{InvocationError, RegistryError, WireError},
    handler::MethodResult,
    history::{HISTORY, MessageHistory},
    marshal::ReadMarshallable,
    wire::{ValueIn, validate_name},
};
use serde::de::DeserializeOwned;
use std::{
    any::Any,
    collections::HashMap,
    fmt,
    marker::PhantomData,
    panic::{self, AssertUnwindSafe},
};

/// How an entry produces its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentStrategy {
    /// A new value is decoded for every record.
    Fresh,
    /// One instance is decoded in place for every record.
    Reuse,
    /// The entry reads the value itself.
    Raw,
}

// ============================================================================
// Argument slots
// ============================================================================

/// Decodes a brand-new argument per record.
pub struct Fresh<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Fresh<T> {
    /// Create the slot.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Decode the record's value.
    pub fn materialize(&self, value: &mut ValueIn<'_, '_>) -> Result<T, WireError> {
        value.object()
    }
}

impl<T: DeserializeOwned> Default for Fresh<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes every record into one long-lived instance.
pub struct Reuse<T> {
    instance: T,
}

impl<T: ReadMarshallable> Reuse<T> {
    /// Create the slot and its single instance.
    pub fn new() -> Self {
        Self {
            instance: T::default(),
        }
    }

    /// Decode the record into the instance and lend it out.
    pub fn materialize(&mut self, value: &mut ValueIn<'_, '_>) -> Result<&T, WireError> {
        value.marshallable(&mut self.instance)?;
        Ok(&self.instance)
    }

    /// The instance as left by the last decode.
    pub fn instance(&self) -> &T {
        &self.instance
    }
}

impl<T: ReadMarshallable> Default for Reuse<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// HandlerEntry
// ============================================================================

type Invoke = Box<dyn FnMut(&mut ValueIn<'_, '_>) -> Result<(), InvocationError> + Send>;

/// One named method in a dispatch table.
pub struct HandlerEntry {
    name: Box<str>,
    strategy: ArgumentStrategy,
    capture: bool,
    invoke: Invoke,
}

impl HandlerEntry {
    /// The message name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the argument is produced.
    pub fn strategy(&self) -> ArgumentStrategy {
        self.strategy
    }

    /// Decode the value and call the method.
    ///
    /// Never fails: decode errors, returned errors and panics are logged with
    /// the rendered argument and discarded.
    pub fn invoke(&mut self, value: &mut ValueIn<'_, '_>) {
        if self.capture {
            diagnostic::log_message(&self.name, value);
        }

        let start = value.wire().read_position();
        let invoke = &mut self.invoke;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| invoke(value)))
            .unwrap_or_else(|payload| Err(InvocationError::Panic(panic_message(payload.as_ref()))));

        if let Err(error) = outcome {
            value.wire().set_read_position(start);
            let argument = value.text();
            tracing::error!(handler = %self.name, %argument, %error, "failure to dispatch message");
        }
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

// ============================================================================
// DispatchTable
// ============================================================================

/// Name to entry lookup, at most one entry per name.
#[derive(Debug, Default)]
pub struct DispatchTable {
    entries: HashMap<Box<str>, HandlerEntry>,
}

impl DispatchTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry by message name.
    pub fn get(&self, name: &str) -> Option<&HandlerEntry> {
        self.entries.get(name)
    }

    /// Look up an entry for invocation.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut HandlerEntry> {
        self.entries.get_mut(name)
    }

    /// True if `name` has been claimed.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|name| &**name)
    }
}

// ============================================================================
// Methods - the registrar handed to each handler object
// ============================================================================

/// Registrar that turns one handler object's methods into table entries.
///
/// # Example
/// ```ignore
/// let mut table = DispatchTable::new();
/// let mut methods = Methods::new(&mut table, "Ledger", false);
/// methods
///     .on("deposit", |d: Deposit| println!("{d:?}"))
///     .on_ref("tick", |t: &Tick| println!("{t:?}"));
/// methods.finish()?;
/// ```
pub struct Methods<'t> {
    table: &'t mut DispatchTable,
    owner: &'static str,
    capture: bool,
    error: Option<RegistryError>,
}

impl<'t> Methods<'t> {
    /// Register into `table` on behalf of `owner`.
    ///
    /// With `capture` set, entries log each record at debug level before
    /// decoding it.
    pub fn new(table: &'t mut DispatchTable, owner: &'static str, capture: bool) -> Self {
        Self {
            table,
            owner,
            capture,
            error: None,
        }
    }

    /// Register a method that takes its argument by value.
    pub fn on<T, R, F>(&mut self, name: &str, mut method: F) -> &mut Self
    where
        T: DeserializeOwned + 'static,
        R: MethodResult,
        F: FnMut(T) -> R + Send + 'static,
    {
        let slot = Fresh::<T>::new();
        let invoke: Invoke = Box::new(move |value: &mut ValueIn<'_, '_>| {
            let arg = slot.materialize(value)?;
            method(arg).into_result().map_err(InvocationError::Failed)
        });
        self.insert(name, ArgumentStrategy::Fresh, self.capture, invoke)
    }

    /// Register a method that borrows a reused argument.
    pub fn on_ref<T, R, F>(&mut self, name: &str, mut method: F) -> &mut Self
    where
        T: ReadMarshallable,
        R: MethodResult,
        F: FnMut(&T) -> R + Send + 'static,
    {
        let mut slot = Reuse::<T>::new();
        let invoke: Invoke = Box::new(move |value: &mut ValueIn<'_, '_>| {
            let arg = slot.materialize(value)?;
            method(arg).into_result().map_err(InvocationError::Failed)
        });
        self.insert(name, ArgumentStrategy::Reuse, self.capture, invoke)
    }

    /// Register a function that reads the value itself. Not captured for
    /// diagnostics.
    pub fn on_raw<F>(&mut self, name: &str, mut read: F) -> &mut Self
    where
        F: FnMut(&mut ValueIn<'_, '_>) -> Result<(), WireError> + Send + 'static,
    {
        let invoke: Invoke =
            Box::new(move |value: &mut ValueIn<'_, '_>| read(value).map_err(InvocationError::Decode));
        self.insert(name, ArgumentStrategy::Raw, false, invoke)
    }

    /// Claim [`HISTORY`] for decoding into the thread-local [`MessageHistory`],
    /// unless a handler already took the name.
    pub fn register_history(&mut self) -> &mut Self {
        self.on_raw(HISTORY, |value| {
            MessageHistory::with(|history| value.marshallable(history))
        })
    }

    fn insert(
        &mut self,
        name: &str,
        strategy: ArgumentStrategy,
        capture: bool,
        invoke: Invoke,
    ) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        if let Err(reason) = validate_name(name) {
            self.error = Some(RegistryError::InvalidName {
                name: name.to_owned(),
                reason,
            });
            return self;
        }
        if self.table.contains(name) {
            tracing::trace!(owner = self.owner, name, "name already claimed, skipping");
            return self;
        }

        self.table.entries.insert(
            name.into(),
            HandlerEntry {
                name: name.into(),
                strategy,
                capture,
                invoke,
            },
        );
        self
    }

    /// Report the first construction error, if any.
    pub fn finish(self) -> Result<(), RegistryError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{Wire, WireKind, write_document};
    use serde::{Deserialize, Serialize};
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct Tick {
        symbol: String,
        price: f64,
    }

    impl ReadMarshallable for Tick {}

    fn record<T: Serialize>(name: &str, value: &T) -> Vec<u8> {
        let mut out = Vec::new();
        write_document(WireKind::Text, name, value, &mut out).unwrap();
        out
    }

    fn dispatch(table: &mut DispatchTable, bytes: &[u8]) {
        let mut wire = Wire::text(bytes);
        let name = wire.read_event_name().unwrap();
        table.get_mut(name).unwrap().invoke(&mut wire.value_in());
    }

    #[test]
    fn test_first_registration_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut table = DispatchTable::new();

        let counter = Arc::clone(&first);
        let mut methods = Methods::new(&mut table, "First", false);
        methods.on("ping", move |_: u32| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        methods.finish().unwrap();

        let counter = Arc::clone(&second);
        let mut methods = Methods::new(&mut table, "Second", false);
        methods.on("ping", move |_: String| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        methods.finish().unwrap();

        assert_eq!(table.len(), 1);
        dispatch(&mut table, &record("ping", &7u32));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_common_trait_names_are_ordinary_messages() {
        let mut table = DispatchTable::new();
        let mut methods = Methods::new(&mut table, "Limits", false);
        methods.on("max", |_: u32| ()).on("hash", |_: String| ()).on("eq", |_: u32| ());
        methods.finish().unwrap();

        assert!(table.contains("max"));
        assert!(table.contains("hash"));
        assert!(table.contains("eq"));
    }

    #[test]
    fn test_invalid_name_is_reported() {
        let mut table = DispatchTable::new();
        let mut methods = Methods::new(&mut table, "Obj", false);
        methods.on("bad name", |_: u32| ()).on("fine", |_: u32| ());
        let err = methods.finish().unwrap_err();
        assert!(matches!(err, RegistryError::InvalidName { ref name, .. } if name == "bad name"));
    }

    #[test]
    fn test_reuse_lends_the_same_instance() {
        let addresses = Arc::new(Mutex::new(Vec::new()));
        let symbols = Arc::new(Mutex::new(Vec::new()));
        let mut table = DispatchTable::new();

        let (a, s) = (Arc::clone(&addresses), Arc::clone(&symbols));
        let mut methods = Methods::new(&mut table, "Ticks", false);
        methods.on_ref("tick", move |t: &Tick| {
            a.lock().unwrap().push(t as *const Tick as usize);
            s.lock().unwrap().push(t.symbol.clone());
        });
        methods.finish().unwrap();
        assert_eq!(table.get("tick").unwrap().strategy(), ArgumentStrategy::Reuse);

        dispatch(&mut table, br#"tick: {"symbol":"A","price":1.0}"#);
        dispatch(&mut table, br#"tick: {"price":2.0}"#);

        let addresses = addresses.lock().unwrap();
        assert_eq!(addresses[0], addresses[1]);
        assert_eq!(*symbols.lock().unwrap(), vec!["A".to_string(), String::new()]);
    }

    #[test]
    fn test_failures_are_isolated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut table = DispatchTable::new();

        let counter = Arc::clone(&calls);
        let mut methods = Methods::new(&mut table, "Flaky", false);
        methods
            .on("fails", |_: u32| Err::<(), _>("rejected"))
            .on("panics", |_: u32| -> () { panic!("boom") })
            .on("counts", move |_: u32| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        methods.finish().unwrap();

        dispatch(&mut table, &record("fails", &1u32));
        dispatch(&mut table, &record("panics", &1u32));
        // decode failure: a string where a number is expected
        dispatch(&mut table, &record("counts", &"one"));
        dispatch(&mut table, &record("counts", &1u32));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_history_is_decoded_into_thread_local() {
        let mut table = DispatchTable::new();
        let mut methods = Methods::new(&mut table, "reader", false);
        methods.register_history();
        methods.finish().unwrap();

        let mut history = MessageHistory::default();
        history.add_source(3, 42);
        dispatch(&mut table, &record(HISTORY, &history));

        assert_eq!(MessageHistory::snapshot().sources(), &[(3, 42)]);
        MessageHistory::with(MessageHistory::reset);
    }

    #[test]
    fn test_history_name_can_be_claimed_by_a_handler() {
        let mut table = DispatchTable::new();
        let mut methods = Methods::new(&mut table, "Custom", false);
        methods.on(HISTORY, |_: MessageHistory| ()).register_history();
        methods.finish().unwrap();

        assert_eq!(table.get(HISTORY).unwrap().strategy(), ArgumentStrategy::Fresh);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
