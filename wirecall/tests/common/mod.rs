#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use wirecall::{MethodHandlers, Methods, ReadMarshallable};

// ============================================================================
// Test Message Types
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Msg1 {
    pub id: u32,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Msg2 {
    pub amount: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    pub venues: Vec<String>,
}

impl ReadMarshallable for Tick {
    fn reset(&mut self) {
        self.symbol.clear();
        self.price = 0.0;
        self.venues.clear();
    }
}

// ============================================================================
// Test Handlers
// ============================================================================

/// Shared, ordered record of calls across handler objects.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Handles `foo(Msg1)`.
pub struct HandlerA {
    pub log: CallLog,
}

impl HandlerA {
    fn foo(&self, msg: Msg1) {
        self.log.record(format!("A.foo({}, {})", msg.id, msg.text));
    }
}

impl MethodHandlers for HandlerA {
    fn register_methods(self: Arc<Self>, methods: &mut Methods<'_>) {
        methods.on("foo", move |msg: Msg1| self.foo(msg));
    }
}

/// Handles `bar(Msg2)`, and also `foo(Msg2)`, which loses to `HandlerA`
/// when registered after it.
pub struct HandlerB {
    pub log: CallLog,
}

impl HandlerB {
    fn bar(&self, msg: Msg2) {
        self.log.record(format!("B.bar({})", msg.amount));
    }

    fn foo(&self, msg: Msg2) {
        self.log.record(format!("B.foo({})", msg.amount));
    }
}

impl MethodHandlers for HandlerB {
    fn register_methods(self: Arc<Self>, methods: &mut Methods<'_>) {
        let this = Arc::clone(&self);
        methods
            .on("bar", move |msg: Msg2| this.bar(msg))
            .on("foo", move |msg: Msg2| self.foo(msg));
    }
}

pub fn msg1(id: u32, text: &str) -> Msg1 {
    Msg1 {
        id,
        text: text.to_string(),
    }
}
