//! Registry construction: name resolution, filters, default handler, history.

mod common;

use common::{CallLog, HandlerA, HandlerB, Msg2, msg1};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use wirecall::{
    ArgumentStrategy, DefaultHandler, HISTORY, InMemoryQueue, MessageHistory, MethodHandlers,
    MethodReader, Methods, RegistryError, ValueIn, testing::UnknownRecorder,
};

#[test]
fn test_first_registration_wins_across_objects() {
    let queue = InMemoryQueue::binary();
    let mut appender = queue.appender();
    appender.write("foo", &msg1(9, "winner")).unwrap();

    let log = CallLog::default();
    let mut reader = MethodReader::builder(queue.tailer())
        .handler(Arc::new(HandlerA { log: log.clone() }))
        .handler(Arc::new(HandlerB { log: log.clone() }))
        .build()
        .unwrap();

    assert!(reader.process_next());
    assert_eq!(log.entries(), vec!["A.foo(9, winner)".to_string()]);
}

#[test]
fn test_registration_order_decides_the_winner() {
    let queue = InMemoryQueue::binary();
    queue.appender().write("foo", &Msg2 { amount: 3 }).unwrap();

    let log = CallLog::default();
    let mut reader = MethodReader::builder(queue.tailer())
        .handler(Arc::new(HandlerB { log: log.clone() }))
        .handler(Arc::new(HandlerA { log: log.clone() }))
        .build()
        .unwrap();

    assert!(reader.process_next());
    assert_eq!(log.entries(), vec!["B.foo(3)".to_string()]);
}

#[test]
fn test_handled_names() {
    let log = CallLog::default();
    let reader = MethodReader::builder(InMemoryQueue::text().tailer())
        .handler(Arc::new(HandlerA { log: log.clone() }))
        .handler(Arc::new(HandlerB { log }))
        .build()
        .unwrap();

    let mut names: Vec<_> = reader.handled_names().collect();
    names.sort_unstable();
    assert_eq!(names, vec!["bar", "foo", HISTORY]);
    assert_eq!(reader.len(), 3);
    assert_eq!(
        reader.table().get("foo").unwrap().strategy(),
        ArgumentStrategy::Fresh
    );
}

/// Message names that happen to match common trait methods.
struct Limits {
    log: CallLog,
}

impl MethodHandlers for Limits {
    fn register_methods(self: Arc<Self>, methods: &mut Methods<'_>) {
        let this = Arc::clone(&self);
        methods
            .on("max", move |order: Msg2| {
                this.log.record(format!("max({})", order.amount))
            })
            .on("hash", move |key: String| self.log.record(format!("hash({key})")));
    }
}

#[test]
fn test_common_trait_names_dispatch_like_any_other() {
    let queue = InMemoryQueue::binary();
    let mut appender = queue.appender();
    appender.write("max", &Msg2 { amount: 40 }).unwrap();
    appender.write("hash", &"abc").unwrap();

    let log = CallLog::default();
    let unknown = UnknownRecorder::new();
    let mut reader = MethodReader::builder(queue.tailer())
        .handler(Arc::new(Limits { log: log.clone() }))
        .default_handler(unknown.clone())
        .build()
        .unwrap();

    assert!(reader.contains("max"));
    assert!(reader.contains("hash"));
    assert_eq!(reader.process_all(), 2);
    assert_eq!(
        log.entries(),
        vec!["max(40)".to_string(), "hash(abc)".to_string()]
    );
    assert!(unknown.names().is_empty());
}

#[test]
fn test_no_handlers_is_an_error() {
    let result = MethodReader::builder(InMemoryQueue::text().tailer()).build();
    assert_eq!(result.unwrap_err(), RegistryError::NoHandlers);
}

struct BadlyNamed;

impl MethodHandlers for BadlyNamed {
    fn register_methods(self: Arc<Self>, methods: &mut Methods<'_>) {
        methods.on("key: value", |_: u32| ());
    }
}

#[test]
fn test_unwritable_name_is_an_error() {
    let result = MethodReader::builder(InMemoryQueue::text().tailer())
        .handler(Arc::new(BadlyNamed))
        .build();

    match result {
        Err(RegistryError::InvalidName { name, .. }) => assert_eq!(name, "key: value"),
        other => panic!("expected InvalidName, got {:?}", other.map(|r| r.len())),
    }
}

#[test]
fn test_unknown_records_go_to_default_handler() {
    let queue = InMemoryQueue::text();
    let mut appender = queue.appender();
    appender.write("nobody", &[1, 2, 3]).unwrap();
    appender.write("foo", &msg1(1, "known")).unwrap();
    appender.write("nobody_else", &flag_map()).unwrap();

    let unknown = UnknownRecorder::new();
    let log = CallLog::default();
    let mut reader = MethodReader::builder(queue.tailer())
        .handler(Arc::new(HandlerA { log: log.clone() }))
        .default_handler(unknown.clone())
        .build()
        .unwrap();

    assert_eq!(reader.process_all(), 3);
    assert_eq!(
        unknown.seen(),
        vec![
            ("nobody".to_string(), "[1,2,3]".to_string()),
            ("nobody_else".to_string(), "{\"k\":true}".to_string()),
        ]
    );
    assert_eq!(log.entries().len(), 1);
}

fn flag_map() -> std::collections::BTreeMap<&'static str, bool> {
    std::collections::BTreeMap::from([("k", true)])
}

/// Counts unknown records and, when supplied first, stands in as the default
/// handler instead of contributing methods.
#[derive(Default)]
struct Catcher {
    unknown: AtomicUsize,
}

impl DefaultHandler for Catcher {
    fn on_unknown(&self, _name: &str, value: &mut ValueIn<'_, '_>) {
        value.skip();
        self.unknown.fetch_add(1, Ordering::SeqCst);
    }
}

impl MethodHandlers for Catcher {
    fn register_methods(self: Arc<Self>, methods: &mut Methods<'_>) {
        methods.on("caught", |_: u32| ());
    }

    fn as_default_handler(self: Arc<Self>) -> Option<Arc<dyn DefaultHandler>> {
        Some(self)
    }
}

#[test]
fn test_first_object_can_be_the_default_handler() {
    let queue = InMemoryQueue::binary();
    let mut appender = queue.appender();
    appender.write("caught", &1u32).unwrap();
    appender.write("foo", &msg1(2, "routed")).unwrap();

    let catcher = Arc::new(Catcher::default());
    let log = CallLog::default();
    let mut reader = MethodReader::builder(queue.tailer())
        .handler(Arc::clone(&catcher))
        .handler(Arc::new(HandlerA { log: log.clone() }))
        .build()
        .unwrap();

    assert!(!reader.contains("caught"));
    assert_eq!(reader.process_all(), 2);
    assert_eq!(catcher.unknown.load(Ordering::SeqCst), 1);
    assert_eq!(log.entries(), vec!["A.foo(2, routed)".to_string()]);
}

#[test]
fn test_default_handler_settable_once() {
    let result = MethodReader::builder(InMemoryQueue::text().tailer())
        .handler(Arc::new(Catcher::default()))
        .default_handler(UnknownRecorder::new())
        .build();
    assert_eq!(result.unwrap_err(), RegistryError::DefaultHandlerAlreadySet);
}

#[test]
fn test_history_record_is_not_delivered_to_default_handler() {
    let queue = InMemoryQueue::binary();
    let mut appender = queue.appender();
    let mut history = MessageHistory::default();
    history.add_source(7, 1234);
    history.add_timing(99);
    appender.write(HISTORY, &history).unwrap();

    let unknown = UnknownRecorder::new();
    let mut reader = MethodReader::builder(queue.tailer())
        .handler(Arc::new(HandlerA {
            log: CallLog::default(),
        }))
        .default_handler(unknown.clone())
        .build()
        .unwrap();

    assert!(reader.process_next());
    assert!(unknown.seen().is_empty());

    let seen = MessageHistory::snapshot();
    assert_eq!(seen.sources(), &[(7, 1234)]);
    assert_eq!(seen.timings(), &[99]);

    // reset at the start of the next call, even with nothing to read
    assert!(!reader.process_next());
    assert!(MessageHistory::snapshot().is_empty());
}

struct HistoryAware {
    seen: Arc<AtomicUsize>,
}

impl MethodHandlers for HistoryAware {
    fn register_methods(self: Arc<Self>, methods: &mut Methods<'_>) {
        methods.on(HISTORY, move |_: MessageHistory| {
            self.seen.fetch_add(1, Ordering::SeqCst);
        });
    }
}

#[test]
fn test_handler_may_claim_history() {
    let queue = InMemoryQueue::text();
    queue
        .appender()
        .write(HISTORY, &MessageHistory::default())
        .unwrap();

    let seen = Arc::new(AtomicUsize::new(0));
    let mut reader = MethodReader::builder(queue.tailer())
        .handler(Arc::new(HistoryAware {
            seen: Arc::clone(&seen),
        }))
        .build()
        .unwrap();

    assert_eq!(reader.len(), 1);
    assert!(reader.process_next());
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}
