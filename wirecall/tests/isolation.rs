//! Failures inside one record's dispatch are logged and never stop the reader.

use std::sync::Arc;
use wirecall::{
    InMemoryQueue, MethodReader, WireKind,
    testing::{FailingHandler, capture_logs},
};

fn misbehaving_log(kind: WireKind) -> InMemoryQueue {
    let queue = InMemoryQueue::new(kind);
    let mut appender = queue.appender();
    appender.write("fail", &7u32).unwrap();
    appender.write("panic", &8u32).unwrap();
    appender.write("count", &"not a number").unwrap();
    appender.write("count", &9u32).unwrap();
    queue
}

fn replay(kind: WireKind) -> (Arc<FailingHandler>, String) {
    let queue = misbehaving_log(kind);
    let handler = Arc::new(FailingHandler::new());
    let mut reader = MethodReader::builder(queue.tailer())
        .handler(Arc::clone(&handler))
        .build()
        .unwrap();

    let (consumed, logs) = capture_logs(|| reader.process_all());
    assert_eq!(consumed, 4);
    (handler, logs)
}

#[test]
fn test_every_failure_is_survived() {
    for kind in [WireKind::Text, WireKind::Binary] {
        let (handler, _) = replay(kind);
        assert_eq!(handler.attempts(), 3);
        assert_eq!(handler.successes(), 1);
    }
}

#[test]
fn test_failures_logged_with_handler_and_argument() {
    let (_, logs) = replay(WireKind::Text);

    let errors: Vec<&str> = logs.lines().filter(|l| l.contains("ERROR")).collect();
    assert_eq!(errors.len(), 3, "{logs}");

    assert!(errors[0].contains("handler=fail"), "{logs}");
    assert!(errors[0].contains("argument=7"), "{logs}");
    assert!(errors[0].contains("refusing 7"), "{logs}");

    assert!(errors[1].contains("handler=panic"), "{logs}");
    assert!(errors[1].contains("cannot take 8"), "{logs}");

    assert!(errors[2].contains("handler=count"), "{logs}");
    assert!(errors[2].contains("not a number"), "{logs}");
}

#[test]
fn test_binary_argument_is_rendered_readably() {
    let (_, logs) = replay(WireKind::Binary);
    let decode_failure = logs
        .lines()
        .find(|l| l.contains("ERROR") && l.contains("handler=count"))
        .unwrap();
    assert!(decode_failure.contains("argument=\"not a number\""), "{logs}");
}
