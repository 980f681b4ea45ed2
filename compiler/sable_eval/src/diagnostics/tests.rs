use super::*;
use crate::errors::RuntimeErrorKind;

fn frame(name: Name, at: u32) -> CallFrame {
    CallFrame {
        name,
        call_site: Some(Span::new(at, at + 1)),
    }
}

#[test]
fn push_and_pop() {
    let interner = StringInterner::new();
    let name = interner.intern("f");
    let mut stack = CallStack::new(Some(10));
    stack.push(frame(name, 0)).expect("push within limit");
    assert_eq!(stack.depth(), 1);
    stack.pop();
    assert!(stack.is_empty());
}

#[test]
fn depth_limit_enforced() {
    let interner = StringInterner::new();
    let name = interner.intern("recurse");
    let mut stack = CallStack::new(Some(3));
    for i in 0..3 {
        stack.push(frame(name, i)).expect("push within limit");
    }
    let err = stack.push(frame(name, 3)).expect_err("fourth push overflows");
    assert_eq!(err.kind, RuntimeErrorKind::StackOverflow { depth: 3 });
    assert!(err.is_fatal());
    assert_eq!(stack.depth(), 3);
}

#[test]
fn replace_top_keeps_depth() {
    let interner = StringInterner::new();
    let f = interner.intern("f");
    let g = interner.intern("g");
    let mut stack = CallStack::new(None);
    stack.push(frame(f, 0)).expect("unbounded");
    stack.replace_top(frame(g, 5));
    assert_eq!(stack.depth(), 1);
    let trace = stack.capture(&interner);
    assert_eq!(trace.frames()[0].name, "g");
}

#[test]
fn capture_is_most_recent_first() {
    let interner = StringInterner::new();
    let outer = interner.intern("outer");
    let mut stack = CallStack::new(None);
    stack.push(frame(outer, 0)).expect("unbounded");
    stack.push(frame(Name::EMPTY, 4)).expect("unbounded");
    let trace = stack.capture(&interner);
    assert_eq!(trace.frames()[0].name, "anonymous");
    assert_eq!(trace.frames()[1].name, "outer");
    assert_eq!(
        trace.to_string(),
        "stack backtrace:\n  0: anonymous at 4..5\n  1: outer at 0..1"
    );
}

#[test]
fn attach_skips_empty_stack() {
    let interner = StringInterner::new();
    let stack = CallStack::default();
    let err = stack.attach_backtrace(crate::errors::cyclic_deferred_value(), &interner);
    assert!(err.backtrace.is_none());
}

#[test]
fn counters_report() {
    let mut counters = EvalCounters::default();
    counters.count_step();
    counters.count_tail_call();
    counters.count_tail_call();
    let report = counters.report();
    assert!(report.contains("Steps:             1"));
    assert!(report.contains("Tail calls:        2"));
}
