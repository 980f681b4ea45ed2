use super::*;
use crate::environment::Scope;

fn env() -> Env {
    LocalScope::new(Scope::new("global"))
}

#[test]
fn ready_thunks_are_evaluated() {
    let thunk = Thunk::ready(Value::Number(1.0));
    assert!(thunk.is_evaluated());
    assert!(matches!(thunk.start(), ForceStart::Ready(Value::Number(n)) if n == 1.0));
}

#[test]
fn forcing_twice_is_a_cycle() {
    let thunk = Thunk::deferred(NodeId::new(7), env());
    let ForceStart::Produce(producer) = thunk.start() else {
        panic!("pending thunk should produce");
    };
    assert_eq!(producer.node, NodeId::new(7));
    assert!(matches!(thunk.start(), ForceStart::Cycle));

    thunk.complete(Value::Bool(true));
    assert_eq!(thunk.value(), Some(Value::Bool(true)));
}

#[test]
fn abandoned_thunks_retry() {
    let thunk = Thunk::deferred(NodeId::new(1), env());
    let ForceStart::Produce(producer) = thunk.start() else {
        panic!("pending thunk should produce");
    };
    thunk.abandon(producer);
    assert!(!thunk.is_evaluated());
    assert!(matches!(thunk.start(), ForceStart::Produce(_)));
}

#[test]
fn clones_share_the_memo() {
    let thunk = Thunk::deferred(NodeId::new(1), env());
    let alias = thunk.clone();
    assert!(alias.ptr_eq(&thunk));
    thunk.complete(Value::Null);
    assert!(alias.is_evaluated());
}

#[test]
fn shared_thunks_keep_their_value_on_release() {
    let thunk = Thunk::ready(Value::Number(2.0));
    let alias = thunk.clone();
    let mut released = Vec::new();
    thunk.release_into(&mut released);
    assert!(released.is_empty());
    assert_eq!(alias.value(), Some(Value::Number(2.0)));

    drop(alias);
    thunk.release_into(&mut released);
    assert_eq!(released.len(), 1);
}
