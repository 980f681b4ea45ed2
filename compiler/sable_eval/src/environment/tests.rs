use pretty_assertions::assert_eq;

use super::*;
use sable_ir::StringInterner;

fn number(bound: &Bound) -> f64 {
    match bound {
        Bound::Value(Value::Number(n)) => *n,
        other => panic!("expected a number, got {other:?}"),
    }
}

#[test]
fn define_and_lookup() {
    let interner = StringInterner::new();
    let x = interner.intern("x");

    let env = LocalScope::new(Scope::new("global"));
    env.borrow_mut()
        .define(x, Value::Number(42.0).into(), Mutability::Immutable);
    assert_eq!(number(&env.lookup(x).expect("bound")), 42.0);
}

#[test]
fn child_shadows_parent() {
    let interner = StringInterner::new();
    let x = interner.intern("x");

    let parent = LocalScope::new(Scope::new("global"));
    parent
        .borrow_mut()
        .define(x, Value::Number(1.0).into(), Mutability::Immutable);
    let child = parent.child("block");
    assert_eq!(number(&child.lookup(x).expect("inherited")), 1.0);

    child
        .borrow_mut()
        .define(x, Value::Number(2.0).into(), Mutability::Immutable);
    assert_eq!(number(&child.lookup(x).expect("shadowed")), 2.0);
    assert_eq!(number(&parent.lookup(x).expect("untouched")), 1.0);
}

#[test]
fn hoisted_placeholder_hides_outer_binding() {
    let interner = StringInterner::new();
    let x = interner.intern("x");

    let outer = LocalScope::new(Scope::new("global"));
    outer
        .borrow_mut()
        .define(x, Value::Number(1.0).into(), Mutability::Immutable);
    let inner = outer.child("block");
    inner
        .borrow_mut()
        .hoist(x, Mutability::Immutable)
        .expect("fresh frame");

    assert_eq!(inner.lookup(x).map(|_| ()), Err(LookupError::Unassigned));

    inner
        .borrow_mut()
        .declare(x, Value::Number(2.0).into(), Mutability::Immutable)
        .expect("fills the placeholder");
    assert_eq!(number(&inner.lookup(x).expect("assigned")), 2.0);
}

#[test]
fn hoisting_twice_is_a_redeclaration() {
    let interner = StringInterner::new();
    let x = interner.intern("x");

    let mut scope = Scope::new("program");
    scope.hoist(x, Mutability::Mutable).expect("first");
    assert_eq!(
        scope.hoist(x, Mutability::Immutable),
        Err(DeclareError {
            mutability: Mutability::Mutable
        })
    );
}

#[test]
fn declaring_an_assigned_name_fails() {
    let interner = StringInterner::new();
    let x = interner.intern("x");

    let mut scope = Scope::new("program");
    scope
        .declare(x, Value::Null.into(), Mutability::Immutable)
        .expect("first declaration");
    assert!(scope
        .declare(x, Value::Null.into(), Mutability::Immutable)
        .is_err());
}

#[test]
fn lookup_of_unknown_name() {
    let interner = StringInterner::new();
    let env = LocalScope::new(Scope::new("global")).child("block");
    assert_eq!(
        env.lookup(interner.intern("nope")).map(|_| ()),
        Err(LookupError::Undefined)
    );
}

#[test]
fn assign_respects_mutability() {
    let interner = StringInterner::new();
    let x = interner.intern("x");
    let c = interner.intern("c");
    let pending = interner.intern("pending");

    let global = LocalScope::new(Scope::new("global"));
    {
        let mut scope = global.borrow_mut();
        scope.define(x, Value::Number(1.0).into(), Mutability::Mutable);
        scope.define(c, Value::Number(1.0).into(), Mutability::Immutable);
        scope.hoist(pending, Mutability::Mutable).expect("fresh");
    }
    let child = global.child("block");

    child.assign(x, Value::Number(5.0)).expect("mutable");
    assert_eq!(number(&global.lookup(x).expect("bound")), 5.0);
    assert_eq!(child.assign(c, Value::Null), Err(AssignError::Immutable));
    assert_eq!(
        child.assign(pending, Value::Null),
        Err(AssignError::Unassigned)
    );
    assert_eq!(
        child.assign(interner.intern("y"), Value::Null),
        Err(AssignError::Undefined)
    );
}

#[test]
fn deep_chains_resolve() {
    let interner = StringInterner::new();
    let x = interner.intern("x");

    let root = LocalScope::new(Scope::new("global"));
    root.borrow_mut()
        .define(x, Value::Bool(true).into(), Mutability::Immutable);
    let mut env = root.clone();
    for _ in 0..2_000 {
        env = env.child("block");
    }
    assert!(matches!(
        env.lookup(x),
        Ok(Bound::Value(Value::Bool(true)))
    ));
}

#[test]
fn stack_never_pops_global() {
    let mut envs = Environments::new();
    let global = envs.global().clone();
    let block = envs.create("block", &global);
    envs.push(block.clone());
    assert_eq!(envs.depth(), 2);
    assert!(envs.current().ptr_eq(&block));

    assert!(envs.pop().is_some());
    assert!(envs.pop().is_none());
    assert_eq!(envs.depth(), 1);
    assert!(envs.current().ptr_eq(&global));
}

#[test]
fn truncate_and_replace() {
    let mut envs = Environments::new();
    let global = envs.global().clone();
    for _ in 0..5 {
        let env = envs.create("block", &global);
        envs.push(env);
    }
    let replacement = envs.create("f", &global);
    envs.replace_current(replacement.clone());
    assert_eq!(envs.depth(), 6);
    assert!(envs.current().ptr_eq(&replacement));

    envs.truncate(2);
    assert_eq!(envs.depth(), 2);
    envs.truncate(0);
    assert_eq!(envs.depth(), 1);
}

#[test]
fn dropping_the_stack_breaks_frame_cycles() {
    let interner = StringInterner::new();
    let me = interner.intern("me");

    let weak = {
        let mut envs = Environments::new();
        let global = envs.global().clone();
        let frame = envs.create("f", &global);
        // The frame binds a deferred value that captures the frame itself.
        let thunk = Thunk::deferred(sable_ir::NodeId::new(0), frame.clone());
        frame
            .borrow_mut()
            .define(me, Bound::Deferred(thunk), Mutability::Immutable);
        frame.downgrade()
    };
    assert!(!weak.is_live());
}

#[test]
fn registry_is_pruned() {
    let mut envs = Environments::new();
    let global = envs.global().clone();
    for _ in 0..1_000 {
        let _ = envs.create("block", &global);
    }
    assert!(envs.registry.len() < MIN_PRUNE * 2);
}

#[test]
fn long_deferred_chains_drop_without_recursion() {
    let interner = StringInterner::new();
    let acc = interner.intern("acc");
    let global = LocalScope::new(Scope::new("global"));

    // Each frame binds a pending thunk over the previous frame, the shape a
    // lazy loop leaves behind when its accumulator is never forced.
    let first = global.child("loop");
    let oldest = first.downgrade();
    let mut last = first;
    for _ in 0..200_000 {
        let frame = global.child("loop");
        let thunk = Thunk::deferred(sable_ir::NodeId::new(0), last);
        frame
            .borrow_mut()
            .define(acc, Bound::Deferred(thunk), Mutability::Mutable);
        last = frame;
    }
    assert!(oldest.is_live());
    drop(last);
    assert!(!oldest.is_live());
    assert!(global.is_unique());
}

#[test]
fn shared_frames_survive_a_dropped_chain() {
    let interner = StringInterner::new();
    let acc = interner.intern("acc");
    let global = LocalScope::new(Scope::new("global"));

    let kept = global.child("loop");
    let frame = global.child("loop");
    let thunk = Thunk::deferred(sable_ir::NodeId::new(0), kept.clone());
    frame
        .borrow_mut()
        .define(acc, Bound::Deferred(thunk), Mutability::Mutable);
    drop(frame);

    kept.borrow_mut()
        .define(acc, Value::Number(1.0).into(), Mutability::Mutable);
    assert_eq!(number(&kept.lookup(acc).expect("still bound")), 1.0);
}
