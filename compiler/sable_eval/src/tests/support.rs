//! Shared helpers: build a tree, build a context over it, run it.

use sable_ir::{AstBuilder, BinaryOp, Chapter, NodeId, SharedArena, SharedInterner};

use crate::{
    buffer_handler, Context, ContextBuilder, Evaluator, RuntimeError, StrategyKind, Value,
};

pub const BOTH: [StrategyKind; 2] = [StrategyKind::Strict, StrategyKind::Lazy];

/// A built tree plus the interner it was built with.
pub struct Built {
    pub arena: SharedArena,
    pub interner: SharedInterner,
    pub root: NodeId,
}

/// Build a tree; the closure returns the root.
pub fn build(f: impl FnOnce(&mut AstBuilder) -> NodeId) -> Built {
    let interner = SharedInterner::default();
    let mut b = AstBuilder::new(interner.clone());
    let root = f(&mut b);
    Built {
        arena: b.finish(),
        interner,
        root,
    }
}

/// A context with a capturing print handler.
pub fn context(built: &Built, chapter: u8, strategy: StrategyKind) -> Context {
    ContextBuilder::new(built.arena.clone(), built.interner.clone())
        .chapter(Chapter::new(chapter).unwrap_or_default())
        .strategy(strategy)
        .print_handler(buffer_handler())
        .build()
}

pub fn evaluator(built: &Built, chapter: u8, strategy: StrategyKind) -> Evaluator {
    Evaluator::new(context(built, chapter, strategy))
}

/// Run the built program to completion.
pub fn run(
    built: &Built,
    chapter: u8,
    strategy: StrategyKind,
) -> (Result<Value, RuntimeError>, Evaluator) {
    let mut ev = evaluator(built, chapter, strategy);
    let result = ev.run_program(built.root);
    (result, ev)
}

/// Run and return the value, panicking on a runtime error.
pub fn value_of(built: &Built, chapter: u8, strategy: StrategyKind) -> Value {
    match run(built, chapter, strategy).0 {
        Ok(value) => value,
        Err(err) => panic!("{strategy} run failed: {err}"),
    }
}

/// Run and return the error, panicking if the run succeeds.
pub fn error_of(built: &Built, chapter: u8, strategy: StrategyKind) -> RuntimeError {
    match run(built, chapter, strategy).0 {
        Ok(value) => panic!("{strategy} run should fail, got {value}"),
        Err(err) => err,
    }
}

/// Everything printed through the context's handler.
pub fn output(ev: &Evaluator) -> String {
    ev.context().print_handler().get_output()
}

/// `function countdown(n) { return n === 0 ? "done" : countdown(n - 1); }`
pub fn countdown(b: &mut AstBuilder) -> NodeId {
    let n = b.ident("n");
    let zero = b.number(0.0);
    let test = b.binary(BinaryOp::StrictEq, n, zero);
    let done = b.string("done");
    let n = b.ident("n");
    let one = b.number(1.0);
    let next = b.binary(BinaryOp::Sub, n, one);
    let again = b.call_named("countdown", &[next]);
    let body = b.conditional(test, done, again);
    let ret = b.ret(body);
    b.function_decl("countdown", &["n"], &[ret])
}
