//! Property tests: strict and lazy evaluation agree on programs without
//! side effects.
//!
//! Programs are generated well-typed (numbers where numbers are expected,
//! booleans where booleans are expected), so neither strategy can fail on
//! an argument the other never evaluates.

use proptest::prelude::*;
use sable_eval::{run_program, silent_handler, ContextBuilder, StrategyKind};
use sable_ir::{AstBuilder, BinaryOp, Chapter, NodeId, SharedArena, SharedInterner, UnaryOp};

#[derive(Clone, Debug)]
enum Num {
    Lit(i16),
    Neg(Box<Num>),
    Arith(BinaryOp, Box<Num>, Box<Num>),
    If(Box<Bool>, Box<Num>, Box<Num>),
    /// `((a, b) => a)(l, r)` or `((a, b) => b)(l, r)`.
    Pick(bool, Box<Num>, Box<Num>),
}

#[derive(Clone, Debug)]
enum Bool {
    Lit(bool),
    Not(Box<Bool>),
    Compare(BinaryOp, Box<Num>, Box<Num>),
    /// `&&` when true, `||` when false.
    Logic(bool, Box<Bool>, Box<Bool>),
}

// -- Strategies --

fn arith_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Add),
        Just(BinaryOp::Sub),
        Just(BinaryOp::Mul),
        Just(BinaryOp::Div),
        Just(BinaryOp::Mod),
    ]
}

fn compare_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::StrictEq),
        Just(BinaryOp::StrictNotEq),
        Just(BinaryOp::Lt),
        Just(BinaryOp::LtEq),
        Just(BinaryOp::Gt),
        Just(BinaryOp::GtEq),
    ]
}

fn num(depth: u32) -> BoxedStrategy<Num> {
    let leaf = (-100i16..100).prop_map(Num::Lit);
    if depth == 0 {
        return leaf.boxed();
    }
    prop_oneof![
        2 => leaf,
        1 => num(depth - 1).prop_map(|n| Num::Neg(Box::new(n))),
        2 => (arith_op(), num(depth - 1), num(depth - 1))
            .prop_map(|(op, l, r)| Num::Arith(op, Box::new(l), Box::new(r))),
        1 => (boolean(depth - 1), num(depth - 1), num(depth - 1))
            .prop_map(|(t, c, a)| Num::If(Box::new(t), Box::new(c), Box::new(a))),
        1 => (any::<bool>(), num(depth - 1), num(depth - 1))
            .prop_map(|(first, l, r)| Num::Pick(first, Box::new(l), Box::new(r))),
    ]
    .boxed()
}

fn boolean(depth: u32) -> BoxedStrategy<Bool> {
    let leaf = any::<bool>().prop_map(Bool::Lit);
    if depth == 0 {
        return leaf.boxed();
    }
    prop_oneof![
        leaf,
        boolean(depth - 1).prop_map(|b| Bool::Not(Box::new(b))),
        (compare_op(), num(depth - 1), num(depth - 1))
            .prop_map(|(op, l, r)| Bool::Compare(op, Box::new(l), Box::new(r))),
        (any::<bool>(), boolean(depth - 1), boolean(depth - 1))
            .prop_map(|(and, l, r)| Bool::Logic(and, Box::new(l), Box::new(r))),
    ]
    .boxed()
}

// -- Lowering --

fn lower_num(b: &mut AstBuilder, expr: &Num) -> NodeId {
    match expr {
        Num::Lit(n) => b.number(f64::from(*n)),
        Num::Neg(operand) => {
            let operand = lower_num(b, operand);
            b.unary(UnaryOp::Neg, operand)
        }
        Num::Arith(op, l, r) => {
            let l = lower_num(b, l);
            let r = lower_num(b, r);
            b.binary(*op, l, r)
        }
        Num::If(test, consequent, alternate) => {
            let test = lower_bool(b, test);
            let consequent = lower_num(b, consequent);
            let alternate = lower_num(b, alternate);
            b.conditional(test, consequent, alternate)
        }
        Num::Pick(first, l, r) => {
            let chosen = b.ident(if *first { "a" } else { "b" });
            let function = b.arrow(&["a", "b"], chosen);
            let l = lower_num(b, l);
            let r = lower_num(b, r);
            b.call(function, &[l, r])
        }
    }
}

fn lower_bool(b: &mut AstBuilder, expr: &Bool) -> NodeId {
    match expr {
        Bool::Lit(value) => b.boolean(*value),
        Bool::Not(operand) => {
            let operand = lower_bool(b, operand);
            b.unary(UnaryOp::Not, operand)
        }
        Bool::Compare(op, l, r) => {
            let l = lower_num(b, l);
            let r = lower_num(b, r);
            b.binary(*op, l, r)
        }
        Bool::Logic(and, l, r) => {
            let l = lower_bool(b, l);
            let r = lower_bool(b, r);
            if *and {
                b.and(l, r)
            } else {
                b.or(l, r)
            }
        }
    }
}

/// `const v = first; pair(v, second);`
fn program(first: &Num, second: &Num) -> (SharedArena, SharedInterner, NodeId) {
    let interner = SharedInterner::default();
    let mut b = AstBuilder::new(interner.clone());
    let init = lower_num(&mut b, first);
    let decl = b.const_decl("v", init);
    let v = b.ident("v");
    let rest = lower_num(&mut b, second);
    let pair = b.call_named("pair", &[v, rest]);
    let stmt = b.expr_stmt(pair);
    let root = b.program(&[decl, stmt]);
    (b.finish(), interner, root)
}

fn evaluate(
    strategy: StrategyKind,
    arena: &SharedArena,
    interner: &SharedInterner,
    root: NodeId,
) -> Result<String, String> {
    let ctx = ContextBuilder::new(arena.clone(), interner.clone())
        .chapter(Chapter::TWO)
        .strategy(strategy)
        .print_handler(silent_handler())
        .build();
    let (result, _) = run_program(ctx, root);
    result.map(|value| value.to_string()).map_err(|err| err.message)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn strict_and_lazy_agree(first in num(3), second in num(3)) {
        let (arena, interner, root) = program(&first, &second);
        let strict = evaluate(StrategyKind::Strict, &arena, &interner, root);
        let lazy = evaluate(StrategyKind::Lazy, &arena, &interner, root);
        prop_assert!(strict.is_ok(), "well-typed program failed: {:?}", strict);
        prop_assert_eq!(strict, lazy);
    }
}
