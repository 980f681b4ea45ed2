//! Declarations are hoisted to the top of their program, block or body.

use pretty_assertions::assert_eq;
use sable_ir::BinaryOp;

use super::support::{build, error_of, value_of, BOTH};
use crate::{RuntimeErrorKind, Value};

#[test]
fn reading_before_the_declaration_runs_is_unassigned() {
    // const x = 1;
    // function f() { const y = x; const x = 2; return y; }
    // f();
    let built = build(|b| {
        let one = b.number(1.0);
        let outer = b.const_decl("x", one);
        let x = b.ident("x");
        let y = b.const_decl("y", x);
        let two = b.number(2.0);
        let inner = b.const_decl("x", two);
        let y_ref = b.ident("y");
        let ret = b.ret(y_ref);
        let f = b.function_decl("f", &[], &[y, inner, ret]);
        let call = b.call_named("f", &[]);
        let stmt = b.expr_stmt(call);
        b.program(&[outer, f, stmt])
    });

    // Strict reads `x` when `y` is declared.
    let err = error_of(&built, 1, crate::StrategyKind::Strict);
    assert_eq!(
        err.kind,
        RuntimeErrorKind::UnassignedVariable {
            name: "x".to_owned()
        }
    );

    // Lazy reads it when `y` is returned, after the inner `x` was bound.
    assert_eq!(
        value_of(&built, 1, crate::StrategyKind::Lazy),
        Value::Number(2.0)
    );
}

#[test]
fn unknown_name_is_undefined() {
    let built = build(|b| {
        let z = b.ident("nowhere");
        let stmt = b.expr_stmt(z);
        b.program(&[stmt])
    });
    for strategy in BOTH {
        let err = error_of(&built, 1, strategy);
        assert_eq!(err.message, "Name nowhere not declared.");
    }
}

#[test]
fn functions_may_call_functions_declared_later() {
    // function f() { return g(); } function g() { return 7; } f();
    let built = build(|b| {
        let g_call = b.call_named("g", &[]);
        let ret = b.ret(g_call);
        let f = b.function_decl("f", &[], &[ret]);
        let seven = b.number(7.0);
        let ret = b.ret(seven);
        let g = b.function_decl("g", &[], &[ret]);
        let call = b.call_named("f", &[]);
        let stmt = b.expr_stmt(call);
        b.program(&[f, g, stmt])
    });
    for strategy in BOTH {
        assert_eq!(value_of(&built, 1, strategy), Value::Number(7.0));
    }
}

#[test]
fn redeclaring_a_variable() {
    // let x = 1; let x = 2;
    let built = build(|b| {
        let one = b.number(1.0);
        let first = b.let_decl("x", one);
        let two = b.number(2.0);
        let second = b.let_decl("x", two);
        b.program(&[first, second])
    });
    for strategy in BOTH {
        let err = error_of(&built, 3, strategy);
        assert_eq!(
            err.kind,
            RuntimeErrorKind::VariableRedeclaration {
                name: "x".to_owned(),
                writable: true
            }
        );
        assert!(err.message.contains("Use assignment (x = ...)"));
    }
}

#[test]
fn redeclaring_a_constant_as_a_function() {
    // const f = 1; function f() {}
    let built = build(|b| {
        let one = b.number(1.0);
        let constant = b.const_decl("f", one);
        let function = b.function_decl("f", &[], &[]);
        b.program(&[constant, function])
    });
    for strategy in BOTH {
        let err = error_of(&built, 1, strategy);
        assert!(err.message.contains("f is a constant"), "{}", err.message);
        // Raised while hoisting, before anything runs.
        assert!(err.node.is_some());
    }
}

#[test]
fn blocks_shadow_without_leaking() {
    // const x = 1; { const x = 2; x + 1; } x;
    let built = build(|b| {
        let one = b.number(1.0);
        let outer = b.const_decl("x", one);
        let two = b.number(2.0);
        let inner = b.const_decl("x", two);
        let x = b.ident("x");
        let one = b.number(1.0);
        let sum = b.binary(BinaryOp::Add, x, one);
        let s = b.expr_stmt(sum);
        let block = b.block(&[inner, s]);
        let x = b.ident("x");
        let read = b.expr_stmt(x);
        b.program(&[outer, block, read])
    });
    for strategy in BOTH {
        let (result, ev) = super::support::run(&built, 1, strategy);
        assert_eq!(result, Ok(Value::Number(1.0)));
        assert_eq!(ev.context().environment_depth(), 2);
    }
}

#[test]
fn block_value_is_its_last_statement() {
    // { const x = 2; x * 3; }
    let built = build(|b| {
        let two = b.number(2.0);
        let decl = b.const_decl("x", two);
        let x = b.ident("x");
        let three = b.number(3.0);
        let product = b.binary(BinaryOp::Mul, x, three);
        let s = b.expr_stmt(product);
        let block = b.block(&[decl, s]);
        b.program(&[block])
    });
    for strategy in BOTH {
        assert_eq!(value_of(&built, 1, strategy), Value::Number(6.0));
    }
}
