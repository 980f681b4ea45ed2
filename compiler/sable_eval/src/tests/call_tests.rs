//! Calls: arity, natives, depth limits and backtraces.

use pretty_assertions::assert_eq;
use sable_ir::{AstBuilder, BinaryOp, Chapter, NodeId};

use super::support::{
    build, context, countdown, error_of, evaluator, output, run, value_of, Built, BOTH,
};
use crate::errors::undefined_variable;
use crate::{
    buffer_handler, Arity, ContextBuilder, Evaluator, NativeError, NativeFunction,
    RuntimeErrorKind, StrategyKind, Value,
};

#[test]
fn wrong_argument_count_binds_nothing() {
    // function f(a, b) { return a; } f(1);
    let built = build(|b| {
        let a = b.ident("a");
        let ret = b.ret(a);
        let f = b.function_decl("f", &["a", "b"], &[ret]);
        let one = b.number(1.0);
        let call = b.call_named("f", &[one]);
        let stmt = b.expr_stmt(call);
        b.program(&[f, stmt])
    });
    for strategy in BOTH {
        let (result, ev) = run(&built, 1, strategy);
        let err = result.expect_err("arity mismatch");
        assert_eq!(
            err.kind,
            RuntimeErrorKind::InvalidNumberOfArguments {
                callee: "f".to_owned(),
                expected: Arity::Exact(2),
                got: 1
            }
        );
        assert_eq!(err.message, "f: Expected 2 arguments, but got 1.");
        let ctx = ev.context();
        assert_eq!(ctx.environment_depth(), ctx.outer_environments());
        assert_eq!(ctx.errors().len(), 1);
    }
}

#[test]
fn extra_arguments_are_rejected() {
    // function f(a, b) { return a; } f(1, 2, 3);
    let built = build(|b| {
        let a = b.ident("a");
        let ret = b.ret(a);
        let f = b.function_decl("f", &["a", "b"], &[ret]);
        let one = b.number(1.0);
        let two = b.number(2.0);
        let three = b.number(3.0);
        let call = b.call_named("f", &[one, two, three]);
        let stmt = b.expr_stmt(call);
        b.program(&[f, stmt])
    });
    for strategy in BOTH {
        let (result, ev) = run(&built, 1, strategy);
        let err = result.expect_err("arity mismatch");
        assert_eq!(
            err.kind,
            RuntimeErrorKind::InvalidNumberOfArguments {
                callee: "f".to_owned(),
                expected: Arity::Exact(2),
                got: 3
            }
        );
        assert_eq!(err.message, "f: Expected 2 arguments, but got 3.");
        let ctx = ev.context();
        assert_eq!(ctx.environment_depth(), ctx.outer_environments());
        assert!(ctx.call_stack().is_empty());
    }
}

#[test]
fn native_arity_is_checked() {
    // is_number(1, 2);
    let built = build(|b| {
        let one = b.number(1.0);
        let two = b.number(2.0);
        let call = b.call_named("is_number", &[one, two]);
        let stmt = b.expr_stmt(call);
        b.program(&[stmt])
    });
    for strategy in BOTH {
        let err = error_of(&built, 1, strategy);
        assert_eq!(err.message, "is_number: Expected 1 arguments, but got 2.");
    }
}

#[test]
fn host_errors_become_exceptions_at_the_call() {
    // error("boom");
    let built = build(|b| {
        let msg = b.string("boom");
        let call = b.call_named("error", &[msg]);
        let stmt = b.expr_stmt(call);
        b.program(&[stmt])
    });
    for strategy in BOTH {
        let err = error_of(&built, 1, strategy);
        assert_eq!(
            err.kind,
            RuntimeErrorKind::Exception {
                callee: "error".to_owned(),
                message: "\"boom\"".to_owned()
            }
        );
        assert_eq!(err.to_string(), "\"boom\"");
        assert!(err.span.is_some());
        assert!(err.backtrace.is_none());
    }
}

#[test]
fn classified_native_errors_pass_through() {
    let built = build(|b| {
        let call = b.call_named("lookup_missing", &[]);
        let stmt = b.expr_stmt(call);
        b.program(&[stmt])
    });
    for strategy in BOTH {
        let mut ctx = context(&built, 1, strategy);
        ctx.define_native(NativeFunction::forced("lookup_missing", Arity::Exact(0), |_, _| {
            Err(NativeError::Runtime(undefined_variable("zzz")))
        }));
        let mut ev = Evaluator::new(ctx);
        let err = ev.run_program(built.root).expect_err("native fails");
        assert_eq!(
            err.kind,
            RuntimeErrorKind::UndefinedVariable {
                name: "zzz".to_owned()
            }
        );
        assert!(err.node.is_some());
    }
}

#[test]
fn natives_see_the_print_handler() {
    // display(42, "answer:");
    let built = build(|b| {
        let n = b.number(42.0);
        let label = b.string("answer:");
        let call = b.call_named("display", &[n, label]);
        let stmt = b.expr_stmt(call);
        b.program(&[stmt])
    });
    for strategy in BOTH {
        let (result, ev) = run(&built, 1, strategy);
        assert_eq!(result, Ok(Value::Number(42.0)));
        assert_eq!(output(&ev), "answer: 42\n");
    }
}

/// `function sum(n) { return n === 0 ? 0 : n + sum(n - 1); }`
fn sum_decl(b: &mut AstBuilder) -> NodeId {
    let n = b.ident("n");
    let zero = b.number(0.0);
    let test = b.binary(BinaryOp::StrictEq, n, zero);
    let base = b.number(0.0);
    let n = b.ident("n");
    let n2 = b.ident("n");
    let one = b.number(1.0);
    let pred = b.binary(BinaryOp::Sub, n2, one);
    let rec = b.call_named("sum", &[pred]);
    let total = b.binary(BinaryOp::Add, n, rec);
    let body = b.conditional(test, base, total);
    let ret = b.ret(body);
    b.function_decl("sum", &["n"], &[ret])
}

fn sum_program(n: f64) -> Built {
    build(|b| {
        let decl = sum_decl(b);
        let arg = b.number(n);
        let call = b.call_named("sum", &[arg]);
        let stmt = b.expr_stmt(call);
        b.program(&[decl, stmt])
    })
}

#[test]
fn deep_recursion_does_not_use_the_native_stack() {
    let built = sum_program(20_000.0);
    for strategy in BOTH {
        assert_eq!(value_of(&built, 1, strategy), Value::Number(200_010_000.0));
    }
}

#[test]
fn call_depth_limit_is_fatal() {
    for strategy in BOTH {
        let within = sum_program(40.0);
        let ctx = ContextBuilder::new(within.arena.clone(), within.interner.clone())
            .strategy(strategy)
            .max_call_depth(Some(50))
            .print_handler(buffer_handler())
            .build();
        let mut ev = Evaluator::new(ctx);
        assert_eq!(ev.run_program(within.root), Ok(Value::Number(820.0)));

        let beyond = sum_program(100.0);
        let ctx = ContextBuilder::new(beyond.arena.clone(), beyond.interner.clone())
            .strategy(strategy)
            .max_call_depth(Some(50))
            .build();
        let mut ev = Evaluator::new(ctx);
        let err = ev.run_program(beyond.root).expect_err("depth limit");
        assert_eq!(err.kind, RuntimeErrorKind::StackOverflow { depth: 50 });
        assert!(err.is_fatal());
        assert_eq!(err.message, "Maximum call stack size of 50 exceeded.");
        let backtrace = err.backtrace.expect("backtrace");
        assert_eq!(backtrace.frames().len(), 50);
        assert_eq!(backtrace.frames()[0].name, "sum");
        let ctx = ev.context();
        assert_eq!(ctx.environment_depth(), ctx.outer_environments());
        assert!(ctx.call_stack().is_empty());
    }
}

#[test]
fn tail_calls_do_not_count_against_the_depth_limit() {
    let built = build(|b| {
        let decl = countdown(b);
        let n = b.number(1_000.0);
        let call = b.call_named("countdown", &[n]);
        let stmt = b.expr_stmt(call);
        b.program(&[decl, stmt])
    });
    for strategy in BOTH {
        let ctx = ContextBuilder::new(built.arena.clone(), built.interner.clone())
            .chapter(Chapter::ONE)
            .strategy(strategy)
            .max_call_depth(Some(10))
            .profile(true)
            .build();
        let mut ev = Evaluator::new(ctx);
        assert_eq!(ev.run_program(built.root), Ok(Value::string("done")));
        let counters = ev.context().counters().expect("profiling on");
        assert_eq!(counters.function_calls, 1);
        assert_eq!(counters.tail_calls, 1_000);
        assert!(counters.report().contains("1000"));
    }
}

#[test]
fn backtrace_lists_the_innermost_call_first() {
    // function inner() { return error("deep"); }
    // function outer() { return 1 + inner(); }
    // outer();
    let built = build(|b| {
        let msg = b.string("deep");
        let fail = b.call_named("error", &[msg]);
        let ret = b.ret(fail);
        let inner = b.function_decl("inner", &[], &[ret]);
        let one = b.number(1.0);
        let call_inner = b.call_named("inner", &[]);
        let sum = b.binary(BinaryOp::Add, one, call_inner);
        let ret = b.ret(sum);
        let outer = b.function_decl("outer", &[], &[ret]);
        let call = b.call_named("outer", &[]);
        let stmt = b.expr_stmt(call);
        b.program(&[inner, outer, stmt])
    });
    for strategy in BOTH {
        let err = error_of(&built, 1, strategy);
        let names: Vec<&str> = err
            .backtrace
            .as_ref()
            .expect("backtrace")
            .frames()
            .iter()
            .map(|frame| frame.name.as_str())
            .collect();
        assert_eq!(names, ["inner", "outer"]);
    }
}

#[test]
fn anonymous_functions_are_named_in_errors() {
    // (x => x)();
    let built = build(|b| {
        let x = b.ident("x");
        let id = b.arrow(&["x"], x);
        let call = b.call(id, &[]);
        let stmt = b.expr_stmt(call);
        b.program(&[stmt])
    });
    let mut ev = evaluator(&built, 1, StrategyKind::Strict);
    let err = ev.run_program(built.root).expect_err("arity");
    assert_eq!(err.message, "anonymous: Expected 1 arguments, but got 0.");
}
