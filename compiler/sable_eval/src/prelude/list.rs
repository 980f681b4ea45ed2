//! Pairs and lists.
//!
//! `pair` and `list` keep their arguments as they are, so a lazily built
//! list holds unevaluated components. `head` and `tail` hand back the
//! stored component for the evaluator to force, which forces only that
//! component.

use crate::context::Context;
use crate::function::{Arity, NativeError, NativeFunction, NativeReturn};
use crate::thunk::Thunk;
use crate::value::{Pair, Value};

use super::misc::predicate;

pub(super) fn install(ctx: &mut Context) {
    ctx.define_native(NativeFunction::deferred("pair", Arity::Exact(2), |_, args| {
        Ok(Value::pair(args[0].clone(), args[1].clone()).into())
    }));
    ctx.define_native(NativeFunction::deferred("list", Arity::AtLeast(0), |_, args| {
        let list = args.iter().rev().fold(Value::Null, |tail, head| {
            Value::pair(head.clone(), Thunk::ready(tail))
        });
        Ok(list.into())
    }));
    ctx.define_native(NativeFunction::forced("head", Arity::Exact(1), |_, args| {
        let pair = expect_pair("head", &args[0])?;
        Ok(NativeReturn::Force(pair.head().clone()))
    }));
    ctx.define_native(NativeFunction::forced("tail", Arity::Exact(1), |_, args| {
        let pair = expect_pair("tail", &args[0])?;
        Ok(NativeReturn::Force(pair.tail().clone()))
    }));

    predicate(ctx, "is_pair", |v| matches!(v, Value::Pair(_)));
    predicate(ctx, "is_null", |v| matches!(v, Value::Null));
}

fn expect_pair<'a>(name: &str, value: &'a Value) -> Result<&'a Pair, NativeError> {
    match value {
        Value::Pair(pair) => Ok(pair),
        other => Err(NativeError::Host(format!(
            "{name}(xs) expects a pair as argument xs, but encountered {other}"
        ))),
    }
}
