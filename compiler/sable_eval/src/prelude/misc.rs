//! Constants, output, errors and type predicates.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::context::Context;
use crate::function::{Arity, NativeError, NativeFunction, NativeResult};
use crate::value::Value;

pub(super) fn install(ctx: &mut Context) {
    ctx.define_symbol("undefined", Value::Undefined);
    ctx.define_symbol("NaN", Value::Number(f64::NAN));
    ctx.define_symbol("Infinity", Value::Number(f64::INFINITY));

    ctx.define_native(NativeFunction::forced("display", Arity::Between(1, 2), |cx, args| {
        let line = match args.get(1) {
            Some(label) => format!("{} {}", raw_text(label), args[0]),
            None => args[0].to_string(),
        };
        cx.print_handler().println(&line);
        Ok(args[0].clone().into())
    }));
    ctx.define_native(NativeFunction::forced("error", Arity::Between(1, 2), |_, args| {
        let message = match args.get(1) {
            Some(label) => format!("{} {}", raw_text(label), args[0]),
            None => args[0].to_string(),
        };
        Err(NativeError::Host(message))
    }));

    predicate(ctx, "is_number", |v| matches!(v, Value::Number(_)));
    predicate(ctx, "is_string", |v| matches!(v, Value::Str(_)));
    predicate(ctx, "is_boolean", |v| matches!(v, Value::Bool(_)));
    predicate(ctx, "is_function", Value::is_callable);
    predicate(ctx, "is_undefined", |v| matches!(v, Value::Undefined));

    ctx.define_native(NativeFunction::forced("parse_int", Arity::Exact(2), parse_int_native));
    ctx.define_native(NativeFunction::forced("runtime", Arity::Exact(0), |_, _| {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |elapsed| (elapsed.as_secs_f64() * 1000.0).floor());
        Ok(Value::Number(millis).into())
    }));
}

/// Install a one-argument predicate.
pub(super) fn predicate(ctx: &mut Context, name: &str, test: fn(&Value) -> bool) {
    ctx.define_native(NativeFunction::forced(name, Arity::Exact(1), move |_, args| {
        Ok(Value::Bool(test(&args[0])).into())
    }));
}

/// Strings without quotes; everything else as displayed.
fn raw_text(value: &Value) -> String {
    match value {
        Value::Str(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn parse_int_native(_: &crate::function::NativeCx<'_>, args: &[Value]) -> NativeResult {
    let (Value::Str(text), Value::Number(radix)) = (&args[0], &args[1]) else {
        return Err(parse_int_usage());
    };
    if radix.fract() != 0.0 || !(2.0..=36.0).contains(radix) {
        return Err(parse_int_usage());
    }
    // Checked above: an integer in 2..=36.
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "radix is an integer in 2..=36"
    )]
    let radix = *radix as u32;
    Ok(Value::Number(parse_int(text, radix)).into())
}

#[cold]
fn parse_int_usage() -> NativeError {
    NativeError::Host(
        "parse_int expects two arguments a string s, and a positive integer i between 2 and 36, inclusive."
            .to_owned(),
    )
}

/// Parse the longest prefix of digits in `radix` after optional
/// whitespace and sign. `NaN` when there are no digits.
pub(super) fn parse_int(text: &str, radix: u32) -> f64 {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let rest = if radix == 16 {
        rest.strip_prefix("0x")
            .or_else(|| rest.strip_prefix("0X"))
            .unwrap_or(rest)
    } else {
        rest
    };
    let mut value = 0.0_f64;
    let mut any = false;
    for digit in rest.chars().map_while(|c| c.to_digit(radix)) {
        value = value * f64::from(radix) + f64::from(digit);
        any = true;
    }
    match (any, negative) {
        (false, _) => f64::NAN,
        (true, true) => -value,
        (true, false) => value,
    }
}
