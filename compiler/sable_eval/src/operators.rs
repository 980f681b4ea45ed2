//! Runtime type checks and operator evaluation.
//!
//! The language only allows numbers and strings where the operator
//! permits them and only booleans as conditions. Every check runs before
//! the operator is computed; a failure names the operator and the
//! offending value.

use sable_ir::{BinaryOp, LogicalOp, UnaryOp};

use crate::errors::{type_mismatch, OperandPosition, RuntimeError};
use crate::value::Value;

/// Check the operand of a unary operator.
pub fn check_unary(op: UnaryOp, operand: &Value) -> Result<(), RuntimeError> {
    let ok = match op {
        UnaryOp::Not => matches!(operand, Value::Bool(_)),
        UnaryOp::Neg => matches!(operand, Value::Number(_)),
    };
    if ok {
        Ok(())
    } else {
        let expected = match op {
            UnaryOp::Not => "boolean",
            UnaryOp::Neg => "number",
        };
        Err(type_mismatch(op.as_symbol(), OperandPosition::Operand, expected, operand))
    }
}

/// Check both operands of a binary operator.
pub fn check_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<(), RuntimeError> {
    let symbol = op.as_symbol();
    match op {
        BinaryOp::StrictEq | BinaryOp::StrictNotEq => Ok(()),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            if !matches!(left, Value::Number(_)) {
                return Err(type_mismatch(symbol, OperandPosition::Left, "number", left));
            }
            if !matches!(right, Value::Number(_)) {
                return Err(type_mismatch(symbol, OperandPosition::Right, "number", right));
            }
            Ok(())
        }
        // `+` and the comparisons take two numbers or two strings.
        BinaryOp::Add | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            match (left, right) {
                (Value::Number(_), Value::Number(_)) | (Value::Str(_), Value::Str(_)) => Ok(()),
                (Value::Number(_), _) => {
                    Err(type_mismatch(symbol, OperandPosition::Right, "number", right))
                }
                (Value::Str(_), _) => {
                    Err(type_mismatch(symbol, OperandPosition::Right, "string", right))
                }
                _ => Err(type_mismatch(
                    symbol,
                    OperandPosition::Left,
                    "string or number",
                    left,
                )),
            }
        }
    }
}

/// Check the test of a conditional; `construct` names it in the error.
pub fn check_condition(construct: &str, test: &Value) -> Result<bool, RuntimeError> {
    match test {
        Value::Bool(b) => Ok(*b),
        _ => Err(type_mismatch(construct, OperandPosition::Test, "boolean", test)),
    }
}

/// Check the left operand of `&&` or `||`. The right operand is the result
/// and is not checked.
pub fn check_logical(op: LogicalOp, left: &Value) -> Result<bool, RuntimeError> {
    match left {
        Value::Bool(b) => Ok(*b),
        _ => Err(type_mismatch(op.as_symbol(), OperandPosition::Left, "boolean", left)),
    }
}

pub fn evaluate_unary(op: UnaryOp, operand: &Value) -> Result<Value, RuntimeError> {
    check_unary(op, operand)?;
    Ok(match (op, operand) {
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        (UnaryOp::Neg, Value::Number(n)) => Value::Number(-n),
        // unreachable after the check
        _ => Value::Undefined,
    })
}

pub fn evaluate_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    check_binary(op, left, right)?;
    let value = match op {
        BinaryOp::StrictEq => Value::Bool(left == right),
        BinaryOp::StrictNotEq => Value::Bool(left != right),
        _ => match (left, right) {
            (Value::Number(a), Value::Number(b)) => arithmetic(op, *a, *b),
            (Value::Str(a), Value::Str(b)) => match op {
                BinaryOp::Add => {
                    let mut joined = String::with_capacity(a.len() + b.len());
                    joined.push_str(a);
                    joined.push_str(b);
                    Value::string(&joined)
                }
                BinaryOp::Lt => Value::Bool(a < b),
                BinaryOp::LtEq => Value::Bool(a <= b),
                BinaryOp::Gt => Value::Bool(a > b),
                BinaryOp::GtEq => Value::Bool(a >= b),
                _ => Value::Undefined,
            },
            _ => Value::Undefined,
        },
    };
    Ok(value)
}

#[inline]
fn arithmetic(op: BinaryOp, a: f64, b: f64) -> Value {
    match op {
        BinaryOp::Add => Value::Number(a + b),
        BinaryOp::Sub => Value::Number(a - b),
        BinaryOp::Mul => Value::Number(a * b),
        BinaryOp::Div => Value::Number(a / b),
        // f64 `%` truncates like the language's remainder.
        BinaryOp::Mod => Value::Number(a % b),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::LtEq => Value::Bool(a <= b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::GtEq => Value::Bool(a >= b),
        BinaryOp::StrictEq | BinaryOp::StrictNotEq => Value::Undefined,
    }
}
