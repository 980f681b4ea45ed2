//! Runtime errors raised by the evaluator.
//!
//! Every error carries a structured [`RuntimeErrorKind`] plus the node and
//! span it was raised at. Errors are built through the `#[cold]` factory
//! functions below so call sites stay terse.


use std::fmt;

use sable_ir::{Chapter, NodeId, Span};

use crate::diagnostics::Backtrace;
use crate::function::Arity;
use crate::value::Value;

/// Which operand of an operator failed its runtime type check.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandPosition {
    Left,
    Right,
    /// The single operand of a unary operator.
    Operand,
    /// The test of an `if` statement or conditional expression.
    Test,
}

/// Structured category of a runtime error.
#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeErrorKind {
    /// No frame on the chain defines the name.
    UndefinedVariable { name: String },
    /// The nearest defining frame still holds the hoisted placeholder.
    UnassignedVariable { name: String },
    /// The name is already declared in the current frame.
    VariableRedeclaration { name: String, writable: bool },
    ConstAssignment { name: String },
    InvalidNumberOfArguments {
        callee: String,
        expected: Arity,
        got: usize,
    },
    CallingNonFunctionValue { callee: String, call_site: String },
    TypeMismatch {
        operator: String,
        position: OperandPosition,
        expected: &'static str,
        got: String,
    },
    /// A native function failed with a host-level error. Displays as the
    /// message alone.
    Exception { callee: String, message: String },
    UnsupportedConstruct {
        construct: &'static str,
        chapter: Chapter,
        required: Chapter,
    },
    /// A deferred value was forced while it was already being forced.
    CyclicDeferredValue,
    /// The call-depth limit was hit. Fatal.
    StackOverflow { depth: usize },
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedVariable { name } => write!(f, "Name {name} not declared."),
            Self::UnassignedVariable { name } => write!(
                f,
                "Name {name} declared later in current scope but not yet assigned."
            ),
            Self::VariableRedeclaration { name, writable } => {
                write!(f, "Redeclaring name {name}.")?;
                if *writable {
                    write!(f, " Use assignment ({name} = ...) to change its value.")
                } else {
                    write!(f, " {name} is a constant and cannot be declared again.")
                }
            }
            Self::ConstAssignment { name } => {
                write!(f, "Cannot assign new value to constant {name}.")
            }
            Self::InvalidNumberOfArguments {
                callee,
                expected,
                got,
            } => write!(f, "{callee}: Expected {expected} arguments, but got {got}."),
            Self::CallingNonFunctionValue { callee, call_site } => {
                write!(f, "Calling non-function value {callee} in {call_site}.")
            }
            Self::TypeMismatch {
                operator,
                position,
                expected,
                got,
            } => match position {
                OperandPosition::Left | OperandPosition::Right => {
                    let side = if *position == OperandPosition::Left {
                        "left"
                    } else {
                        "right"
                    };
                    write!(
                        f,
                        "Expected {expected} on {side} hand side of operation {operator}, got {got}."
                    )
                }
                OperandPosition::Operand => {
                    write!(f, "Expected {expected} as operand of {operator}, got {got}.")
                }
                OperandPosition::Test => {
                    write!(f, "Expected {expected} as condition of {operator}, got {got}.")
                }
            },
            Self::Exception { message, .. } => f.write_str(message),
            Self::UnsupportedConstruct {
                construct,
                chapter,
                required,
            } => write!(
                f,
                "{construct} is not allowed in chapter {chapter} (needs chapter {required})."
            ),
            Self::CyclicDeferredValue => {
                write!(f, "Deferred value depends on its own result.")
            }
            Self::StackOverflow { depth } => {
                write!(f, "Maximum call stack size of {depth} exceeded.")
            }
        }
    }
}

/// A runtime error with its location.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    /// Human-readable message, equal to `kind.to_string()`.
    pub message: String,
    /// Node the error was raised at, when known.
    pub node: Option<NodeId>,
    pub span: Option<Span>,
    /// Call stack at the error site.
    pub backtrace: Option<Backtrace>,
}

impl RuntimeError {
    fn from_kind(kind: RuntimeErrorKind) -> Self {
        let message = kind.to_string();
        RuntimeError {
            kind,
            message,
            node: None,
            span: None,
            backtrace: None,
        }
    }

    /// Attach the node (and its span) the error was raised at.
    #[must_use]
    pub fn at(mut self, node: NodeId, span: Span) -> Self {
        self.node = Some(node);
        self.span = Some(span);
        self
    }

    #[must_use]
    pub fn with_backtrace(mut self, backtrace: Backtrace) -> Self {
        self.backtrace = Some(backtrace);
        self
    }

    /// Fatal errors end the run; no REPL-style continuation is offered.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, RuntimeErrorKind::StackOverflow { .. })
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Describe an offending value as `type value`, e.g. `string "a"`.
fn describe(value: &Value) -> String {
    match value {
        Value::Undefined | Value::Null => value.to_string(),
        Value::Closure(_) | Value::Native(_) => "function".to_owned(),
        _ => format!("{} {value}", value.type_name()),
    }
}

// Name resolution

#[cold]
pub fn undefined_variable(name: &str) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::UndefinedVariable {
        name: name.to_owned(),
    })
}

#[cold]
pub fn unassigned_variable(name: &str) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::UnassignedVariable {
        name: name.to_owned(),
    })
}

#[cold]
pub fn variable_redeclaration(name: &str, writable: bool) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::VariableRedeclaration {
        name: name.to_owned(),
        writable,
    })
}

#[cold]
pub fn const_assignment(name: &str) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::ConstAssignment {
        name: name.to_owned(),
    })
}

// Calls

#[cold]
pub fn invalid_number_of_arguments(callee: &str, expected: Arity, got: usize) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::InvalidNumberOfArguments {
        callee: callee.to_owned(),
        expected,
        got,
    })
}

/// `call_site` is the rendered call expression.
#[cold]
pub fn calling_non_function(callee: &Value, call_site: String) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::CallingNonFunctionValue {
        callee: callee.to_string(),
        call_site,
    })
}

/// Wrap a host failure raised by a native function.
#[cold]
pub fn exception(callee: &str, message: impl Into<String>) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::Exception {
        callee: callee.to_owned(),
        message: message.into(),
    })
}

#[cold]
pub fn stack_overflow(depth: usize) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::StackOverflow { depth })
}

// Runtime type checks

#[cold]
pub fn type_mismatch(
    operator: &str,
    position: OperandPosition,
    expected: &'static str,
    got: &Value,
) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::TypeMismatch {
        operator: operator.to_owned(),
        position,
        expected,
        got: describe(got),
    })
}

// Evaluation

#[cold]
pub fn unsupported_construct(construct: &'static str, chapter: Chapter, required: Chapter) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::UnsupportedConstruct {
        construct,
        chapter,
        required,
    })
}

#[cold]
pub fn cyclic_deferred_value() -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::CyclicDeferredValue)
}
