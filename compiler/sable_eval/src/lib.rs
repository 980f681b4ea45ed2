//! Sable Eval - the execution core of the Sable teaching language.
//!
//! A tree-walking evaluator over the flat tree from `sable_ir`, available in
//! two evaluation strategies (strict and lazy) that share one node-kind
//! contract and differ only in when deferred values are forced.
//!
//! # Architecture
//!
//! - [`Environment`](environment::Scope): frames chained through parents, with
//!   hoisted placeholders and const/mutable bindings
//! - [`Thunk`]: memoize-once deferred values
//! - [`Closure`] / [`NativeFunction`]: the callable values
//! - `machine`: an explicit continuation machine. Evaluation never recurses
//!   on the native stack; return and tail calls travel as ordinary outcomes
//!   through the continuation, and `apply` replaces the call environment in
//!   place on tail calls
//! - [`Evaluator`]: the resumable handle hosts drive, one suspension step at
//!   a time, optionally through a [`Runner`] with a step limit
//!
//! Runtime failures are [`RuntimeError`]s, recorded on the [`Context`] and
//! returned to the host.

mod context;
mod diagnostics;
mod driver;
pub mod environment;
pub mod errors;
mod function;
mod machine;
pub mod operators;
mod prelude;
mod print_handler;
mod strategy;
mod thunk;
mod value;

#[cfg(test)]
mod tests;

pub use context::{Context, ContextBuilder, DEFAULT_MAX_CALL_DEPTH};
pub use diagnostics::{Backtrace, BacktraceFrame, CallFrame, CallStack, EvalCounters};
pub use driver::{
    run_program, Breakpoints, Evaluator, Resumption, RunOutcome, Runner, SuspendReason, Visit,
    VisitHook,
};
pub use environment::{Bound, Env, Mutability};
pub use errors::{OperandPosition, RuntimeError, RuntimeErrorKind};
pub use function::{
    Arity, Closure, NativeCx, NativeError, NativeFunction, NativeResult, NativeReturn,
};
pub use prelude::install_prelude;
pub use print_handler::{
    buffer_handler, silent_handler, stdout_handler, BufferPrintHandler, PrintHandlerImpl,
    SharedPrintHandler, StdoutPrintHandler,
};
pub use strategy::StrategyKind;
pub use thunk::Thunk;
pub use value::{Pair, Value};
