//! Callable values: user closures and native functions.

use smallvec::SmallVec;
use std::fmt;
use std::rc::Rc;

use sable_ir::{render_snippet, Chapter, FunctionBody, Name, NodeId, SharedArena, SharedInterner};

use crate::environment::Env;
use crate::errors::RuntimeError;
use crate::print_handler::PrintHandlerImpl;
use crate::thunk::Thunk;
use crate::value::Value;

/// A function value: parameters and body plus the environment it was
/// created in. Immutable after construction.
pub struct Closure {
    /// The `Function` or `FunctionDeclaration` node.
    pub(crate) node: NodeId,
    pub(crate) name: Option<Name>,
    pub(crate) params: SmallVec<[Name; 4]>,
    pub(crate) body: FunctionBody,
    pub(crate) env: Env,
    pub(crate) arena: SharedArena,
    pub(crate) interner: SharedInterner,
}

impl Closure {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn params(&self) -> &[Name] {
        &self.params
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Declared name, or `anonymous`.
    pub fn display_name(&self) -> &str {
        match self.name {
            Some(name) => self.interner.lookup(name),
            None => "anonymous",
        }
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_snippet(&self.arena, &self.interner, self.node))
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.display_name())
            .field("node", &self.node)
            .field("params", &self.params.len())
            .finish_non_exhaustive()
    }
}

/// Number of arguments a native function accepts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// Inclusive bounds.
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Between(low, high) => (low..=high).contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "{n} or more"),
            Arity::Between(low, high) if high == low + 1 => write!(f, "{low} or {high}"),
            Arity::Between(low, high) => write!(f, "{low} to {high}"),
        }
    }
}

/// What a native function hands back to the evaluator.
pub enum NativeReturn {
    Value(Value),
    /// Continue by forcing this thunk; its value is the call's result.
    /// `head` and `tail` use this so only the selected component is forced.
    Force(Thunk),
}

impl From<Value> for NativeReturn {
    fn from(value: Value) -> Self {
        NativeReturn::Value(value)
    }
}

/// Failure of a native function.
#[derive(Debug)]
pub enum NativeError {
    /// A plain host failure. Reported as an exception at the call site.
    Host(String),
    /// An already classified error, propagated unchanged.
    Runtime(RuntimeError),
}

impl From<RuntimeError> for NativeError {
    fn from(err: RuntimeError) -> Self {
        NativeError::Runtime(err)
    }
}

pub type NativeResult = Result<NativeReturn, NativeError>;

/// Services available to native functions during a call.
pub struct NativeCx<'a> {
    pub(crate) print: &'a PrintHandlerImpl,
    pub(crate) chapter: Chapter,
}

impl NativeCx<'_> {
    pub fn print_handler(&self) -> &PrintHandlerImpl {
        self.print
    }

    pub fn chapter(&self) -> Chapter {
        self.chapter
    }
}

type ForcedFn = dyn Fn(&NativeCx<'_>, &[Value]) -> NativeResult;
type DeferredFn = dyn Fn(&NativeCx<'_>, &[Thunk]) -> NativeResult;

/// How a native function receives its arguments.
pub(crate) enum NativeBody {
    /// Arguments are forced left to right before the call.
    Forced(Box<ForcedFn>),
    /// Arguments are passed as they are, possibly unevaluated.
    Deferred(Box<DeferredFn>),
}

/// A function implemented by the host.
pub struct NativeFunction {
    name: Rc<str>,
    arity: Arity,
    body: NativeBody,
}

impl NativeFunction {
    /// A native that receives forced argument values.
    pub fn forced(
        name: &str,
        arity: Arity,
        body: impl Fn(&NativeCx<'_>, &[Value]) -> NativeResult + 'static,
    ) -> Self {
        NativeFunction {
            name: Rc::from(name),
            arity,
            body: NativeBody::Forced(Box::new(body)),
        }
    }

    /// A native that receives its arguments unforced.
    pub fn deferred(
        name: &str,
        arity: Arity,
        body: impl Fn(&NativeCx<'_>, &[Thunk]) -> NativeResult + 'static,
    ) -> Self {
        NativeFunction {
            name: Rc::from(name),
            arity,
            body: NativeBody::Deferred(Box::new(body)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub(crate) fn body(&self) -> &NativeBody {
        &self.body
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
