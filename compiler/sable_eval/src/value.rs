//! Runtime values.
//!
//! Pairs hold their components as [`Thunk`]s, so a lazily built list stores
//! unevaluated tails until something forces them. Equality follows the
//! language's `===`: numbers by IEEE value, strings by content, functions
//! and pairs by identity.

use rustc_hash::FxHashSet;
use std::fmt;
use std::rc::Rc;

use sable_ir::format_number;
use sable_stack::ensure_sufficient_stack;

use crate::environment::Released;
use crate::function::{Closure, NativeFunction};
use crate::thunk::Thunk;

/// Printed in place of a component that has not been forced.
const DEFERRED: &str = "<deferred>";
/// Printed where a pair contains one of its own ancestors.
const CIRCULAR: &str = "...<circular>";

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Closure(Rc<Closure>),
    Native(Rc<NativeFunction>),
    Pair(Rc<Pair>),
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn pair(head: Thunk, tail: Thunk) -> Self {
        Value::Pair(Rc::new(Pair { head, tail }))
    }

    /// Type name used in runtime type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Closure(_) | Value::Native(_) => "function",
            Value::Pair(_) => "pair",
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::Native(_))
    }

    /// When this holds the last handle to a closure or pair, move what that
    /// closure or pair owns into `out`.
    pub(crate) fn release_into(self, out: &mut Vec<Released>) {
        match self {
            Value::Closure(closure) => {
                if let Ok(closure) = Rc::try_unwrap(closure) {
                    out.push(Released::Env(closure.env));
                }
            }
            Value::Pair(pair) => {
                if let Ok(pair) = Rc::try_unwrap(pair) {
                    pair.head.release_into(out);
                    pair.tail.release_into(out);
                }
            }
            _ => {}
        }
    }
}

impl PartialEq for Value {
    #[expect(clippy::float_cmp, reason = "=== compares numbers exactly")]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Pair(a), Value::Pair(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer {
            f,
            ancestors: FxHashSet::default(),
        }
        .value(self)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A pair of deferred components.
pub struct Pair {
    head: Thunk,
    tail: Thunk,
}

impl Pair {
    pub fn head(&self) -> &Thunk {
        &self.head
    }

    pub fn tail(&self) -> &Thunk {
        &self.tail
    }
}

impl Drop for Pair {
    // Long lists would otherwise be dropped one recursive call per element.
    fn drop(&mut self) {
        let mut next = self.tail.take_unique_pair();
        while let Some(pair) = next {
            next = pair.tail.take_unique_pair();
        }
    }
}

impl fmt::Debug for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pair")
            .field("head_evaluated", &self.head.is_evaluated())
            .field("tail_evaluated", &self.tail.is_evaluated())
            .finish()
    }
}

/// Writes values, following list tails in a loop and recursing into heads.
struct Printer<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
    /// Pairs on the path from the root to the component being printed.
    ancestors: FxHashSet<*const Pair>,
}

impl Printer<'_, '_> {
    fn value(&mut self, value: &Value) -> fmt::Result {
        match value {
            Value::Undefined => self.f.write_str("undefined"),
            Value::Null => self.f.write_str("null"),
            Value::Bool(b) => write!(self.f, "{b}"),
            Value::Number(n) => self.f.write_str(&format_number(*n)),
            Value::Str(s) => write!(self.f, "{:?}", &**s),
            Value::Closure(closure) => write!(self.f, "{closure}"),
            Value::Native(native) => write!(self.f, "function {}() {{ [native code] }}", native.name()),
            Value::Pair(pair) => {
                let mut opened = Vec::new();
                let result = self.pairs(pair, &mut opened);
                for ptr in &opened {
                    self.ancestors.remove(ptr);
                }
                result?;
                for _ in &opened {
                    self.f.write_str("]")?;
                }
                Ok(())
            }
        }
    }

    /// Print `[head, ` for each pair along the tail chain, then the final
    /// tail. Closing brackets are left to the caller.
    fn pairs(&mut self, first: &Rc<Pair>, opened: &mut Vec<*const Pair>) -> fmt::Result {
        let mut current = Rc::clone(first);
        loop {
            let ptr = Rc::as_ptr(&current);
            if !self.ancestors.insert(ptr) {
                return self.f.write_str(CIRCULAR);
            }
            opened.push(ptr);
            self.f.write_str("[")?;
            self.component(&current.head)?;
            self.f.write_str(", ")?;
            match current.tail.value() {
                Some(Value::Pair(next)) => current = next,
                Some(last) => return self.value(&last),
                None => return self.f.write_str(DEFERRED),
            }
        }
    }

    fn component(&mut self, thunk: &Thunk) -> fmt::Result {
        match thunk.value() {
            Some(value) => ensure_sufficient_stack(|| self.value(&value)),
            None => self.f.write_str(DEFERRED),
        }
    }
}
