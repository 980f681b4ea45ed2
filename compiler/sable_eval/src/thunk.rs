//! Memoize-once deferred values.
//!
//! A [`Thunk`] starts either already evaluated or pending with a producer
//! (an expression node plus the environment to evaluate it in). Forcing is
//! driven by the machine: [`Thunk::start`] hands out the producer and marks
//! the thunk as being forced, [`Thunk::complete`] stores the result. A
//! thunk is evaluated at most once; every later read returns the stored
//! value.

use std::fmt;
use std::rc::Rc;

use sable_ir::NodeId;

use crate::environment::{Env, LocalScope, Released};
use crate::value::{Pair, Value};

/// Expression and environment of a pending thunk.
#[derive(Clone)]
pub(crate) struct Producer {
    pub(crate) node: NodeId,
    pub(crate) env: Env,
}

enum ThunkState {
    Pending(Producer),
    /// Being forced; reading it again means the value depends on itself.
    Forcing,
    Evaluated(Value),
}

/// Outcome of starting to force a thunk.
pub(crate) enum ForceStart {
    /// Already evaluated.
    Ready(Value),
    /// Evaluate this producer, then call [`Thunk::complete`].
    Produce(Producer),
    /// The thunk is already being forced.
    Cycle,
}

/// A shared, memoize-once deferred value.
#[derive(Clone)]
pub struct Thunk(LocalScope<ThunkState>);

impl Thunk {
    /// A thunk that is already evaluated.
    pub fn ready(value: Value) -> Self {
        Thunk(LocalScope::new(ThunkState::Evaluated(value)))
    }

    /// A thunk that evaluates `node` in `env` when first forced.
    pub fn deferred(node: NodeId, env: Env) -> Self {
        Thunk(LocalScope::new(ThunkState::Pending(Producer { node, env })))
    }

    pub fn is_evaluated(&self) -> bool {
        matches!(*self.0.borrow(), ThunkState::Evaluated(_))
    }

    /// The stored value, if the thunk has been evaluated.
    pub fn value(&self) -> Option<Value> {
        match &*self.0.borrow() {
            ThunkState::Evaluated(value) => Some(value.clone()),
            ThunkState::Pending(_) | ThunkState::Forcing => None,
        }
    }

    /// Whether both handles share one memo cell.
    pub fn ptr_eq(&self, other: &Thunk) -> bool {
        self.0.ptr_eq(&other.0)
    }

    pub(crate) fn start(&self) -> ForceStart {
        let mut state = self.0.borrow_mut();
        match std::mem::replace(&mut *state, ThunkState::Forcing) {
            ThunkState::Pending(producer) => ForceStart::Produce(producer),
            ThunkState::Forcing => ForceStart::Cycle,
            ThunkState::Evaluated(value) => {
                *state = ThunkState::Evaluated(value.clone());
                ForceStart::Ready(value)
            }
        }
    }

    pub(crate) fn complete(&self, value: Value) {
        *self.0.borrow_mut() = ThunkState::Evaluated(value);
    }

    /// Return a thunk whose forcing failed to the pending state, so a later
    /// force retries instead of caching the failure.
    pub(crate) fn abandon(&self, producer: Producer) {
        let mut state = self.0.borrow_mut();
        if matches!(*state, ThunkState::Forcing) {
            *state = ThunkState::Pending(producer);
        }
    }
}

impl Thunk {
    /// When this is the last handle, move the producer environment or the
    /// stored value into `out`. The emptied cell is only ever dropped.
    pub(crate) fn release_into(&self, out: &mut Vec<Released>) {
        if !self.0.is_unique() {
            return;
        }
        let state = std::mem::replace(&mut *self.0.borrow_mut(), ThunkState::Forcing);
        match state {
            ThunkState::Pending(producer) => out.push(Released::Env(producer.env)),
            ThunkState::Evaluated(value) => out.push(Released::Value(value)),
            ThunkState::Forcing => {}
        }
    }

    /// Detach the pair this thunk holds when neither the thunk nor the pair
    /// is referenced anywhere else. Used to drop long lists iteratively.
    pub(crate) fn take_unique_pair(&self) -> Option<Rc<Pair>> {
        if !self.0.is_unique() {
            return None;
        }
        let mut state = self.0.borrow_mut();
        if !matches!(&*state, ThunkState::Evaluated(Value::Pair(pair)) if Rc::strong_count(pair) == 1) {
            return None;
        }
        match std::mem::replace(&mut *state, ThunkState::Evaluated(Value::Undefined)) {
            ThunkState::Evaluated(Value::Pair(pair)) => Some(pair),
            _ => None,
        }
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0.borrow() {
            ThunkState::Pending(producer) => write!(f, "Thunk(pending {:?})", producer.node),
            ThunkState::Forcing => f.write_str("Thunk(forcing)"),
            ThunkState::Evaluated(value) => write!(f, "Thunk({value})"),
        }
    }
}

#[cfg(test)]
mod tests;
