//! Forcing deferred values, and deep-forcing the result of a run.

use std::rc::Rc;

use sable_ir::{NodeId, NodeKind};

use super::{Control, Kont, Machine, Unravel};
use crate::environment::{Bound, Mutability};
use crate::errors::cyclic_deferred_value;
use crate::strategy::Strategy;
use crate::thunk::{ForceStart, Thunk};
use crate::value::Value;

impl<S: Strategy> Machine<S> {
    /// Force `thunk`. A pending thunk evaluates its expression in its own
    /// frame under a `Memoize` frame; a thunk whose expression is itself a
    /// deferred name forces that one in turn, so chains resolve in the
    /// continuation rather than on the native stack.
    pub(super) fn force(&mut self, thunk: Thunk) {
        match thunk.start() {
            ForceStart::Ready(value) => self.deliver_value(value),
            ForceStart::Cycle => self.fail(cyclic_deferred_value(), None),
            ForceStart::Produce(producer) => {
                if let Some(counters) = self.ctx.counters.as_mut() {
                    counters.count_thunk_forced();
                }
                tracing::trace!(node = producer.node.raw(), "force thunk");
                let node = producer.node;
                let depth = self.ctx.environments.depth();
                self.ctx.environments.push(producer.env.clone());
                self.kont.push(Kont::Memoize {
                    thunk,
                    producer,
                    depth,
                });
                self.eval_next(node, false);
            }
        }
    }

    /// Wrap `node` as a deferred value over the current frame.
    ///
    /// Literals need no deferral, and a name bound to a constant can hand
    /// out its existing binding so the memo is shared.
    pub(crate) fn defer(&self, node: NodeId) -> Thunk {
        let kind = *self.arena.kind(node);
        let env = self.ctx.environments.current();
        if kind.min_chapter() <= self.ctx.chapter() {
            match kind {
                NodeKind::Literal(literal) => return Thunk::ready(self.literal(literal)),
                NodeKind::Identifier(name) => match env.resolve(name) {
                    Ok((Bound::Deferred(thunk), Mutability::Immutable)) => return thunk,
                    Ok((Bound::Value(value), Mutability::Immutable)) => {
                        return Thunk::ready(value);
                    }
                    _ => {}
                },
                _ => {}
            }
        }
        Thunk::deferred(node, env.clone())
    }

    /// Force every pair component reachable from the run's value.
    pub(super) fn unravel(&mut self, mut unravel: Unravel, value: Value) {
        unravel.root.get_or_insert_with(|| value.clone());
        unravel.scan(&value);
        while let Some(thunk) = unravel.pending.pop() {
            if let Some(value) = thunk.value() {
                unravel.scan(&value);
                continue;
            }
            self.kont.push(Kont::Unravel(unravel));
            self.control = Control::Force(thunk);
            return;
        }
        let root = unravel.root.unwrap_or(Value::Undefined);
        self.deliver_value(root);
    }
}

impl Unravel {
    /// Queue the components of `value` if it is a pair not seen before.
    fn scan(&mut self, value: &Value) {
        if let Value::Pair(pair) = value {
            if self.seen.insert(Rc::as_ptr(pair)) {
                self.pending.push(pair.tail().clone());
                self.pending.push(pair.head().clone());
            }
        }
    }
}
