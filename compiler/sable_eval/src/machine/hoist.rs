//! Hoisting and declarations.
//!
//! Before a program, block or function body runs, every name it declares
//! directly (not in nested blocks) is added to its frame as an unassigned
//! placeholder. Reading such a name before its declaration has run is an
//! error, and so is declaring a name twice in one frame.

use sable_ir::{DeclKind, NodeId, NodeKind, NodeRange};

use super::{Declaration, Machine};
use crate::environment::{Bound, Mutability};
use crate::errors::{variable_redeclaration, RuntimeError};
use crate::strategy::Strategy;
use crate::value::Value;

impl<S: Strategy> Machine<S> {
    /// Add placeholders for the declarations among `body`'s statements.
    pub(super) fn hoist(&mut self, body: NodeRange) -> Result<(), (RuntimeError, NodeId)> {
        let env = self.ctx.environments.current().clone();
        let mut scope = env.borrow_mut();
        for &statement in self.arena.list(body) {
            let mutability = match self.arena.kind(statement) {
                NodeKind::VariableDeclaration {
                    kind: DeclKind::Let,
                    ..
                } => Mutability::Mutable,
                NodeKind::VariableDeclaration { .. } | NodeKind::FunctionDeclaration { .. } => {
                    Mutability::Immutable
                }
                _ => continue,
            };
            let Some(name) = self.arena.kind(statement).declared_name() else {
                continue;
            };
            if let Err(existing) = scope.hoist(name, mutability) {
                let text = self.ctx.interner().lookup(name);
                let err = variable_redeclaration(text, existing.mutability.is_mutable());
                return Err((err, statement));
            }
        }
        Ok(())
    }

    /// Bind a declared name in the current frame and finish the
    /// declaration statement.
    pub(crate) fn declare_bound(&mut self, decl: Declaration, bound: Bound) {
        let result = self
            .ctx
            .environments
            .current()
            .borrow_mut()
            .declare(decl.name, bound, decl.mutability);
        match result {
            Ok(()) => self.deliver_value(Value::Undefined),
            Err(existing) => {
                let text = self.ctx.interner().lookup(decl.name);
                let err = variable_redeclaration(text, existing.mutability.is_mutable());
                self.fail(err, Some(decl.node));
            }
        }
    }

    pub(super) fn declare_value(&mut self, decl: Declaration, value: Value) {
        self.declare_bound(decl, Bound::Value(value));
    }
}
