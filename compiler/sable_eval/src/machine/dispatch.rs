//! Per-node-kind evaluation rules.

use smallvec::SmallVec;
use std::rc::Rc;

use sable_ir::{
    BinaryOp, DeclKind, FunctionBody, Literal, LogicalOp, Name, NodeId, NodeKind, NodeRange,
    ParamRange, SharedArena, UnaryOp,
};

use super::{Control, Declaration, Kont, Machine, Outcome};
use crate::environment::{AssignError, Bound, LookupError, Mutability};
use crate::errors::{
    const_assignment, unassigned_variable, undefined_variable, unsupported_construct,
};
use crate::function::Closure;
use crate::operators::{check_condition, check_logical, evaluate_binary, evaluate_unary};
use crate::strategy::Strategy;
use crate::value::Value;

impl<S: Strategy> Machine<S> {
    pub(crate) fn arena(&self) -> &SharedArena {
        &self.arena
    }

    #[inline]
    pub(crate) fn push_frame(&mut self, frame: Kont) {
        self.kont.push(frame);
    }

    /// Evaluate `node`: check it is legal in the active chapter, mark it as
    /// being visited, and run its rule.
    pub(super) fn eval(&mut self, node: NodeId, tail: bool) {
        let kind = *self.arena.kind(node);
        let required = kind.min_chapter();
        if required > self.ctx.chapter() {
            let err = unsupported_construct(kind.describe(), self.ctx.chapter(), required);
            self.fail(err, Some(node));
            return;
        }
        if let Some(counters) = self.ctx.counters.as_mut() {
            counters.count_node();
        }
        tracing::trace!(node = node.raw(), kind = kind.describe(), tail, "eval");
        self.ctx.nodes.push(node);
        self.kont.push(Kont::Leave);

        match kind {
            NodeKind::Program { body } => self.enter_program(node, body),
            NodeKind::Block { body } => self.enter_block(body),
            NodeKind::ExpressionStatement { expr } => self.eval_next(expr, false),
            NodeKind::VariableDeclaration { kind, name, init } => {
                let mutability = match kind {
                    DeclKind::Const => Mutability::Immutable,
                    DeclKind::Let => Mutability::Mutable,
                };
                S::bind_declaration(
                    self,
                    Declaration {
                        node,
                        name,
                        init,
                        mutability,
                    },
                );
            }
            NodeKind::FunctionDeclaration { name, params, body } => {
                let closure = self.closure(node, Some(name), params, FunctionBody::Block(body));
                let decl = Declaration {
                    node,
                    name,
                    init: node,
                    mutability: Mutability::Immutable,
                };
                self.declare_bound(decl, Bound::Value(closure));
            }
            NodeKind::Return { argument } => match argument {
                Some(argument) => {
                    self.kont.push(Kont::WrapReturn);
                    self.eval_next(argument, true);
                }
                None => self.control = Control::Deliver(Outcome::Return(Value::Undefined)),
            },
            NodeKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.kont.push(Kont::Branch {
                    node,
                    construct: "if statement",
                    consequent,
                    alternate,
                    tail: false,
                });
                self.eval_next(test, false);
            }
            NodeKind::Literal(literal) => {
                let value = self.literal(literal);
                self.deliver_value(value);
            }
            NodeKind::Identifier(name) => self.identifier(node, name),
            NodeKind::Function { name, params, body } => {
                let closure = self.closure(node, name, params, body);
                self.deliver_value(closure);
            }
            NodeKind::Call { callee, args } => {
                self.kont.push(Kont::Callee {
                    site: node,
                    args,
                    tail,
                });
                self.eval_next(callee, false);
            }
            NodeKind::Unary { op, operand } => {
                self.kont.push(Kont::Unary { node, op });
                self.eval_next(operand, false);
            }
            NodeKind::Binary { op, left, right } => {
                self.kont.push(Kont::BinaryLeft { node, op, right });
                self.eval_next(left, false);
            }
            NodeKind::Logical { op, left, right } => {
                self.kont.push(Kont::Logical {
                    node,
                    op,
                    right,
                    tail,
                });
                self.eval_next(left, false);
            }
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.kont.push(Kont::Branch {
                    node,
                    construct: "conditional expression",
                    consequent,
                    alternate: Some(alternate),
                    tail,
                });
                self.eval_next(test, false);
            }
            NodeKind::Assignment { name, value } => {
                // Assignment is eager under both strategies.
                self.kont.push(Kont::Assign { node, name });
                self.eval_next(value, false);
            }
        }
    }

    pub(crate) fn literal(&self, literal: Literal) -> Value {
        match literal {
            Literal::Number(n) => Value::Number(n),
            Literal::Bool(b) => Value::Bool(b),
            Literal::Str(s) => Value::string(self.ctx.interner().lookup(s)),
            Literal::Null => Value::Null,
            Literal::Undefined => Value::Undefined,
        }
    }

    fn identifier(&mut self, node: NodeId, name: Name) {
        match self.ctx.environments.current().lookup(name) {
            Ok(Bound::Value(value)) => self.deliver_value(value),
            Ok(Bound::Deferred(thunk)) => self.control = Control::Force(thunk),
            Err(LookupError::Undefined) => {
                let err = undefined_variable(self.ctx.interner().lookup(name));
                self.fail(err, Some(node));
            }
            Err(LookupError::Unassigned) => {
                let err = unassigned_variable(self.ctx.interner().lookup(name));
                self.fail(err, Some(node));
            }
        }
    }

    /// Build a closure over the current frame. The body is not evaluated.
    fn closure(
        &self,
        node: NodeId,
        name: Option<Name>,
        params: ParamRange,
        body: FunctionBody,
    ) -> Value {
        let params: SmallVec<[Name; 4]> = self.arena.params(params).iter().copied().collect();
        Value::Closure(Rc::new(Closure {
            node,
            name,
            params,
            body,
            env: self.ctx.environments.current().clone(),
            arena: self.arena.clone(),
            interner: self.ctx.interner().clone(),
        }))
    }

    /// A program gets a frame that outlives the run, so later programs in
    /// the same context see its declarations.
    fn enter_program(&mut self, node: NodeId, body: NodeRange) {
        let parent = self.ctx.environments.current().clone();
        let env = self.ctx.environments.create("programEnvironment", &parent);
        self.ctx.environments.push(env);
        self.ctx.outer_environments = self.ctx.environments.depth();
        tracing::debug!(
            program = node.raw(),
            strategy = %S::KIND,
            outer = self.ctx.outer_environments,
            "program start"
        );
        self.run_sequence(body);
    }

    fn enter_block(&mut self, body: NodeRange) {
        let parent = self.ctx.environments.current().clone();
        let env = self.ctx.environments.create("blockEnvironment", &parent);
        self.ctx.environments.push(env);
        self.kont.push(Kont::PopEnvironment);
        self.run_sequence(body);
    }

    /// Hoist the declarations of `body` into the current frame, then run
    /// its statements in order.
    pub(super) fn run_sequence(&mut self, body: NodeRange) {
        if let Err((err, node)) = self.hoist(body) {
            self.fail(err, Some(node));
            return;
        }
        self.continue_sequence(body, 0, Value::Undefined);
    }

    /// Statement `next` of `body` is due; `last` is the value of the one
    /// before it.
    pub(super) fn continue_sequence(&mut self, body: NodeRange, next: usize, last: Value) {
        let Some(&statement) = self.arena.list(body).get(next) else {
            self.deliver_value(last);
            return;
        };
        if next + 1 < body.len() {
            self.kont.push(Kont::Sequence {
                body,
                next: next + 1,
            });
        }
        self.eval_next(statement, false);
    }

    pub(super) fn assign_value(&mut self, node: NodeId, name: Name, value: Value) {
        match self.ctx.environments.current().assign(name, value.clone()) {
            Ok(()) => self.deliver_value(value),
            Err(err) => {
                let text = self.ctx.interner().lookup(name);
                let err = match err {
                    AssignError::Immutable => const_assignment(text),
                    AssignError::Undefined => undefined_variable(text),
                    AssignError::Unassigned => unassigned_variable(text),
                };
                self.fail(err, Some(node));
            }
        }
    }

    pub(super) fn branch(
        &mut self,
        node: NodeId,
        construct: &'static str,
        consequent: NodeId,
        alternate: Option<NodeId>,
        tail: bool,
        test: &Value,
    ) {
        match check_condition(construct, test) {
            Ok(true) => self.eval_next(consequent, tail),
            Ok(false) => match alternate {
                Some(alternate) => self.eval_next(alternate, tail),
                None => self.deliver_value(Value::Undefined),
            },
            Err(err) => self.fail(err, Some(node)),
        }
    }

    /// The left operand of `&&`/`||` decides whether the right one is
    /// evaluated at all.
    pub(super) fn logical(
        &mut self,
        node: NodeId,
        op: LogicalOp,
        right: NodeId,
        tail: bool,
        left: &Value,
    ) {
        match (op, check_logical(op, left)) {
            (LogicalOp::And, Ok(true)) | (LogicalOp::Or, Ok(false)) => {
                self.eval_next(right, tail);
            }
            (LogicalOp::And, Ok(false)) => self.deliver_value(Value::Bool(false)),
            (LogicalOp::Or, Ok(true)) => self.deliver_value(Value::Bool(true)),
            (_, Err(err)) => self.fail(err, Some(node)),
        }
    }

    pub(super) fn unary(&mut self, node: NodeId, op: UnaryOp, operand: &Value) {
        match evaluate_unary(op, operand) {
            Ok(value) => self.deliver_value(value),
            Err(err) => self.fail(err, Some(node)),
        }
    }

    pub(super) fn binary(&mut self, node: NodeId, op: BinaryOp, left: &Value, right: &Value) {
        match evaluate_binary(op, left, right) {
            Ok(value) => self.deliver_value(value),
            Err(err) => self.fail(err, Some(node)),
        }
    }
}
