//! Programmatic tree construction.
//!
//! Hosts without a parser, and the test suites, build trees through
//! [`AstBuilder`]. Every node gets a distinct one-byte span in allocation
//! order so diagnostics can still point at a unique location.

use super::{
    BinaryOp, DeclKind, FunctionBody, Literal, LogicalOp, NodeArena, NodeId, NodeKind,
    SharedArena, UnaryOp,
};
use crate::{Name, SharedInterner, Span};

/// Builder over a fresh [`NodeArena`].
pub struct AstBuilder {
    arena: NodeArena,
    interner: SharedInterner,
    cursor: u32,
}

impl AstBuilder {
    pub fn new(interner: SharedInterner) -> Self {
        AstBuilder {
            arena: NodeArena::new(),
            interner,
            cursor: 0,
        }
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Intern an identifier.
    pub fn name(&self, text: &str) -> Name {
        self.interner.intern(text)
    }

    /// Span of a node built so far.
    pub fn span(&self, id: NodeId) -> Span {
        self.arena.span(id)
    }

    fn node(&mut self, kind: NodeKind) -> NodeId {
        let span = Span::new(self.cursor, self.cursor.saturating_add(1));
        self.cursor = self.cursor.saturating_add(1);
        self.arena.alloc(kind, span)
    }

    // Literals and names

    pub fn number(&mut self, value: f64) -> NodeId {
        self.node(NodeKind::Literal(Literal::Number(value)))
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.node(NodeKind::Literal(Literal::Bool(value)))
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        let name = self.name(value);
        self.node(NodeKind::Literal(Literal::Str(name)))
    }

    pub fn null(&mut self) -> NodeId {
        self.node(NodeKind::Literal(Literal::Null))
    }

    pub fn undefined(&mut self) -> NodeId {
        self.node(NodeKind::Literal(Literal::Undefined))
    }

    pub fn ident(&mut self, name: &str) -> NodeId {
        let name = self.name(name);
        self.node(NodeKind::Identifier(name))
    }

    // Operators

    pub fn unary(&mut self, op: UnaryOp, operand: NodeId) -> NodeId {
        self.node(NodeKind::Unary { op, operand })
    }

    pub fn binary(&mut self, op: BinaryOp, left: NodeId, right: NodeId) -> NodeId {
        self.node(NodeKind::Binary { op, left, right })
    }

    pub fn and(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.node(NodeKind::Logical {
            op: LogicalOp::And,
            left,
            right,
        })
    }

    pub fn or(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.node(NodeKind::Logical {
            op: LogicalOp::Or,
            left,
            right,
        })
    }

    pub fn conditional(&mut self, test: NodeId, consequent: NodeId, alternate: NodeId) -> NodeId {
        self.node(NodeKind::Conditional {
            test,
            consequent,
            alternate,
        })
    }

    // Functions and calls

    pub fn call(&mut self, callee: NodeId, args: &[NodeId]) -> NodeId {
        let args = self.arena.alloc_list(args);
        self.node(NodeKind::Call { callee, args })
    }

    /// Call a function by name: `name(args...)`.
    pub fn call_named(&mut self, callee: &str, args: &[NodeId]) -> NodeId {
        let callee = self.ident(callee);
        self.call(callee, args)
    }

    /// Expression-bodied arrow: `(params) => body`.
    pub fn arrow(&mut self, params: &[&str], body: NodeId) -> NodeId {
        let params = self.params(params);
        self.node(NodeKind::Function {
            name: None,
            params,
            body: FunctionBody::Expr(body),
        })
    }

    /// Function expression with a block body.
    pub fn function_expr(&mut self, name: Option<&str>, params: &[&str], body: &[NodeId]) -> NodeId {
        let name = name.map(|n| self.name(n));
        let params = self.params(params);
        let body = self.block(body);
        self.node(NodeKind::Function {
            name,
            params,
            body: FunctionBody::Block(body),
        })
    }

    pub fn assign(&mut self, name: &str, value: NodeId) -> NodeId {
        let name = self.name(name);
        self.node(NodeKind::Assignment { name, value })
    }

    fn params(&mut self, params: &[&str]) -> super::ParamRange {
        let names: Vec<Name> = params.iter().map(|p| self.name(p)).collect();
        self.arena.alloc_params(&names)
    }

    // Statements

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        self.node(NodeKind::ExpressionStatement { expr })
    }

    pub fn const_decl(&mut self, name: &str, init: NodeId) -> NodeId {
        self.declaration(DeclKind::Const, name, init)
    }

    pub fn let_decl(&mut self, name: &str, init: NodeId) -> NodeId {
        self.declaration(DeclKind::Let, name, init)
    }

    fn declaration(&mut self, kind: DeclKind, name: &str, init: NodeId) -> NodeId {
        let name = self.name(name);
        self.node(NodeKind::VariableDeclaration { kind, name, init })
    }

    pub fn function_decl(&mut self, name: &str, params: &[&str], body: &[NodeId]) -> NodeId {
        let name = self.name(name);
        let params = self.params(params);
        let body = self.block(body);
        self.node(NodeKind::FunctionDeclaration { name, params, body })
    }

    pub fn ret(&mut self, argument: NodeId) -> NodeId {
        self.node(NodeKind::Return {
            argument: Some(argument),
        })
    }

    pub fn ret_void(&mut self) -> NodeId {
        self.node(NodeKind::Return { argument: None })
    }

    pub fn if_stmt(&mut self, test: NodeId, consequent: &[NodeId], alternate: Option<&[NodeId]>) -> NodeId {
        let consequent = self.block(consequent);
        let alternate = alternate.map(|stmts| self.block(stmts));
        self.node(NodeKind::If {
            test,
            consequent,
            alternate,
        })
    }

    pub fn block(&mut self, body: &[NodeId]) -> NodeId {
        let body = self.arena.alloc_list(body);
        self.node(NodeKind::Block { body })
    }

    pub fn program(&mut self, body: &[NodeId]) -> NodeId {
        let body = self.arena.alloc_list(body);
        self.node(NodeKind::Program { body })
    }

    /// Finish building and share the arena.
    pub fn finish(self) -> SharedArena {
        SharedArena::new(self.arena)
    }
}
