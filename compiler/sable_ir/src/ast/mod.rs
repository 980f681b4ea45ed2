//! Flat syntax tree.
//!
//! Nodes are stored in a [`NodeArena`] and addressed by [`NodeId`]; child
//! lists (statements, arguments, parameters) are stored in side tables and
//! addressed by compact ranges. [`NodeKind`] is a closed sum type so every
//! consumer matches exhaustively over the node kinds.

mod arena;
mod builder;
mod operators;
mod render;


use std::fmt;

use crate::{Chapter, Name};

pub use arena::{NodeArena, SharedArena};
pub use builder::AstBuilder;
pub use operators::{BinaryOp, LogicalOp, UnaryOp};
pub use render::{format_number, render_snippet};

/// Index into the node arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        NodeId(index)
    }

    /// Get the index into the arena.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Defines compact `{ start, len }` ranges into an arena side table.
macro_rules! define_range {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => { $(
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
        #[repr(C)]
        pub struct $name {
            pub start: u32,
            pub len: u16,
        }

        impl $name {
            pub const EMPTY: Self = Self { start: 0, len: 0 };

            #[inline]
            pub const fn new(start: u32, len: u16) -> Self {
                Self { start, len }
            }

            #[inline]
            pub const fn is_empty(&self) -> bool {
                self.len == 0
            }

            #[inline]
            pub const fn len(&self) -> usize {
                self.len as usize
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({}..{})", stringify!($name), self.start, self.start + u32::from(self.len))
            }
        }
    )* };
}

define_range!(
    /// Statements of a program or block, or the arguments of a call.
    NodeRange,
    /// Parameter names of a function.
    ParamRange,
);

/// Literal constants.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Literal {
    Number(f64),
    Bool(bool),
    /// Interned string contents.
    Str(Name),
    Null,
    Undefined,
}

/// Declaration keyword of a variable declaration.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DeclKind {
    Const,
    Let,
}

impl DeclKind {
    pub const fn as_keyword(self) -> &'static str {
        match self {
            DeclKind::Const => "const",
            DeclKind::Let => "let",
        }
    }
}

/// Body of a function or arrow expression.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FunctionBody {
    /// A `Block` node; the result comes from `return`.
    Block(NodeId),
    /// An expression-bodied arrow; the expression is the result.
    Expr(NodeId),
}

/// Every node kind the evaluator understands.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum NodeKind {
    // Statements
    Program {
        body: NodeRange,
    },
    Block {
        body: NodeRange,
    },
    ExpressionStatement {
        expr: NodeId,
    },
    VariableDeclaration {
        kind: DeclKind,
        name: Name,
        init: NodeId,
    },
    FunctionDeclaration {
        name: Name,
        params: ParamRange,
        /// A `Block` node.
        body: NodeId,
    },
    Return {
        argument: Option<NodeId>,
    },
    If {
        test: NodeId,
        consequent: NodeId,
        alternate: Option<NodeId>,
    },

    // Expressions
    Literal(Literal),
    Identifier(Name),
    /// Function and arrow expressions.
    Function {
        name: Option<Name>,
        params: ParamRange,
        body: FunctionBody,
    },
    Call {
        callee: NodeId,
        args: NodeRange,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Logical {
        op: LogicalOp,
        left: NodeId,
        right: NodeId,
    },
    Conditional {
        test: NodeId,
        consequent: NodeId,
        alternate: NodeId,
    },
    Assignment {
        name: Name,
        value: NodeId,
    },
}

impl NodeKind {
    /// First chapter in which this construct is legal.
    pub fn min_chapter(&self) -> Chapter {
        match self {
            NodeKind::Literal(Literal::Null) => Chapter::TWO,
            NodeKind::VariableDeclaration {
                kind: DeclKind::Let,
                ..
            }
            | NodeKind::Assignment { .. } => Chapter::THREE,
            _ => Chapter::ONE,
        }
    }

    /// Human-readable construct name for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            NodeKind::Program { .. } => "program",
            NodeKind::Block { .. } => "block",
            NodeKind::ExpressionStatement { .. } => "expression statement",
            NodeKind::VariableDeclaration {
                kind: DeclKind::Const,
                ..
            } => "constant declaration",
            NodeKind::VariableDeclaration {
                kind: DeclKind::Let,
                ..
            } => "variable declaration",
            NodeKind::FunctionDeclaration { .. } => "function declaration",
            NodeKind::Return { .. } => "return statement",
            NodeKind::If { .. } => "if statement",
            NodeKind::Literal(Literal::Null) => "null literal",
            NodeKind::Literal(_) => "literal",
            NodeKind::Identifier(_) => "identifier",
            NodeKind::Function { .. } => "function expression",
            NodeKind::Call { .. } => "call",
            NodeKind::Unary { .. } => "unary expression",
            NodeKind::Binary { .. } => "binary expression",
            NodeKind::Logical { .. } => "logical expression",
            NodeKind::Conditional { .. } => "conditional expression",
            NodeKind::Assignment { .. } => "assignment",
        }
    }

    /// Name declared by this statement, if it is a declaration.
    pub fn declared_name(&self) -> Option<Name> {
        match self {
            NodeKind::VariableDeclaration { name, .. } | NodeKind::FunctionDeclaration { name, .. } => {
                Some(*name)
            }
            _ => None,
        }
    }
}
