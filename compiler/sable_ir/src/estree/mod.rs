//! ESTree JSON input.
//!
//! The external parser emits ESTree (the JSON tree format shared by acorn,
//! esprima and friends). This module deserializes the subset of ESTree the
//! evaluator understands and lowers it into a [`NodeArena`]. Node types
//! outside that subset deserialize to [`Node::Unsupported`] and are reported
//! by [`lower_program`] rather than rejected by the JSON layer.

#[cfg(test)]
mod tests;

use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::{
    BinaryOp, DeclKind, FunctionBody, Literal, LogicalOp, Name, NodeArena, NodeId, NodeKind,
    StringInterner, Span, UnaryOp,
};
use sable_stack::ensure_sufficient_stack;

/// Source offsets carried by every ESTree node.
#[derive(Deserialize, Debug, Default, Clone, Copy)]
pub struct Location {
    #[serde(default)]
    pub start: u32,
    #[serde(default)]
    pub end: u32,
}

impl Location {
    fn span(self) -> Span {
        Span::new(self.start, self.end)
    }
}

// Nested nodes are buffered by serde before they are matched on `type`, and
// replaying the buffer recurses once per level. Each level checks the stack.

fn child<'de, D: Deserializer<'de>>(de: D) -> Result<Box<Node>, D::Error> {
    ensure_sufficient_stack(|| Box::<Node>::deserialize(de))
}

fn optional_child<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Box<Node>>, D::Error> {
    ensure_sufficient_stack(|| Option::<Box<Node>>::deserialize(de))
}

fn children<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Node>, D::Error> {
    ensure_sufficient_stack(|| Vec::<Node>::deserialize(de))
}

/// An ESTree node.
#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub enum Node {
    Program(Program),
    BlockStatement(Block),
    ExpressionStatement(ExpressionStatement),
    VariableDeclaration(VariableDeclaration),
    FunctionDeclaration(Function),
    ReturnStatement(Return),
    IfStatement(If),
    Literal(LiteralNode),
    Identifier(Identifier),
    FunctionExpression(Function),
    ArrowFunctionExpression(Function),
    CallExpression(Call),
    UnaryExpression(Operation),
    BinaryExpression(Operation),
    LogicalExpression(Operation),
    ConditionalExpression(Conditional),
    AssignmentExpression(Assignment),
    /// Any node type outside the supported subset.
    #[serde(other)]
    Unsupported,
}

#[derive(Deserialize, Debug)]
pub struct Program {
    #[serde(deserialize_with = "children")]
    pub body: Vec<Node>,
    #[serde(flatten)]
    pub loc: Location,
}

#[derive(Deserialize, Debug)]
pub struct Block {
    #[serde(deserialize_with = "children")]
    pub body: Vec<Node>,
    #[serde(flatten)]
    pub loc: Location,
}

#[derive(Deserialize, Debug)]
pub struct ExpressionStatement {
    #[serde(deserialize_with = "child")]
    pub expression: Box<Node>,
    #[serde(flatten)]
    pub loc: Location,
}

#[derive(Deserialize, Debug)]
pub struct VariableDeclaration {
    pub kind: String,
    pub declarations: Vec<Declarator>,
    #[serde(flatten)]
    pub loc: Location,
}

#[derive(Deserialize, Debug)]
pub struct Declarator {
    #[serde(deserialize_with = "child")]
    pub id: Box<Node>,
    #[serde(default, deserialize_with = "optional_child")]
    pub init: Option<Box<Node>>,
}

/// Function declarations, function expressions and arrows.
#[derive(Deserialize, Debug)]
pub struct Function {
    #[serde(default, deserialize_with = "optional_child")]
    pub id: Option<Box<Node>>,
    #[serde(deserialize_with = "children")]
    pub params: Vec<Node>,
    #[serde(deserialize_with = "child")]
    pub body: Box<Node>,
    /// Set on arrows whose body is an expression.
    #[serde(default)]
    pub expression: bool,
    #[serde(flatten)]
    pub loc: Location,
}

#[derive(Deserialize, Debug)]
pub struct Return {
    #[serde(default, deserialize_with = "optional_child")]
    pub argument: Option<Box<Node>>,
    #[serde(flatten)]
    pub loc: Location,
}

#[derive(Deserialize, Debug)]
pub struct If {
    #[serde(deserialize_with = "child")]
    pub test: Box<Node>,
    #[serde(deserialize_with = "child")]
    pub consequent: Box<Node>,
    #[serde(default, deserialize_with = "optional_child")]
    pub alternate: Option<Box<Node>>,
    #[serde(flatten)]
    pub loc: Location,
}

/// Literal payload; JSON `null` is the `null` literal.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum LiteralValue {
    Bool(bool),
    Number(f64),
    Str(String),
}

#[derive(Deserialize, Debug)]
pub struct LiteralNode {
    #[serde(default)]
    pub value: Option<LiteralValue>,
    #[serde(flatten)]
    pub loc: Location,
}

#[derive(Deserialize, Debug)]
pub struct Identifier {
    pub name: String,
    #[serde(flatten)]
    pub loc: Location,
}

#[derive(Deserialize, Debug)]
pub struct Call {
    #[serde(deserialize_with = "child")]
    pub callee: Box<Node>,
    #[serde(deserialize_with = "children")]
    pub arguments: Vec<Node>,
    #[serde(flatten)]
    pub loc: Location,
}

/// Unary, binary and logical expressions. Unary nodes carry `argument`.
#[derive(Deserialize, Debug)]
pub struct Operation {
    pub operator: String,
    #[serde(default, deserialize_with = "optional_child")]
    pub left: Option<Box<Node>>,
    #[serde(default, deserialize_with = "optional_child")]
    pub right: Option<Box<Node>>,
    #[serde(default, deserialize_with = "optional_child")]
    pub argument: Option<Box<Node>>,
    #[serde(flatten)]
    pub loc: Location,
}

#[derive(Deserialize, Debug)]
pub struct Conditional {
    #[serde(deserialize_with = "child")]
    pub test: Box<Node>,
    #[serde(deserialize_with = "child")]
    pub consequent: Box<Node>,
    #[serde(deserialize_with = "child")]
    pub alternate: Box<Node>,
    #[serde(flatten)]
    pub loc: Location,
}

#[derive(Deserialize, Debug)]
pub struct Assignment {
    pub operator: String,
    #[serde(deserialize_with = "child")]
    pub left: Box<Node>,
    #[serde(deserialize_with = "child")]
    pub right: Box<Node>,
    #[serde(flatten)]
    pub loc: Location,
}

/// Why an ESTree tree could not be lowered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LowerError {
    /// The root is not a `Program`.
    NotAProgram,
    /// A node type outside the supported subset.
    UnsupportedNode,
    UnsupportedOperator { operator: String, span: Span },
    /// A parameter, declaration target or assignment target that is not a
    /// plain identifier.
    ExpectedIdentifier { span: Span },
    /// A declaration with several declarators, no initializer, or an
    /// unknown keyword.
    MalformedDeclaration { reason: &'static str, span: Span },
    /// An operand missing from a unary, binary or logical expression.
    MissingOperand { span: Span },
    /// More statements, arguments or parameters than a list can hold.
    ListTooLong { span: Span },
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowerError::NotAProgram => write!(f, "the root node must be a Program"),
            LowerError::UnsupportedNode => write!(f, "unsupported syntax node"),
            LowerError::UnsupportedOperator { operator, span } => {
                write!(f, "operator `{operator}` is not supported (at {span})")
            }
            LowerError::ExpectedIdentifier { span } => {
                write!(f, "expected an identifier (at {span})")
            }
            LowerError::MalformedDeclaration { reason, span } => {
                write!(f, "malformed declaration: {reason} (at {span})")
            }
            LowerError::MissingOperand { span } => write!(f, "missing operand (at {span})"),
            LowerError::ListTooLong { span } => write!(f, "list too long (at {span})"),
        }
    }
}

impl std::error::Error for LowerError {}

/// Lower an ESTree `Program` into `arena`, returning the program node.
pub fn lower_program(
    root: &Node,
    arena: &mut NodeArena,
    interner: &StringInterner,
) -> Result<NodeId, LowerError> {
    let Node::Program(program) = root else {
        return Err(LowerError::NotAProgram);
    };
    let mut lowerer = Lowerer { arena, interner };
    let body = lowerer.list(&program.body, program.loc.span())?;
    Ok(lowerer.arena.alloc(NodeKind::Program { body }, program.loc.span()))
}

struct Lowerer<'a> {
    arena: &'a mut NodeArena,
    interner: &'a StringInterner,
}

impl Lowerer<'_> {
    fn node(&mut self, node: &Node) -> Result<NodeId, LowerError> {
        ensure_sufficient_stack(|| self.node_inner(node))
    }

    fn node_inner(&mut self, node: &Node) -> Result<NodeId, LowerError> {
        let (kind, loc) = match node {
            Node::Program(_) | Node::Unsupported => return Err(LowerError::UnsupportedNode),
            Node::BlockStatement(block) => {
                let body = self.list(&block.body, block.loc.span())?;
                (NodeKind::Block { body }, block.loc)
            }
            Node::ExpressionStatement(stmt) => {
                let expr = self.node(&stmt.expression)?;
                (NodeKind::ExpressionStatement { expr }, stmt.loc)
            }
            Node::VariableDeclaration(decl) => (self.declaration(decl)?, decl.loc),
            Node::FunctionDeclaration(function) => {
                let span = function.loc.span();
                let name = match &function.id {
                    Some(id) => self.identifier(id)?,
                    None => return Err(LowerError::ExpectedIdentifier { span }),
                };
                let params = self.params(&function.params, span)?;
                let body = self.node(&function.body)?;
                (NodeKind::FunctionDeclaration { name, params, body }, function.loc)
            }
            Node::FunctionExpression(function) | Node::ArrowFunctionExpression(function) => {
                let name = match &function.id {
                    Some(id) => Some(self.identifier(id)?),
                    None => None,
                };
                let params = self.params(&function.params, function.loc.span())?;
                let lowered = self.node(&function.body)?;
                let body = if function.expression {
                    FunctionBody::Expr(lowered)
                } else {
                    FunctionBody::Block(lowered)
                };
                (NodeKind::Function { name, params, body }, function.loc)
            }
            Node::ReturnStatement(ret) => {
                let argument = match &ret.argument {
                    Some(argument) => Some(self.node(argument)?),
                    None => None,
                };
                (NodeKind::Return { argument }, ret.loc)
            }
            Node::IfStatement(stmt) => {
                let test = self.node(&stmt.test)?;
                let consequent = self.node(&stmt.consequent)?;
                let alternate = match &stmt.alternate {
                    Some(alternate) => Some(self.node(alternate)?),
                    None => None,
                };
                (
                    NodeKind::If {
                        test,
                        consequent,
                        alternate,
                    },
                    stmt.loc,
                )
            }
            Node::Literal(literal) => {
                let value = match &literal.value {
                    None => Literal::Null,
                    Some(LiteralValue::Bool(b)) => Literal::Bool(*b),
                    Some(LiteralValue::Number(n)) => Literal::Number(*n),
                    Some(LiteralValue::Str(s)) => Literal::Str(self.interner.intern(s)),
                };
                (NodeKind::Literal(value), literal.loc)
            }
            Node::Identifier(ident) => (
                NodeKind::Identifier(self.interner.intern(&ident.name)),
                ident.loc,
            ),
            Node::CallExpression(call) => {
                let callee = self.node(&call.callee)?;
                let args = self.list(&call.arguments, call.loc.span())?;
                (NodeKind::Call { callee, args }, call.loc)
            }
            Node::UnaryExpression(op) => {
                let span = op.loc.span();
                let unary = UnaryOp::from_symbol(&op.operator).ok_or_else(|| {
                    LowerError::UnsupportedOperator {
                        operator: op.operator.clone(),
                        span,
                    }
                })?;
                let operand = self.operand(op.argument.as_deref(), span)?;
                (NodeKind::Unary { op: unary, operand }, op.loc)
            }
            Node::BinaryExpression(op) => {
                let span = op.loc.span();
                let binary = BinaryOp::from_symbol(&op.operator).ok_or_else(|| {
                    LowerError::UnsupportedOperator {
                        operator: op.operator.clone(),
                        span,
                    }
                })?;
                let left = self.operand(op.left.as_deref(), span)?;
                let right = self.operand(op.right.as_deref(), span)?;
                (
                    NodeKind::Binary {
                        op: binary,
                        left,
                        right,
                    },
                    op.loc,
                )
            }
            Node::LogicalExpression(op) => {
                let span = op.loc.span();
                let logical = LogicalOp::from_symbol(&op.operator).ok_or_else(|| {
                    LowerError::UnsupportedOperator {
                        operator: op.operator.clone(),
                        span,
                    }
                })?;
                let left = self.operand(op.left.as_deref(), span)?;
                let right = self.operand(op.right.as_deref(), span)?;
                (
                    NodeKind::Logical {
                        op: logical,
                        left,
                        right,
                    },
                    op.loc,
                )
            }
            Node::ConditionalExpression(cond) => {
                let test = self.node(&cond.test)?;
                let consequent = self.node(&cond.consequent)?;
                let alternate = self.node(&cond.alternate)?;
                (
                    NodeKind::Conditional {
                        test,
                        consequent,
                        alternate,
                    },
                    cond.loc,
                )
            }
            Node::AssignmentExpression(assign) => {
                if assign.operator != "=" {
                    return Err(LowerError::UnsupportedOperator {
                        operator: assign.operator.clone(),
                        span: assign.loc.span(),
                    });
                }
                let name = self.identifier(&assign.left)?;
                let value = self.node(&assign.right)?;
                (NodeKind::Assignment { name, value }, assign.loc)
            }
        };
        Ok(self.arena.alloc(kind, loc.span()))
    }

    fn declaration(&mut self, decl: &VariableDeclaration) -> Result<NodeKind, LowerError> {
        let span = decl.loc.span();
        let kind = match decl.kind.as_str() {
            "const" => DeclKind::Const,
            "let" => DeclKind::Let,
            _ => {
                return Err(LowerError::MalformedDeclaration {
                    reason: "only const and let are supported",
                    span,
                })
            }
        };
        let [declarator] = decl.declarations.as_slice() else {
            return Err(LowerError::MalformedDeclaration {
                reason: "exactly one name must be declared",
                span,
            });
        };
        let Some(init) = &declarator.init else {
            return Err(LowerError::MalformedDeclaration {
                reason: "missing initializer",
                span,
            });
        };
        let name = self.identifier(&declarator.id)?;
        let init = self.node(init)?;
        Ok(NodeKind::VariableDeclaration { kind, name, init })
    }

    fn operand(&mut self, node: Option<&Node>, span: Span) -> Result<NodeId, LowerError> {
        match node {
            Some(node) => self.node(node),
            None => Err(LowerError::MissingOperand { span }),
        }
    }

    fn identifier(&self, node: &Node) -> Result<Name, LowerError> {
        match node {
            Node::Identifier(ident) => Ok(self.interner.intern(&ident.name)),
            _ => Err(LowerError::ExpectedIdentifier {
                span: location(node).span(),
            }),
        }
    }

    fn list(&mut self, nodes: &[Node], span: Span) -> Result<crate::NodeRange, LowerError> {
        let ids = nodes
            .iter()
            .map(|node| self.node(node))
            .collect::<Result<Vec<_>, _>>()?;
        self.arena
            .try_alloc_list(&ids)
            .ok_or(LowerError::ListTooLong { span })
    }

    fn params(&mut self, params: &[Node], span: Span) -> Result<crate::ParamRange, LowerError> {
        let names = params
            .iter()
            .map(|param| self.identifier(param))
            .collect::<Result<Vec<_>, _>>()?;
        self.arena
            .try_alloc_params(&names)
            .ok_or(LowerError::ListTooLong { span })
    }
}

fn location(node: &Node) -> Location {
    match node {
        Node::Program(n) => n.loc,
        Node::BlockStatement(n) => n.loc,
        Node::ExpressionStatement(n) => n.loc,
        Node::VariableDeclaration(n) => n.loc,
        Node::FunctionDeclaration(n) | Node::FunctionExpression(n) | Node::ArrowFunctionExpression(n) => {
            n.loc
        }
        Node::ReturnStatement(n) => n.loc,
        Node::IfStatement(n) => n.loc,
        Node::Literal(n) => n.loc,
        Node::Identifier(n) => n.loc,
        Node::CallExpression(n) => n.loc,
        Node::UnaryExpression(n) | Node::BinaryExpression(n) | Node::LogicalExpression(n) => n.loc,
        Node::ConditionalExpression(n) => n.loc,
        Node::AssignmentExpression(n) => n.loc,
        Node::Unsupported => Location::default(),
    }
}
