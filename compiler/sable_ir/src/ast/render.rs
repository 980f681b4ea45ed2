//! Source-like rendering of nodes for diagnostics.
//!
//! The evaluator never sees source text, so messages that must quote the
//! offending expression (calling a non-function, for instance) render it
//! back from the tree. Nesting is cut off after a few levels.

use std::fmt::Write;

use super::{FunctionBody, Literal, NodeArena, NodeId, NodeKind};
use crate::StringInterner;

const MAX_DEPTH: usize = 4;

/// Render `id` as a short snippet of source-like text.
pub fn render_snippet(arena: &NodeArena, interner: &StringInterner, id: NodeId) -> String {
    let mut renderer = Renderer {
        arena,
        interner,
        out: String::new(),
    };
    renderer.node(id, MAX_DEPTH);
    renderer.out
}

/// Format a number the way the language prints it: `1`, `0.5`, `NaN`,
/// `Infinity`, `1e+21`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    if (1e-6..1e21).contains(&n.abs()) {
        return format!("{n}");
    }
    let scientific = format!("{n:e}");
    match scientific.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => scientific,
    }
}

struct Renderer<'a> {
    arena: &'a NodeArena,
    interner: &'a StringInterner,
    out: String,
}

impl Renderer<'_> {
    fn node(&mut self, id: NodeId, depth: usize) {
        if depth == 0 {
            self.out.push('…');
            return;
        }
        let inner = depth - 1;
        match *self.arena.kind(id) {
            NodeKind::Literal(literal) => self.literal(literal),
            NodeKind::Identifier(name) => self.out.push_str(self.interner.lookup(name)),
            NodeKind::Call { callee, args } => {
                self.node(callee, inner);
                self.out.push('(');
                self.comma_separated(self.arena.list(args), inner);
                self.out.push(')');
            }
            NodeKind::Unary { op, operand } => {
                self.out.push_str(op.as_symbol());
                self.node(operand, inner);
            }
            NodeKind::Binary { op, left, right } => {
                self.infix(left, op.as_symbol(), right, inner);
            }
            NodeKind::Logical { op, left, right } => {
                self.infix(left, op.as_symbol(), right, inner);
            }
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.node(test, inner);
                self.out.push_str(" ? ");
                self.node(consequent, inner);
                self.out.push_str(" : ");
                self.node(alternate, inner);
            }
            NodeKind::Function { name, params, body } => {
                let params = self.arena.params(params).iter().map(|p| self.interner.lookup(*p));
                let params: Vec<&str> = params.collect();
                match body {
                    FunctionBody::Expr(expr) => {
                        let _ = write!(self.out, "({}) => ", params.join(", "));
                        self.node(expr, inner);
                    }
                    FunctionBody::Block(_) => {
                        let name = name.map_or("", |n| self.interner.lookup(n));
                        let _ = write!(self.out, "function {name}({}) {{ … }}", params.join(", "));
                    }
                }
            }
            NodeKind::Assignment { name, value } => {
                let _ = write!(self.out, "{} = ", self.interner.lookup(name));
                self.node(value, inner);
            }
            NodeKind::ExpressionStatement { expr } => {
                self.node(expr, inner);
                self.out.push(';');
            }
            NodeKind::VariableDeclaration { kind, name, init } => {
                let _ = write!(
                    self.out,
                    "{} {} = ",
                    kind.as_keyword(),
                    self.interner.lookup(name)
                );
                self.node(init, inner);
                self.out.push(';');
            }
            NodeKind::FunctionDeclaration { name, params, .. } => {
                let params: Vec<&str> = self
                    .arena
                    .params(params)
                    .iter()
                    .map(|p| self.interner.lookup(*p))
                    .collect();
                let _ = write!(
                    self.out,
                    "function {}({}) {{ … }}",
                    self.interner.lookup(name),
                    params.join(", ")
                );
            }
            NodeKind::Return { argument } => {
                self.out.push_str("return");
                if let Some(argument) = argument {
                    self.out.push(' ');
                    self.node(argument, inner);
                }
                self.out.push(';');
            }
            NodeKind::If { test, .. } => {
                self.out.push_str("if (");
                self.node(test, inner);
                self.out.push_str(") { … }");
            }
            NodeKind::Block { .. } => self.out.push_str("{ … }"),
            NodeKind::Program { .. } => self.out.push('…'),
        }
    }

    fn literal(&mut self, literal: Literal) {
        match literal {
            Literal::Number(n) => self.out.push_str(&format_number(n)),
            Literal::Bool(b) => {
                let _ = write!(self.out, "{b}");
            }
            Literal::Str(s) => {
                let _ = write!(self.out, "{:?}", self.interner.lookup(s));
            }
            Literal::Null => self.out.push_str("null"),
            Literal::Undefined => self.out.push_str("undefined"),
        }
    }

    fn infix(&mut self, left: NodeId, symbol: &str, right: NodeId, depth: usize) {
        self.node(left, depth);
        let _ = write!(self.out, " {symbol} ");
        self.node(right, depth);
    }

    fn comma_separated(&mut self, items: &[NodeId], depth: usize) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.node(*item, depth);
        }
    }
}
