//! Sable IR - the syntax tree consumed by the Sable evaluator.
//!
//! The tree is produced by an external parser and handed over either through
//! [`AstBuilder`] or, with the `estree` feature, as ESTree JSON. It is stored
//! flat: every node lives in a [`NodeArena`] and refers to its children by
//! [`NodeId`].
//!
//! # Contents
//!
//! - [`Span`]: byte-offset source locations attached to every node
//! - [`Name`] / [`StringInterner`]: interned identifiers
//! - [`Chapter`]: the language subset in force for a run
//! - [`NodeKind`]: the closed set of node kinds, with [`NodeKind::min_chapter`]
//! - [`render_snippet`]: short source-like rendering for diagnostics

mod ast;
mod chapter;
#[cfg(feature = "estree")]
pub mod estree;
mod name;
mod span;

pub use ast::{
    format_number, render_snippet, AstBuilder, BinaryOp, DeclKind, FunctionBody, Literal,
    LogicalOp, NodeArena, NodeId, NodeKind, NodeRange, ParamRange, SharedArena, UnaryOp,
};
pub use chapter::Chapter;
pub use name::{Name, SharedInterner, StringInterner};
pub use span::Span;
