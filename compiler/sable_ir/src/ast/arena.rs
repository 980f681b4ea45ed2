//! Node storage.
//!
//! Struct-of-arrays layout: node kinds and spans live in parallel vectors
//! indexed by [`NodeId`], child lists in flat side tables.

use std::ops::Deref;
use std::sync::Arc;

use super::{NodeId, NodeKind, NodeRange, ParamRange};
use crate::{Name, Span};

/// Arena holding every node of one or more programs.
#[derive(Default, Debug)]
pub struct NodeArena {
    kinds: Vec<NodeKind>,
    spans: Vec<Span>,
    lists: Vec<NodeId>,
    params: Vec<Name>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node.
    ///
    /// # Panics
    /// Panics if the arena already holds `u32::MAX` nodes.
    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let index = u32::try_from(self.kinds.len())
            .unwrap_or_else(|_| panic!("node arena exceeded {} nodes", u32::MAX));
        self.kinds.push(kind);
        self.spans.push(span);
        NodeId::new(index)
    }

    /// Allocate a statement or argument list, or `None` if it has more than
    /// `u16::MAX` entries.
    pub fn try_alloc_list(&mut self, nodes: &[NodeId]) -> Option<NodeRange> {
        let len = u16::try_from(nodes.len()).ok()?;
        let start = u32::try_from(self.lists.len()).ok()?;
        self.lists.extend_from_slice(nodes);
        Some(NodeRange::new(start, len))
    }

    /// Allocate a statement or argument list.
    ///
    /// # Panics
    /// Panics if the list has more than `u16::MAX` entries.
    pub fn alloc_list(&mut self, nodes: &[NodeId]) -> NodeRange {
        self.try_alloc_list(nodes)
            .unwrap_or_else(|| panic!("node list of {} entries is too long", nodes.len()))
    }

    /// Allocate a parameter list, or `None` if it is too long.
    pub fn try_alloc_params(&mut self, names: &[Name]) -> Option<ParamRange> {
        let len = u16::try_from(names.len()).ok()?;
        let start = u32::try_from(self.params.len()).ok()?;
        self.params.extend_from_slice(names);
        Some(ParamRange::new(start, len))
    }

    /// Allocate a parameter list.
    ///
    /// # Panics
    /// Panics if the list has more than `u16::MAX` entries.
    pub fn alloc_params(&mut self, names: &[Name]) -> ParamRange {
        self.try_alloc_params(names)
            .unwrap_or_else(|| panic!("parameter list of {} entries is too long", names.len()))
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.kinds[id.index()]
    }

    #[inline]
    pub fn span(&self, id: NodeId) -> Span {
        self.spans[id.index()]
    }

    #[inline]
    pub fn list(&self, range: NodeRange) -> &[NodeId] {
        let start = range.start as usize;
        &self.lists[start..start + range.len()]
    }

    #[inline]
    pub fn params(&self, range: ParamRange) -> &[Name] {
        let start = range.start as usize;
        &self.params[start..start + range.len()]
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Read-only arena shared by every run over the same tree.
#[derive(Clone, Debug)]
#[repr(transparent)]
pub struct SharedArena(Arc<NodeArena>);

impl SharedArena {
    pub fn new(arena: NodeArena) -> Self {
        SharedArena(Arc::new(arena))
    }
}

impl Deref for SharedArena {
    type Target = NodeArena;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<NodeArena> for SharedArena {
    fn from(arena: NodeArena) -> Self {
        SharedArena::new(arena)
    }
}
