//! Typed index handles for nodes and arcs.
//!
//! A [`Graph`](crate::Graph) stores places and transitions in two dense
//! vectors, so a node is fully identified by its kind and its offset within
//! the vector of that kind. [`NodeId`] packages the pair into a small,
//! `Copy`, hashable handle; [`ArcId`] does the same for arcs, which are
//! stored in two lists keyed by the kind of their source node.
//!
//! Indices are dense per kind and stable only between mutating operations:
//! [`erase`](crate::Graph::erase) and friends compact the index range and
//! shift everything above the removed slot down by one. Callers that hold
//! ids across such an edit must thread them through the returned
//! translation maps.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two node kinds of a bipartite concurrency graph.
///
/// The numeric codes (`Place = 0`, `Transition = 1`) are used as array
/// indices throughout, and `1 - kind` denotes the opposite kind.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum NodeKind {
    /// A token holder. Places form the state of the net.
    Place = 0,
    /// An event. Transitions consume and produce tokens.
    Transition = 1,
}

impl NodeKind {
    /// The opposite kind (`1 - kind`).
    #[inline]
    pub fn opposite(self) -> NodeKind {
        match self {
            NodeKind::Place => NodeKind::Transition,
            NodeKind::Transition => NodeKind::Place,
        }
    }

    /// Numeric code usable as an array index.
    #[inline]
    pub fn code(self) -> usize {
        self as usize
    }
}

/// Identity of one node: a `(kind, index)` pair.
///
/// Ordering is lexicographic on `(kind, index)`, so all places sort before
/// all transitions. Displayed as `P<i>` / `T<i>`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId {
    pub kind: NodeKind,
    pub index: usize,
}

impl NodeId {
    /// Create a handle for the node of the given kind at `index`.
    #[inline]
    pub fn new(kind: NodeKind, index: usize) -> Self {
        Self { kind, index }
    }

    /// Handle for the place at `index`.
    #[inline]
    pub fn place(index: usize) -> Self {
        Self::new(NodeKind::Place, index)
    }

    /// Handle for the transition at `index`.
    #[inline]
    pub fn transition(index: usize) -> Self {
        Self::new(NodeKind::Transition, index)
    }

    /// True if this id names a place.
    #[inline]
    pub fn is_place(self) -> bool {
        self.kind == NodeKind::Place
    }

    /// True if this id names a transition.
    #[inline]
    pub fn is_transition(self) -> bool {
        self.kind == NodeKind::Transition
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NodeKind::Place => write!(f, "P{}", self.index),
            NodeKind::Transition => write!(f, "T{}", self.index),
        }
    }
}

/// Identity of one arc: the source-kind list it lives in and its offset.
///
/// Like node indices, arc indices are stable only between mutations.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArcId {
    /// Kind of the arc's source node, i.e. which of the two arc lists.
    pub kind: NodeKind,
    /// Offset within `arcs[kind]`.
    pub index: usize,
}

impl ArcId {
    #[inline]
    pub fn new(kind: NodeKind, index: usize) -> Self {
        Self { kind, index }
    }
}

/// A directed edge between two nodes of opposite kinds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Arc {
    pub from: NodeId,
    pub to: NodeId,
}

impl Arc {
    /// Create an arc `from -> to`. The graph maintains the invariant that
    /// stored arcs connect nodes of opposite kinds.
    #[inline]
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}
