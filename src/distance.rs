//! All-pairs minimum-hop distances and reachability.
//!
//! Distances are counted in arcs, so a place and the transition it feeds
//! are one hop apart. The matrix is built by repeated arc relaxation until
//! no entry changes, with `N = |P| + |T|` standing in for "unreachable";
//! the flat layout indexes the full matrix as
//! `(|P| * to.kind + to.index) * N + (|P| * from.kind + from.index)`.
//!
//! Used both for plain reachability and as a "most recent event" heuristic
//! by logic-minimization passes downstream.

use crate::graph::Graph;
use crate::marking::Token;
use crate::node_id::NodeId;
use crate::payload::{PlacePayload, TransitionPayload};

/// Lazily rebuilt distance matrix.
#[derive(Clone, Debug, Default)]
pub(crate) struct DistanceMatrix {
    pub ready: bool,
    pub dist: Vec<usize>,
}

impl<P: PlacePayload, T: TransitionPayload, K: Token> Graph<P, T, K> {
    #[inline]
    fn linear(&self, n: NodeId) -> usize {
        self.places.len() * n.kind.code() + n.index
    }

    /// Rebuild the all-pairs hop matrix.
    ///
    /// Queries call this lazily; it is public so hosts can pay the cost at
    /// a convenient time.
    pub fn update_node_distances(&mut self) {
        let nodes = self.size();
        self.distances.dist.clear();
        self.distances.dist.resize(nodes * nodes, nodes);
        for i in 0..nodes {
            self.distances.dist[i * nodes + i] = 0;
        }

        let mut change = true;
        while change {
            change = false;
            for list in &self.arcs {
                for arc in list {
                    let from = self.places.len() * arc.from.kind.code() + arc.from.index;
                    let to = self.places.len() * arc.to.kind.code() + arc.to.index;
                    for k in 0..nodes {
                        let mut m = (self.distances.dist[from * nodes + k] + 1)
                            .min(self.distances.dist[to * nodes + k]);
                        if m > nodes {
                            m = nodes;
                        }
                        if self.distances.dist[to * nodes + k] != m {
                            self.distances.dist[to * nodes + k] = m;
                            change = true;
                        }
                    }
                }
            }
        }
        self.distances.ready = true;
    }

    /// Minimum number of arcs from one node to another, or `size()` when
    /// unreachable.
    pub fn distance(&mut self, from: NodeId, to: NodeId) -> usize {
        if !self.distances.ready {
            self.update_node_distances();
        }
        let nodes = self.size();
        self.distances.dist[self.linear(to) * nodes + self.linear(from)]
    }

    /// Minimum distance over all `from`/`to` pairs.
    pub fn distance_between(&mut self, from: &[NodeId], to: &[NodeId]) -> usize {
        let mut result = self.size();
        for &f in from {
            for &t in to {
                result = result.min(self.distance(f, t));
            }
        }
        result
    }

    /// True if a directed path leads from `from` to `to`.
    pub fn is_reachable(&mut self, from: NodeId, to: NodeId) -> bool {
        self.distance(from, to) < self.size()
    }

    /// True if any `to` node is reachable from any `from` node.
    pub fn is_reachable_any(&mut self, from: &[NodeId], to: &[NodeId]) -> bool {
        for &f in from {
            for &t in to {
                if self.is_reachable(f, t) {
                    return true;
                }
            }
        }
        false
    }
}
