//! Clique enumeration over composition relations.
//!
//! Nodes can be composed in parallel and in choice at the same time, so
//! grouping "all mutually parallel nodes" is a maximal-clique problem over
//! the relation graph, not a partition. One iterative Bron-Kerbosch
//! implementation serves both [`Graph::select`] (cliques of nodes) and
//! [`Graph::group`] (cliques of node groups); the adjacency predicate is
//! the only thing that changes.
//!
//! `invert` flips the question to "not composed as the *opposite*": an
//! inverted parallel selection keeps apart exactly the nodes that are
//! choice-composed. Combined with `always` this yields the four selection
//! strengths the state-variable insertion flow needs.

use itertools::Itertools;

use crate::composition::Composition;
use crate::graph::Graph;
use crate::marking::Token;
use crate::node_id::{NodeId, NodeKind};
use crate::payload::{PlacePayload, TransitionPayload};
use crate::split_group::{SetOp, merge};
use std::collections::VecDeque;

struct Frame {
    r: Vec<usize>,
    p: Vec<usize>,
    x: Vec<usize>,
}

/// Iterative Bron-Kerbosch over vertices `0..count` with an arbitrary
/// adjacency predicate. Self-edges are never taken, so predicates only
/// need to be meaningful for distinct vertices.
fn bron_kerbosch(count: usize, adjacent: &dyn Fn(usize, usize) -> bool) -> Vec<Vec<usize>> {
    let mut result = Vec::new();
    let mut frames = vec![Frame {
        r: Vec::new(),
        p: (0..count).collect(),
        x: Vec::new(),
    }];

    while let Some(mut frame) = frames.pop() {
        if frame.p.is_empty() && frame.x.is_empty() {
            result.push(frame.r);
            continue;
        }
        while let Some(&v) = frame.p.last() {
            let mut child = Frame {
                r: frame.r.clone(),
                p: frame.p.clone(),
                x: frame.x.clone(),
            };
            child.r.push(v);
            child.p.retain(|&u| u != v && adjacent(u, v));
            child.x.retain(|&u| u != v && adjacent(u, v));
            frames.push(child);

            frame.x.push(v);
            frame.p.pop();
        }
    }
    result
}

/// Sorted set containment for id lists.
fn is_subset(inner: &[NodeId], outer: &[NodeId]) -> bool {
    let mut j = 0usize;
    for x in inner {
        while j < outer.len() && outer[j] < *x {
            j += 1;
        }
        if j >= outer.len() || outer[j] != *x {
            return false;
        }
        j += 1;
    }
    true
}

/// Sorted set difference `a \ b`.
fn difference(a: &[NodeId], b: &[NodeId]) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut j = 0usize;
    for x in a {
        while j < b.len() && b[j] < *x {
            j += 1;
        }
        if j >= b.len() || b[j] != *x {
            result.push(*x);
        }
    }
    result
}

impl<P: PlacePayload, T: TransitionPayload, K: Token> Graph<P, T, K> {
    /// Partition a node list into maximal cliques of the given binary
    /// composition (`Sequence` is not selectable and yields no groups).
    ///
    /// Without `invert`, two nodes share a group when
    /// `is(composition, ..)` holds at the requested strength; with
    /// `invert`, when the *opposite* composition does **not** hold. Each
    /// returned group is sorted.
    pub fn select(
        &mut self,
        composition: Composition,
        nodes: &[NodeId],
        always: bool,
        invert: bool,
    ) -> Vec<Vec<NodeId>> {
        if composition == Composition::Sequence || nodes.is_empty() {
            return Vec::new();
        }

        let n = nodes.len();
        let mut adj = vec![false; n * n];
        for u in 0..n {
            for v in 0..n {
                if u == v {
                    continue;
                }
                adj[u * n + v] = if invert {
                    !self.is(
                        composition.opposite().into(),
                        nodes[u],
                        nodes[v],
                        always,
                    )
                } else {
                    self.is(composition.into(), nodes[u], nodes[v], always)
                };
            }
        }

        bron_kerbosch(n, &|u, v| adj[u * n + v])
            .into_iter()
            .map(|clique| {
                let mut group: Vec<NodeId> = clique.into_iter().map(|i| nodes[i]).collect();
                group.sort();
                group
            })
            .collect()
    }

    /// Regroup already-formed groups: every clique of groups whose
    /// cross-pairs satisfy the relation is appended (as one sorted union)
    /// to the input list. Like [`select`](Graph::select), only the binary
    /// compositions regroup; `Sequence` returns the input unchanged.
    pub fn group(
        &mut self,
        composition: Composition,
        mut nodes: Vec<Vec<NodeId>>,
        always: bool,
        invert: bool,
    ) -> Vec<Vec<NodeId>> {
        if composition == Composition::Sequence {
            return nodes;
        }

        let n = nodes.len();
        let mut adj = vec![false; n * n];
        for u in 0..n {
            for v in 0..n {
                if u == v {
                    continue;
                }
                adj[u * n + v] = if invert {
                    !self.is_sets(
                        composition.opposite().into(),
                        &nodes[u],
                        &nodes[v],
                        always,
                    )
                } else {
                    self.is_sets(composition.into(), &nodes[u], &nodes[v], always)
                };
            }
        }

        for clique in bron_kerbosch(n, &|u, v| adj[u * n + v]) {
            if clique.len() > 1 {
                let mut merged: Vec<NodeId> = clique
                    .iter()
                    .flat_map(|&i| nodes[i].iter().copied())
                    .collect();
                merged.sort();
                nodes.push(merged);
            }
        }
        nodes
    }

    /// Differentiate groups that fully contain other groups.
    ///
    /// When one group is a subset of another, the subset is augmented with
    /// the branch transitions of the choice splits that separate it from
    /// its supersets, then re-selected into cliques of the requested
    /// composition; the cliques still covering the original subset replace
    /// it. This turns an ambiguous selection into a full behavioral cut.
    /// Only the binary compositions can be completed; `Sequence` returns
    /// the input unchanged.
    pub fn complete(
        &mut self,
        composition: Composition,
        mut nodes: Vec<Vec<NodeId>>,
    ) -> Vec<Vec<NodeId>> {
        if composition == Composition::Sequence {
            return nodes;
        }

        let dual = composition.opposite();
        let mut i = nodes.len();
        while i > 0 {
            i -= 1;

            let a_groups =
                self.split_groups_of_set(dual, SetOp::Union, SetOp::Intersect, &nodes[i]);
            let mut b_groups = Vec::new();
            for j in 0..nodes.len() {
                if i != j && is_subset(&nodes[i], &nodes[j]) {
                    let bj = difference(&nodes[j], &nodes[i]);
                    let bj_groups =
                        self.split_groups_of_set(dual, SetOp::Union, SetOp::Intersect, &bj);
                    // splits that admit the subset but not the remainder
                    let bj_groups =
                        merge(SetOp::Intersect, SetOp::Difference, &a_groups, &bj_groups);
                    b_groups = merge(SetOp::Union, SetOp::Union, &b_groups, &bj_groups);
                }
            }
            if b_groups.is_empty() {
                continue;
            }

            let branch_kind = match dual {
                Composition::Choice => NodeKind::Transition,
                _ => NodeKind::Place,
            };
            let mut a = nodes[i].clone();
            for g in &b_groups {
                for &b in &g.branches {
                    a.push(NodeId::new(branch_kind, b));
                }
            }
            a.sort();
            a.dedup();

            let original = nodes[i].clone();
            for candidate in self.select(composition, &a, false, true) {
                if is_subset(&original, &candidate) {
                    nodes.push(candidate);
                }
            }
            nodes.remove(i);
        }
        nodes
    }

    /// Flatten a group list back into one sorted, duplicate-free node list.
    pub fn deselect(&self, nodes: &[Vec<NodeId>]) -> Vec<NodeId> {
        nodes
            .iter()
            .flatten()
            .copied()
            .sorted()
            .dedup()
            .collect()
    }

    /// Enumerate every clique (maximal or not) reachable from `nodes` by
    /// adding members of `others` that sustain the relation with every
    /// current member. An empty `others` defaults to all nodes composed
    /// with the seed set.
    pub fn partials(
        &mut self,
        composition: Composition,
        nodes: Vec<NodeId>,
        others: Vec<NodeId>,
    ) -> Vec<Vec<NodeId>> {
        let mut nodes = nodes;
        nodes.sort();
        nodes.dedup();

        let mut others = others;
        if others.is_empty() {
            for kind in [NodeKind::Place, NodeKind::Transition] {
                for i in 0..self.size_of(kind) {
                    let id = NodeId::new(kind, i);
                    if self.is_sets(composition.into(), &[id], &nodes, false) {
                        others.push(id);
                    }
                }
            }
        }

        let mut result: Vec<Vec<NodeId>> = Vec::new();
        let mut queue: VecDeque<(Vec<NodeId>, Vec<NodeId>)> = VecDeque::new();
        queue.push_back((nodes, others));
        while let Some((curr, rest)) = queue.pop_front() {
            let Err(pos) = result.binary_search(&curr) else {
                continue;
            };
            result.insert(pos, curr.clone());
            for (idx, &o) in rest.iter().enumerate() {
                if self.is_sets(composition.into(), &[o], &curr, false) {
                    let mut grown = curr.clone();
                    let ins = grown.binary_search(&o).unwrap_or_else(|e| e);
                    grown.insert(ins, o);
                    let mut remaining = rest.clone();
                    remaining.remove(idx);
                    queue.push_back((grown, remaining));
                }
            }
        }
        result
    }
}
