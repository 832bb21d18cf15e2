//! Split-group fixed point and the composition query layer.
//!
//! [`Graph::compute_split_groups`] annotates every node with the splits
//! whose branches lead to it, one table per binary composition. The
//! computation is a monotone fixed point: each sweep unions the annotations
//! of a node's predecessors into the node's own (excluding the node's own
//! split), then prunes groups that are *complete* -- every branch of the
//! split reached this node, so the split has merged back together -- or not
//! yet *ready* to flow through a synchronizing merge.
//!
//! The readiness rule is what keeps annotations from leaking through
//! partially-merged synchronization: a parallel group may pass a transition
//! only if every input place either carries the same group or sits on a
//! branch of some other split that overlaps without being nested inside the
//! group's split; choice groups are filtered symmetrically at places. On
//! non-properly-nested graphs this rule can drop a group that is present
//! only on some executions ("sometimes conditional"), so queries against
//! such nodes answer as if they were unconditional; a principled recursive
//! test remains future work.
//!
//! On top of the annotations, [`Graph::is`] answers the five relations of
//! [`Relation`] for node pairs and [`Graph::is_sets`] for whole partial
//! states, and the redundancy layer identifies places whose token never
//! adds information.

use crate::composition::{Composition, Relation};
use crate::graph::Graph;
use crate::marking::Token;
use crate::node_id::{NodeId, NodeKind};
use crate::payload::{PlacePayload, TransitionPayload};
use crate::split_group::{SetOp, SplitGroup, compare, merge, merge_inplace};

/// Per-composition cache of node annotations, rebuilt on demand.
#[derive(Clone, Debug, Default)]
pub(crate) struct SplitTable {
    pub ready: bool,
    /// Annotations per node, indexed `[kind][index]`.
    pub groups: [Vec<Vec<SplitGroup>>; 2],
}

impl SplitTable {
    #[inline]
    pub(crate) fn of(&self, node: NodeId) -> &[SplitGroup] {
        &self.groups[node.kind.code()][node.index]
    }
}

/// Kind of the split nodes for a composition: transitions start parallel
/// branches, places start conditional branches.
#[inline]
fn split_kind(composition: Composition) -> NodeKind {
    match composition {
        Composition::Parallel => NodeKind::Transition,
        _ => NodeKind::Place,
    }
}

/// Every group of `gb` is subsumed by a group of `ga` on the same split
/// whose branches are a subset of the `gb` group's branches: any choice
/// that admits the `ga` side also admits the `gb` side.
fn always_implies(ga: &[SplitGroup], gb: &[SplitGroup]) -> bool {
    let (mut i, mut j) = (0usize, 0usize);
    while j < gb.len() {
        while i < ga.len() && ga[i].split < gb[j].split {
            i += 1;
        }
        if i >= ga.len() || ga[i].split != gb[j].split {
            return false;
        }
        let mut k = 0usize;
        for b in &gb[j].branches {
            if k < ga[i].branches.len() && ga[i].branches[k] < *b {
                // a branch of ga not present in gb
                return false;
            }
            if k < ga[i].branches.len() && ga[i].branches[k] == *b {
                k += 1;
            }
        }
        if k < ga[i].branches.len() {
            return false;
        }
        i += 1;
        j += 1;
    }
    true
}

/// Some shared split has disjoint branch sets: the two sides can never
/// occur in the same execution.
fn always_excludes(ga: &[SplitGroup], gb: &[SplitGroup]) -> bool {
    let (mut i, mut j) = (0usize, 0usize);
    while i < ga.len() && j < gb.len() {
        if ga[i].split == gb[j].split {
            let (mut k, mut l) = (0usize, 0usize);
            let mut shared = false;
            while k < ga[i].branches.len() && l < gb[j].branches.len() {
                if ga[i].branches[k] == gb[j].branches[l] {
                    shared = true;
                    break;
                } else if ga[i].branches[k] < gb[j].branches[l] {
                    k += 1;
                } else {
                    l += 1;
                }
            }
            if !shared {
                return true;
            }
            i += 1;
            j += 1;
        } else if ga[i].split < gb[j].split {
            i += 1;
        } else {
            j += 1;
        }
    }
    false
}

/// Sort and deduplicate both sets, then drop their intersection from each
/// side. Keeping the overlap would make a set look composed with itself.
fn symmetric_complement(a: &mut Vec<NodeId>, b: &mut Vec<NodeId>) {
    a.sort();
    a.dedup();
    b.sort();
    b.dedup();
    let shared: Vec<NodeId> = a.iter().copied().filter(|x| b.binary_search(x).is_ok()).collect();
    a.retain(|x| shared.binary_search(x).is_err());
    b.retain(|x| shared.binary_search(x).is_err());
}

impl<P: PlacePayload, T: TransitionPayload, K: Token> Graph<P, T, K> {
    /// Recompute the split-group annotations for one composition.
    ///
    /// Queries call this lazily; it is public so hosts can pay the cost at
    /// a convenient time.
    pub fn compute_split_groups(&mut self, composition: Composition) {
        let nplaces = self.places.len();
        let ntrans = self.transitions.len();

        // Predecessor lists are stable for the whole fixed point.
        let prev_p: Vec<Vec<NodeId>> = (0..nplaces)
            .map(|i| self.prev(NodeId::place(i)))
            .collect();
        let prev_t: Vec<Vec<NodeId>> = (0..ntrans)
            .map(|i| self.prev(NodeId::transition(i)))
            .collect();

        let branch_kind = split_kind(composition).opposite();
        let mut init: Vec<Vec<SplitGroup>> = vec![Vec::new(); self.size_of(branch_kind)];

        if composition == Composition::Parallel {
            // Several reset tokens behave like a parallel split that fired
            // before time zero.
            if let Some(reset) = self.reset.first() {
                let count = reset.tokens.len();
                for t in &reset.tokens {
                    init[t.index()].push(SplitGroup::new(None, t.index(), count));
                }
            }
        }

        let sk = split_kind(composition);
        for i in 0..self.size_of(sk) {
            let n = self.next(NodeId::new(sk, i));
            if n.len() > 1 {
                for s in &n {
                    init[s.index].push(SplitGroup::new(Some(i), s.index, n.len()));
                }
            }
        }

        let mut place_groups: Vec<Vec<SplitGroup>> = vec![Vec::new(); nplaces];
        let mut trans_groups: Vec<Vec<SplitGroup>> = vec![Vec::new(); ntrans];

        let mut sweeps = 0usize;
        loop {
            let mut done = true;
            sweeps += 1;

            for tid in 0..ntrans {
                let exclude = if composition != Composition::Choice {
                    Some(tid)
                } else {
                    None
                };
                let mut group: Vec<SplitGroup> = if composition == Composition::Choice {
                    init[tid].clone()
                } else {
                    Vec::new()
                };
                for p in &prev_t[tid] {
                    merge_inplace(
                        SetOp::Union,
                        SetOp::Union,
                        &mut group,
                        &place_groups[p.index],
                        exclude,
                    );
                }

                let mut j = group.len();
                while j > 0 {
                    j -= 1;
                    // A parallel group closes out when it meets itself and
                    // may only pass a merge once every input participates.
                    let mut found = composition == Composition::Choice
                        || group[j].split != Some(tid);
                    if composition == Composition::Parallel {
                        for p in &prev_t[tid] {
                            if !found {
                                break;
                            }
                            found = false;
                            for l in &place_groups[p.index] {
                                let passes = match (l.split, group[j].split) {
                                    (ls, gs) if ls == gs => true,
                                    (Some(ls), Some(gs)) => compare(
                                        SetOp::Intersect,
                                        SetOp::Difference,
                                        &trans_groups[ls],
                                        &trans_groups[gs],
                                    ),
                                    _ => false,
                                };
                                if passes {
                                    found = true;
                                    break;
                                }
                            }
                        }
                    }
                    if !found || group[j].is_complete() {
                        group.remove(j);
                    }
                }

                if trans_groups[tid] != group {
                    trans_groups[tid] = group;
                    done = false;
                }
            }

            for pid in 0..nplaces {
                let exclude = if composition != Composition::Parallel {
                    Some(pid)
                } else {
                    None
                };
                let mut group: Vec<SplitGroup> = if composition == Composition::Parallel {
                    init[pid].clone()
                } else {
                    Vec::new()
                };
                for t in &prev_p[pid] {
                    merge_inplace(
                        SetOp::Union,
                        SetOp::Union,
                        &mut group,
                        &trans_groups[t.index],
                        exclude,
                    );
                }

                let mut j = group.len();
                while j > 0 {
                    j -= 1;
                    let mut found = true;
                    if composition == Composition::Choice {
                        for t in &prev_p[pid] {
                            if !found {
                                break;
                            }
                            found = false;
                            for l in &trans_groups[t.index] {
                                let passes = match (l.split, group[j].split) {
                                    (ls, gs) if ls == gs => true,
                                    (Some(ls), Some(gs)) => compare(
                                        SetOp::Intersect,
                                        SetOp::Difference,
                                        &place_groups[ls],
                                        &place_groups[gs],
                                    ),
                                    _ => false,
                                };
                                if passes {
                                    found = true;
                                    break;
                                }
                            }
                        }
                    }
                    if !found || group[j].is_complete() {
                        group.remove(j);
                    }
                }

                if place_groups[pid] != group {
                    place_groups[pid] = group;
                    done = false;
                }
            }

            if done {
                break;
            }
        }
        log::trace!(
            "split groups ({composition:?}) converged after {sweeps} sweeps over {} nodes",
            nplaces + ntrans
        );

        let table = &mut self.splits[composition.code()];
        table.groups[NodeKind::Place.code()] = place_groups;
        table.groups[NodeKind::Transition.code()] = trans_groups;
        table.ready = true;
    }

    #[inline]
    pub(crate) fn ensure_split_groups(&mut self, composition: Composition) {
        if !self.splits[composition.code()].ready {
            self.compute_split_groups(composition);
        }
    }

    /// The split-group annotation of one node under one composition,
    /// recomputing the table if a mutation invalidated it.
    pub fn split_groups_of(&mut self, composition: Composition, node: NodeId) -> Vec<SplitGroup> {
        self.ensure_split_groups(composition);
        self.splits[composition.code()].of(node).to_vec()
    }

    /// Fold the annotations of a node set with the given group/branch
    /// operations. An empty set folds to an empty annotation.
    pub fn split_groups_of_set(
        &mut self,
        composition: Composition,
        group_op: SetOp,
        branch_op: SetOp,
        nodes: &[NodeId],
    ) -> Vec<SplitGroup> {
        let Some((&first, rest)) = nodes.split_first() else {
            return Vec::new();
        };
        self.ensure_split_groups(composition);
        let table = &self.splits[composition.code()];
        let mut groups = table.of(first).to_vec();
        for n in rest {
            groups = merge(group_op, branch_op, &groups, table.of(*n));
        }
        groups
    }

    /// Complement every group's branches against the out-neighbors of its
    /// split node: the branches *not* leading to the annotated node.
    pub fn invert(
        &self,
        composition: Composition,
        groups: Vec<SplitGroup>,
    ) -> Vec<SplitGroup> {
        let sk = split_kind(composition);
        let mut groups = groups;
        for g in groups.iter_mut() {
            let n = match g.split {
                Some(s) => self.next(NodeId::new(sk, s)),
                None => Vec::new(),
            };
            let mut branches: Vec<usize> = n
                .iter()
                .map(|x| x.index)
                .filter(|i| !g.branches.contains(i))
                .collect();
            branches.sort_unstable();
            branches.dedup();
            g.branches = branches;
        }
        groups
    }

    // ------------------------------------------------------------------
    // Composition queries
    // ------------------------------------------------------------------

    /// How are two nodes composed?
    ///
    /// With `always = false` the answer is existential: *some* execution
    /// composes the pair this way. With `always = true` the opposite
    /// composition must additionally be impossible (`choice` for
    /// `sequence`), which is what distinguishes "always concurrent" from
    /// "concurrent on the executions where both occur".
    ///
    /// A node is never composed with itself.
    pub fn is(&mut self, relation: Relation, a: NodeId, b: NodeId, always: bool) -> bool {
        if always {
            return match relation {
                Relation::Sequence => {
                    self.is(Relation::Sequence, a, b, false) && !self.is(Relation::Choice, a, b, false)
                }
                Relation::Choice => {
                    self.is(Relation::Choice, a, b, false)
                        && !self.is(Relation::Parallel, a, b, false)
                }
                Relation::Parallel => {
                    self.is(Relation::Parallel, a, b, false)
                        && !self.is(Relation::Choice, a, b, false)
                }
                Relation::Implies => {
                    if a == b {
                        return false;
                    }
                    let ga = self.split_groups_of(Composition::Choice, a);
                    let gb = self.split_groups_of(Composition::Choice, b);
                    always_implies(&ga, &gb) && !always_excludes(&ga, &gb)
                }
                Relation::Excludes => {
                    if a == b {
                        return false;
                    }
                    let ga = self.split_groups_of(Composition::Choice, a);
                    let gb = self.split_groups_of(Composition::Choice, b);
                    always_excludes(&ga, &gb) && !always_implies(&ga, &gb)
                }
            };
        }

        if a == b {
            return false;
        }
        match relation {
            Relation::Sequence => {
                let pa = self.split_groups_of(Composition::Parallel, a);
                let pb = self.split_groups_of(Composition::Parallel, b);
                let ca = self.split_groups_of(Composition::Choice, a);
                let cb = self.split_groups_of(Composition::Choice, b);
                compare(SetOp::Intersect, SetOp::SubsetEqual, &pa, &pb)
                    && compare(SetOp::Intersect, SetOp::SubsetEqual, &ca, &cb)
            }
            Relation::Choice | Relation::Parallel => {
                let c = if relation == Relation::Choice {
                    Composition::Choice
                } else {
                    Composition::Parallel
                };
                let ga = self.split_groups_of(c, a);
                let gb = self.split_groups_of(c, b);
                compare(SetOp::Intersect, SetOp::Difference, &ga, &gb)
            }
            Relation::Implies => {
                let ga = self.split_groups_of(Composition::Choice, a);
                let gb = self.split_groups_of(Composition::Choice, b);
                !always_excludes(&ga, &gb)
            }
            Relation::Excludes => {
                let ga = self.split_groups_of(Composition::Choice, a);
                let gb = self.split_groups_of(Composition::Choice, b);
                !always_implies(&ga, &gb)
            }
        }
    }

    /// How are two partial states composed?
    ///
    /// The sets are sorted, deduplicated and stripped of their shared
    /// nodes, then each side is folded into one aggregate annotation:
    /// group-intersected/branch-unioned for parallel (splits every member
    /// participates in), group-unioned/branch-intersected for choice
    /// (choices leading to all members). Empty sides answer `false`.
    pub fn is_sets(
        &mut self,
        relation: Relation,
        a: &[NodeId],
        b: &[NodeId],
        always: bool,
    ) -> bool {
        if always {
            return match relation {
                Relation::Sequence => {
                    self.is_sets(Relation::Sequence, a, b, false)
                        && !self.is_sets(Relation::Choice, a, b, false)
                }
                Relation::Choice => {
                    self.is_sets(Relation::Choice, a, b, false)
                        && !self.is_sets(Relation::Parallel, a, b, false)
                }
                Relation::Parallel => {
                    self.is_sets(Relation::Parallel, a, b, false)
                        && !self.is_sets(Relation::Choice, a, b, false)
                }
                Relation::Implies | Relation::Excludes => {
                    let mut a = a.to_vec();
                    let mut b = b.to_vec();
                    symmetric_complement(&mut a, &mut b);
                    if a.is_empty() || b.is_empty() {
                        return false;
                    }
                    let ga = self.split_groups_of_set(
                        Composition::Choice,
                        SetOp::Union,
                        SetOp::Intersect,
                        &a,
                    );
                    let gb = self.split_groups_of_set(
                        Composition::Choice,
                        SetOp::Union,
                        SetOp::Intersect,
                        &b,
                    );
                    if relation == Relation::Implies {
                        always_implies(&ga, &gb) && !always_excludes(&ga, &gb)
                    } else {
                        always_excludes(&ga, &gb) && !always_implies(&ga, &gb)
                    }
                }
            };
        }

        let mut a = a.to_vec();
        let mut b = b.to_vec();
        symmetric_complement(&mut a, &mut b);
        if a.is_empty() || b.is_empty() {
            return false;
        }

        match relation {
            Relation::Sequence => {
                let pa = self.split_groups_of_set(
                    Composition::Parallel,
                    SetOp::Intersect,
                    SetOp::Union,
                    &a,
                );
                let pb = self.split_groups_of_set(
                    Composition::Parallel,
                    SetOp::Intersect,
                    SetOp::Union,
                    &b,
                );
                let ca = self.split_groups_of_set(
                    Composition::Choice,
                    SetOp::Union,
                    SetOp::Intersect,
                    &a,
                );
                let cb = self.split_groups_of_set(
                    Composition::Choice,
                    SetOp::Union,
                    SetOp::Intersect,
                    &b,
                );
                compare(SetOp::Intersect, SetOp::SubsetEqual, &pa, &pb)
                    && compare(SetOp::Intersect, SetOp::SubsetEqual, &ca, &cb)
            }
            Relation::Parallel => {
                let ga = self.split_groups_of_set(
                    Composition::Parallel,
                    SetOp::Intersect,
                    SetOp::Union,
                    &a,
                );
                let gb = self.split_groups_of_set(
                    Composition::Parallel,
                    SetOp::Intersect,
                    SetOp::Union,
                    &b,
                );
                compare(SetOp::Intersect, SetOp::Difference, &ga, &gb)
            }
            Relation::Choice => {
                let ga = self.split_groups_of_set(
                    Composition::Choice,
                    SetOp::Union,
                    SetOp::Intersect,
                    &a,
                );
                let gb = self.split_groups_of_set(
                    Composition::Choice,
                    SetOp::Union,
                    SetOp::Intersect,
                    &b,
                );
                compare(SetOp::Intersect, SetOp::Difference, &ga, &gb)
            }
            Relation::Implies | Relation::Excludes => {
                let ga = self.split_groups_of_set(
                    Composition::Choice,
                    SetOp::Union,
                    SetOp::Intersect,
                    &a,
                );
                let gb = self.split_groups_of_set(
                    Composition::Choice,
                    SetOp::Union,
                    SetOp::Intersect,
                    &b,
                );
                if relation == Relation::Implies {
                    !always_excludes(&ga, &gb)
                } else {
                    !always_implies(&ga, &gb)
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Redundancy
    // ------------------------------------------------------------------

    /// A place is redundant to another when both are parallel-composed, no
    /// neighbor of the first is parallel with the second, and reset
    /// membership does not distinguish them. A token in such a place never
    /// constrains behavior beyond what its witness already does.
    pub fn is_redundant_to(&mut self, p0: NodeId, p1: NodeId) -> bool {
        if p0 == p1 || !self.is(Relation::Parallel, p0, p1, false) {
            return false;
        }

        for n in self.neighbors(p0) {
            if self.is(Relation::Parallel, n, p1, false) {
                return false;
            }
        }

        if !self.is_reset(p0) {
            if self.is_reset(p1) {
                return false;
            }
            let reset_places: Vec<NodeId> = self
                .reset
                .iter()
                .flat_map(|m| m.tokens.iter().map(|t| NodeId::place(t.index())))
                .collect();
            for p in reset_places {
                if p != p0
                    && p != p1
                    && self.is(Relation::Parallel, p0, p, false)
                    && self.is(Relation::Sequence, p1, p, false)
                {
                    return false;
                }
            }
        }

        true
    }

    /// True if `p0` is redundant to any place in the set.
    pub fn is_redundant_to_any(&mut self, p0: NodeId, p1: &[NodeId]) -> bool {
        for &p in p1 {
            if self.is_redundant_to(p0, p) {
                return true;
            }
        }
        false
    }

    /// True if `p0` is redundant to any place in the graph.
    pub fn is_redundant(&mut self, p0: NodeId) -> bool {
        for i in 0..self.places.len() {
            if self.is_redundant_to(p0, NodeId::place(i)) {
                return true;
            }
        }
        false
    }

    /// Extend a place set with every place redundant to a member.
    pub fn add_redundant(&mut self, mut p: Vec<NodeId>) -> Vec<NodeId> {
        for i in 0..self.places.len() {
            let candidate = NodeId::place(i);
            let snapshot = p.clone();
            if self.is_redundant_to_any(candidate, &snapshot) {
                p.push(candidate);
            }
        }
        p.sort();
        p.dedup();
        p
    }

    /// Erase every redundant place, highest index first.
    pub fn erase_redundant(&mut self) {
        let mut i = self.places.len();
        while i > 0 {
            i -= 1;
            if self.is_redundant(NodeId::place(i)) {
                self.erase(NodeId::place(i));
            }
        }
    }

    /// True if the node set spans the initial marking: some member sits
    /// before the reset point and some member after it, judged from the
    /// initial-marking sentinel groups of the parallel annotation.
    pub fn crosses_reset(&mut self, pos: &[NodeId]) -> bool {
        self.ensure_split_groups(Composition::Parallel);
        let table = &self.splits[Composition::Parallel.code()];

        let mut before_reset = false;
        let mut after_reset = false;
        for i in pos {
            let groups = table.of(*i);
            if i.kind == NodeKind::Transition {
                let found = groups.iter().any(|g| g.split.is_none());
                before_reset = before_reset || !found;
                after_reset = after_reset || found;
            } else {
                let mut found = false;
                for g in groups {
                    if g.split.is_none() {
                        found = true;
                        for b in &g.branches {
                            if *b == i.index {
                                before_reset = true;
                            } else {
                                after_reset = true;
                            }
                        }
                    }
                }
                before_reset = before_reset || !found;
            }
        }
        before_reset && after_reset
    }
}
