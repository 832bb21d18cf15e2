//! The graph store and its structural editors.
//!
//! A [`Graph`] owns two dense payload vectors (places and transitions), two
//! arc lists keyed by source kind, and the three marking sets. Everything
//! else in the crate -- distances, split groups, composition queries -- is
//! derived data, rebuilt lazily after [`Graph::mark_modified`] clears the
//! ready flags. Every mutating editor funnels through that one hook, which
//! is what makes the caches safe by construction.
//!
//! The editors deal in [`NodeId`] handles. Indices are dense and renumber
//! on [`erase`](Graph::erase): an erase shifts every higher index of the
//! erased kind down by one, in the arc lists and in the marking sets.
//! Renumbering is part of the contract, not an implementation detail;
//! operations that fuse or remove nodes return predecessor/successor lists
//! or translation maps so callers can repair the handles they hold.
//!
//! Operations handed an out-of-range id or asked to combine incompatible
//! payloads report through `log::error!` and return `None` -- these are
//! programmer errors and recovery is not supported.

use crate::analysis::SplitTable;
use crate::composition::Composition;
use crate::distance::DistanceMatrix;
use crate::marking::{Marking, Token, TranslationMap};
use crate::node_id::{Arc, ArcId, NodeId, NodeKind};
use crate::payload::{PlacePayload, TransitionPayload};

/// A payload of either kind, for editors that can splice either a place or
/// a transition into the graph.
#[derive(Clone, Debug)]
pub enum NodePayload<P, T> {
    Place(P),
    Transition(T),
}

impl<P: PlacePayload, T: TransitionPayload> NodePayload<P, T> {
    /// The node kind this payload belongs to.
    #[inline]
    pub fn kind(&self) -> NodeKind {
        match self {
            NodePayload::Place(_) => NodeKind::Place,
            NodePayload::Transition(_) => NodeKind::Transition,
        }
    }

    /// A default payload of the given kind.
    #[inline]
    pub fn default_for(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Place => NodePayload::Place(P::default()),
            NodeKind::Transition => NodePayload::Transition(T::default()),
        }
    }
}

/// A bipartite concurrency graph, generic over place/transition payloads
/// and the token type used in markings.
///
/// The payload and marking fields are public: payloads are plain user data
/// and host tools routinely edit the marking sets directly. Anything that
/// changes the *structure* must go through the editor methods (or call
/// [`mark_modified`](Graph::mark_modified) afterwards) so the derived
/// caches are invalidated.
#[derive(Clone, Debug)]
pub struct Graph<P = (), T = (), K = usize> {
    pub places: Vec<P>,
    pub transitions: Vec<T>,
    /// Arc lists keyed by the source node's kind.
    pub(crate) arcs: [Vec<Arc>; 2],
    /// Entry states of the net.
    pub source: Vec<Marking<K>>,
    /// Exit states of the net.
    pub sink: Vec<Marking<K>>,
    /// Initial state(s) assumed on startup.
    pub reset: Vec<Marking<K>>,
    pub(crate) distances: DistanceMatrix,
    /// Split-group tables, one per binary composition (choice, parallel).
    pub(crate) splits: [SplitTable; 2],
}

impl<P, T, K> Default for Graph<P, T, K> {
    fn default() -> Self {
        Self {
            places: Vec::new(),
            transitions: Vec::new(),
            arcs: [Vec::new(), Vec::new()],
            source: Vec::new(),
            sink: Vec::new(),
            reset: Vec::new(),
            distances: DistanceMatrix::default(),
            splits: [SplitTable::default(), SplitTable::default()],
        }
    }
}

impl<P: PlacePayload, T: TransitionPayload, K: Token> Graph<P, T, K> {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate all derived caches (distance matrix and both split-group
    /// tables). Called by every mutating editor; call it yourself after
    /// editing the public fields structurally.
    pub fn mark_modified(&mut self) {
        self.distances.ready = false;
        self.splits[0].ready = false;
        self.splits[1].ready = false;
    }

    /// Total node count.
    #[inline]
    pub fn size(&self) -> usize {
        self.places.len() + self.transitions.len()
    }

    /// Node count of one kind.
    #[inline]
    pub fn size_of(&self, kind: NodeKind) -> usize {
        match kind {
            NodeKind::Place => self.places.len(),
            NodeKind::Transition => self.transitions.len(),
        }
    }

    /// Iterator over all node ids of one kind, in index order.
    pub fn node_ids(&self, kind: NodeKind) -> impl Iterator<Item = NodeId> + use<P, T, K> {
        (0..self.size_of(kind)).map(move |i| NodeId::new(kind, i))
    }

    /// The arc list whose sources have the given kind.
    #[inline]
    pub fn arcs(&self, kind: NodeKind) -> &[Arc] {
        &self.arcs[kind.code()]
    }

    /// The arc behind an [`ArcId`].
    #[inline]
    pub fn arc(&self, a: ArcId) -> Arc {
        self.arcs[a.kind.code()][a.index]
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Append one default node of the given kind.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        match kind {
            NodeKind::Place => self.create_place(P::default()),
            NodeKind::Transition => self.create_transition(T::default()),
        }
    }

    /// Append `num` default nodes of the given kind.
    pub fn create_many(&mut self, kind: NodeKind, num: usize) -> Vec<NodeId> {
        (0..num).map(|_| self.create(kind)).collect()
    }

    /// Append a place with an explicit payload.
    pub fn create_place(&mut self, p: P) -> NodeId {
        self.mark_modified();
        self.places.push(p);
        NodeId::place(self.places.len() - 1)
    }

    /// Append a transition with an explicit payload.
    pub fn create_transition(&mut self, t: T) -> NodeId {
        self.mark_modified();
        self.transitions.push(t);
        NodeId::transition(self.transitions.len() - 1)
    }

    /// Append a node of either kind.
    pub fn create_node(&mut self, n: NodePayload<P, T>) -> NodeId {
        match n {
            NodePayload::Place(p) => self.create_place(p),
            NodePayload::Transition(t) => self.create_transition(t),
        }
    }

    // ------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------

    /// Add an arc `from -> to`, returning `to`.
    ///
    /// When both endpoints have the same kind, an anonymous node of the
    /// opposite kind is inserted between them to keep the graph bipartite.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> NodeId {
        if from.kind == to.kind {
            let mid = self.create(from.kind.opposite());
            self.arcs[from.kind.code()].push(Arc::new(from, mid));
            self.arcs[mid.kind.code()].push(Arc::new(mid, to));
        } else {
            self.mark_modified();
            self.arcs[from.kind.code()].push(Arc::new(from, to));
        }
        to
    }

    /// Connect one source to every listed target.
    pub fn connect_to_all(&mut self, from: NodeId, to: &[NodeId]) {
        for &t in to {
            self.connect(from, t);
        }
    }

    /// Connect every listed source to one target.
    pub fn connect_from_all(&mut self, from: &[NodeId], to: NodeId) {
        for &f in from {
            self.connect(f, to);
        }
    }

    /// Connect every source to every target (cross product).
    pub fn connect_all(&mut self, from: &[NodeId], to: &[NodeId]) {
        for &f in from {
            for &t in to {
                self.connect(f, t);
            }
        }
    }

    /// Connect consecutive nodes along a path.
    pub fn connect_sequence(&mut self, nodes: &[NodeId]) {
        for w in nodes.windows(2) {
            self.connect(w[0], w[1]);
        }
    }

    /// Add a prebuilt arc (with the same auto-mediation as `connect`).
    pub fn connect_arc(&mut self, a: Arc) -> NodeId {
        self.connect(a.from, a.to)
    }

    /// Create a node and connect it after `from`. Returns the new node.
    pub fn push_back(&mut self, from: NodeId, n: NodePayload<P, T>) -> NodeId {
        let node = self.create_node(n);
        self.connect(from, node)
    }

    /// Create a node and connect it before `to`. Returns the new node.
    pub fn push_front(&mut self, to: NodeId, n: NodePayload<P, T>) -> NodeId {
        let node = self.create_node(n);
        self.connect(node, to);
        node
    }

    /// Remove one arc.
    pub fn disconnect(&mut self, a: ArcId) {
        self.mark_modified();
        self.arcs[a.kind.code()].remove(a.index);
    }

    // ------------------------------------------------------------------
    // Erasure
    // ------------------------------------------------------------------

    /// Remove a node, its arcs, and (for places) its marking tokens,
    /// compacting the index range of its kind.
    ///
    /// Returns the predecessors and successors the node had, so callers
    /// can reconnect around the hole. Those ids are of the opposite kind
    /// and survive the renumbering unchanged.
    pub fn erase(&mut self, n: NodeId) -> (Vec<NodeId>, Vec<NodeId>) {
        self.mark_modified();
        let k = n.kind.code();
        let o = n.kind.opposite().code();
        let mut preds = Vec::new();
        let mut succs = Vec::new();

        let mut i = self.arcs[k].len();
        while i > 0 {
            i -= 1;
            if self.arcs[k][i].from.index == n.index {
                succs.push(self.arcs[k][i].to);
                self.arcs[k].remove(i);
            } else if self.arcs[k][i].from.index > n.index {
                self.arcs[k][i].from.index -= 1;
            }
        }
        let mut i = self.arcs[o].len();
        while i > 0 {
            i -= 1;
            if self.arcs[o][i].to.index == n.index {
                preds.push(self.arcs[o][i].from);
                self.arcs[o].remove(i);
            } else if self.arcs[o][i].to.index > n.index {
                self.arcs[o][i].to.index -= 1;
            }
        }

        if n.kind == NodeKind::Place {
            Self::erase_from_markings(n, &mut self.source);
            Self::erase_from_markings(n, &mut self.reset);
            Self::erase_from_markings(n, &mut self.sink);
        }

        match n.kind {
            NodeKind::Place => {
                self.places.remove(n.index);
            }
            NodeKind::Transition => {
                self.transitions.remove(n.index);
            }
        }
        (preds, succs)
    }

    /// Erase several nodes. Sorted highest-index-first internally so each
    /// removal leaves the remaining targets' indices valid.
    pub fn erase_all(&mut self, nodes: &[NodeId]) {
        let mut sorted = nodes.to_vec();
        sorted.sort();
        sorted.reverse();
        for n in sorted {
            self.erase(n);
        }
    }

    /// Repair a caller-held id list after `n` has been erased: drop ids
    /// equal to `n` and shift same-kind ids above it down by one.
    pub fn erase_from_ids(n: NodeId, ids: &mut Vec<NodeId>) {
        let mut i = ids.len();
        while i > 0 {
            i -= 1;
            if ids[i] == n {
                ids.remove(i);
            } else if ids[i].kind == n.kind && ids[i].index > n.index {
                ids[i].index -= 1;
            }
        }
    }

    /// Repair a caller-held marking list after place `n` has been erased.
    /// No-op when `n` is a transition.
    pub fn erase_from_markings(n: NodeId, markings: &mut Vec<Marking<K>>) {
        if n.kind != NodeKind::Place {
            return;
        }
        for m in markings.iter_mut() {
            let mut i = m.tokens.len();
            while i > 0 {
                i -= 1;
                if m.tokens[i].index() == n.index {
                    m.tokens.remove(i);
                } else if m.tokens[i].index() > n.index {
                    let idx = m.tokens[i].index() - 1;
                    m.tokens[i].set_index(idx);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Copying and combining
    // ------------------------------------------------------------------

    /// Append a duplicate of a node's payload.
    ///
    /// For places, every source/sink/reset token at the original index is
    /// duplicated to reference the new index as well, so the copy inherits
    /// the original's marking membership.
    pub fn copy(&mut self, i: NodeId) -> Option<NodeId> {
        let copies = self.copy_many(i, 1);
        copies.first().copied()
    }

    /// Append `num` duplicates of a node's payload.
    pub fn copy_many(&mut self, i: NodeId, num: usize) -> Vec<NodeId> {
        let mut result = Vec::new();
        match i.kind {
            NodeKind::Place if i.index < self.places.len() => {
                for _ in 0..num {
                    self.mark_modified();
                    self.places.push(self.places[i.index].clone());
                    result.push(NodeId::place(self.places.len() - 1));
                }
                for markings in [&mut self.source, &mut self.reset, &mut self.sink] {
                    for m in markings.iter_mut() {
                        let matching: Vec<K> = m
                            .tokens
                            .iter()
                            .filter(|t| t.index() == i.index)
                            .cloned()
                            .collect();
                        for tok in matching {
                            for r in &result {
                                let mut dup = tok.clone();
                                dup.set_index(r.index);
                                m.tokens.push(dup);
                            }
                        }
                    }
                }
            }
            NodeKind::Transition if i.index < self.transitions.len() => {
                for _ in 0..num {
                    self.mark_modified();
                    self.transitions.push(self.transitions[i.index].clone());
                    result.push(NodeId::transition(self.transitions.len() - 1));
                }
            }
            _ => {
                log::error!("copy: node id {i} out of range");
            }
        }
        result
    }

    /// Copy several nodes, `num` duplicates each.
    pub fn copy_each(&mut self, nodes: &[NodeId], num: usize) -> Vec<NodeId> {
        let mut result = Vec::new();
        for &n in nodes {
            result.extend(self.copy_many(n, num));
        }
        result
    }

    /// Append a new node whose payload is the merge of two nodes' payloads
    /// under `composition`. Both inputs must have the same kind.
    pub fn copy_combine(
        &mut self,
        composition: Composition,
        i0: NodeId,
        i1: NodeId,
    ) -> Option<NodeId> {
        if i0.is_place() && i1.is_place() {
            if i0.index >= self.places.len() || i1.index >= self.places.len() {
                log::error!("copy_combine: node id out of range ({i0}, {i1})");
                return None;
            }
            let merged = P::merge(composition, &self.places[i0.index], &self.places[i1.index]);
            Some(self.create_place(merged))
        } else if i0.is_transition() && i1.is_transition() {
            if i0.index >= self.transitions.len() || i1.index >= self.transitions.len() {
                log::error!("copy_combine: node id out of range ({i0}, {i1})");
                return None;
            }
            if !T::mergeable(
                composition,
                &self.transitions[i0.index],
                &self.transitions[i1.index],
            ) {
                log::error!("copy_combine: transitions {i0} and {i1} are not mergeable");
                return None;
            }
            let merged = T::merge(
                composition,
                &self.transitions[i0.index],
                &self.transitions[i1.index],
            );
            Some(self.create_transition(merged))
        } else {
            log::error!("copy_combine: node kinds do not match ({i0}, {i1})");
            None
        }
    }

    /// Merge the payload of `i1` into `i0` under `composition`, in place.
    /// Both inputs must have the same kind. Returns `i0`.
    pub fn combine(&mut self, composition: Composition, i0: NodeId, i1: NodeId) -> Option<NodeId> {
        if i0.is_place() && i1.is_place() {
            if i0.index >= self.places.len() || i1.index >= self.places.len() {
                log::error!("combine: node id out of range ({i0}, {i1})");
                return None;
            }
            self.places[i0.index] =
                P::merge(composition, &self.places[i0.index], &self.places[i1.index]);
            Some(i0)
        } else if i0.is_transition() && i1.is_transition() {
            if i0.index >= self.transitions.len() || i1.index >= self.transitions.len() {
                log::error!("combine: node id out of range ({i0}, {i1})");
                return None;
            }
            if !T::mergeable(
                composition,
                &self.transitions[i0.index],
                &self.transitions[i1.index],
            ) {
                log::error!("combine: transitions {i0} and {i1} are not mergeable");
                return None;
            }
            self.transitions[i0.index] = T::merge(
                composition,
                &self.transitions[i0.index],
                &self.transitions[i1.index],
            );
            Some(i0)
        } else {
            log::error!("combine: node kinds do not match ({i0}, {i1})");
            None
        }
    }

    // ------------------------------------------------------------------
    // Splicing
    // ------------------------------------------------------------------

    /// Splice a node into an existing arc: `from -> new pair -> to`.
    ///
    /// A mediator of the opposite kind is created alongside the payload
    /// node so the arc stays alternating. Returns the payload node.
    pub fn insert(&mut self, a: ArcId, n: NodePayload<P, T>) -> NodeId {
        let payload_kind = n.kind();
        let ip = match &n {
            NodePayload::Place(p) => self.create_place(p.clone()),
            NodePayload::Transition(_) => self.create(NodeKind::Place),
        };
        let it = match n {
            NodePayload::Transition(t) => self.create_transition(t),
            NodePayload::Place(_) => self.create(NodeKind::Transition),
        };
        let by_kind = |kind: NodeKind| match kind {
            NodeKind::Place => ip,
            NodeKind::Transition => it,
        };

        let k = a.kind.code();
        let o = a.kind.opposite().code();
        let old_to = self.arcs[k][a.index].to;
        let same = by_kind(a.kind);
        let opp = by_kind(a.kind.opposite());
        self.arcs[k].push(Arc::new(same, old_to));
        self.arcs[o].push(Arc::new(opp, same));
        self.arcs[k][a.index].to = opp;
        by_kind(payload_kind)
    }

    /// Splice a node in front of `to`: every arc into `to` is rerouted
    /// through the new pair. Returns the payload node.
    pub fn insert_before(&mut self, to: NodeId, n: NodePayload<P, T>) -> NodeId {
        let payload_kind = n.kind();
        let it = match &n {
            NodePayload::Transition(t) => self.create_transition(t.clone()),
            NodePayload::Place(_) => self.create(NodeKind::Transition),
        };
        let ip = match n {
            NodePayload::Place(p) => self.create_place(p),
            NodePayload::Transition(_) => self.create(NodeKind::Place),
        };
        let by_kind = |kind: NodeKind| match kind {
            NodeKind::Place => ip,
            NodeKind::Transition => it,
        };

        let same = by_kind(to.kind);
        let opp = by_kind(to.kind.opposite());
        let o = to.kind.opposite().code();
        for arc in self.arcs[o].iter_mut() {
            if arc.to.index == to.index {
                arc.to.index = same.index;
            }
        }
        self.connect(opp, to);
        self.connect(same, opp);
        by_kind(payload_kind)
    }

    /// Splice a node after `from`: every arc out of `from` is rerouted
    /// through the new pair. Returns the payload node.
    pub fn insert_after(&mut self, from: NodeId, n: NodePayload<P, T>) -> NodeId {
        let payload_kind = n.kind();
        let it = match &n {
            NodePayload::Transition(t) => self.create_transition(t.clone()),
            NodePayload::Place(_) => self.create(NodeKind::Transition),
        };
        let ip = match n {
            NodePayload::Place(p) => self.create_place(p),
            NodePayload::Transition(_) => self.create(NodeKind::Place),
        };
        let by_kind = |kind: NodeKind| match kind {
            NodeKind::Place => ip,
            NodeKind::Transition => it,
        };

        let same = by_kind(from.kind);
        let opp = by_kind(from.kind.opposite());
        let k = from.kind.code();
        for arc in self.arcs[k].iter_mut() {
            if arc.from.index == from.index {
                arc.from.index = same.index;
            }
        }
        self.connect(from, opp);
        self.connect(opp, same);
        by_kind(payload_kind)
    }

    /// Add a node on a fresh path between `from` and `to`, mediating with
    /// opposite-kind nodes where the kinds collide. Returns the new node.
    pub fn insert_alongside(&mut self, from: NodeId, to: NodeId, n: NodePayload<P, T>) -> NodeId {
        let i = self.create_node(n);
        if from.kind == i.kind {
            let j = self.create(i.kind.opposite());
            self.connect(from, j);
            self.connect(j, i);
        } else {
            self.connect(from, i);
        }
        if to.kind == i.kind {
            let j = self.create(i.kind.opposite());
            self.connect(i, j);
            self.connect(j, to);
        } else {
            self.connect(i, to);
        }
        i
    }

    /// Insert a transition in front of a set of target nodes, rerouting
    /// every arc into each target through it.
    pub fn insert_at(&mut self, to: &[NodeId], n: T) -> NodeId {
        let t = self.create_transition(n);
        for &i in to {
            let p = if i.kind == NodeKind::Place {
                let p = self.create(NodeKind::Place);
                self.connect(p, t);
                p
            } else {
                t
            };
            let o = i.kind.opposite().code();
            for arc in self.arcs[o].iter_mut() {
                if arc.to.index == i.index {
                    arc.to.index = p.index;
                }
            }
            self.connect(t, i);
        }
        t
    }

    // ------------------------------------------------------------------
    // Duplication
    // ------------------------------------------------------------------

    /// Duplicate a node under a composition.
    ///
    /// When the node is a split point of the requested composition
    /// (transition for choice, place for parallel) the copy simply shares
    /// all of the original's arcs, adding one more branch. Otherwise, with
    /// `add` set, the node and its copy are wrapped in a local four-mediator
    /// sub-structure that splits before them and merges after them; with
    /// `add` clear, every neighbor is duplicated instead and the copy is
    /// wired to the duplicated neighborhood.
    pub fn duplicate(&mut self, composition: Composition, i: NodeId, add: bool) -> NodeId {
        let Some(d) = self.copy(i) else {
            return i;
        };
        let k = i.kind.code();
        let o = i.kind.opposite().code();
        if (i.kind == NodeKind::Transition && composition == Composition::Choice)
            || (i.kind == NodeKind::Place && composition == Composition::Parallel)
        {
            let mut j = self.arcs[k].len();
            while j > 0 {
                j -= 1;
                if self.arcs[k][j].from == i {
                    let to = self.arcs[k][j].to;
                    self.connect(d, to);
                }
            }
            let mut j = self.arcs[o].len();
            while j > 0 {
                j -= 1;
                if self.arcs[o][j].to == i {
                    let from = self.arcs[o][j].from;
                    self.connect(from, d);
                }
            }
        } else if add {
            let x = self.create_many(i.kind.opposite(), 4);
            let y = self.create_many(i.kind, 2);

            for arc in self.arcs[k].iter_mut() {
                if arc.from == i {
                    arc.from = y[1];
                }
            }
            for arc in self.arcs[o].iter_mut() {
                if arc.to == i {
                    arc.to = y[0];
                }
            }

            self.connect(y[0], x[0]);
            self.connect(y[0], x[1]);
            self.connect(x[0], i);
            self.connect(x[1], d);
            self.connect(i, x[2]);
            self.connect(d, x[3]);
            self.connect(x[2], y[1]);
            self.connect(x[3], y[1]);
        } else {
            let n = self.next(i);
            let p = self.prev(i);
            for list in self.arcs.iter_mut() {
                list.retain(|a| a.from != i && a.to != i);
            }
            self.mark_modified();

            let n1: Vec<NodeId> = n
                .iter()
                .map(|&x| self.duplicate(composition, x, true))
                .collect();
            let p1: Vec<NodeId> = p
                .iter()
                .map(|&x| self.duplicate(composition, x, true))
                .collect();

            self.connect_from_all(&p1, d);
            self.connect_to_all(d, &n1);
            self.connect_from_all(&p, i);
            self.connect_to_all(i, &n);
        }
        d
    }

    /// Duplicate a node into `num` total copies (the original included,
    /// returned last). See [`duplicate`](Graph::duplicate) for the three
    /// wiring strategies.
    pub fn duplicate_n(
        &mut self,
        composition: Composition,
        i: NodeId,
        num: usize,
        add: bool,
    ) -> Vec<NodeId> {
        if num == 0 {
            return Vec::new();
        }
        let mut d = self.copy_many(i, num - 1);
        let k = i.kind.code();
        let o = i.kind.opposite().code();

        if (i.kind == NodeKind::Transition && composition == Composition::Choice)
            || (i.kind == NodeKind::Place && composition == Composition::Parallel)
        {
            let mut j = self.arcs[k].len();
            while j > 0 {
                j -= 1;
                if self.arcs[k][j].from == i {
                    let to = self.arcs[k][j].to;
                    for idx in 0..d.len() {
                        let dk = d[idx];
                        self.connect(dk, to);
                    }
                }
            }
            let mut j = self.arcs[o].len();
            while j > 0 {
                j -= 1;
                if self.arcs[o][j].to == i {
                    let from = self.arcs[o][j].from;
                    for idx in 0..d.len() {
                        let dk = d[idx];
                        self.connect(from, dk);
                    }
                }
            }
        } else if add {
            let x = self.create_many(i.kind.opposite(), 2 * (num - 1));
            let y = self.create_many(i.kind, 2);
            let z = self.create_many(i.kind.opposite(), 2);

            for arc in self.arcs[k].iter_mut() {
                if arc.from == i {
                    arc.from = y[1];
                }
            }
            for arc in self.arcs[o].iter_mut() {
                if arc.to == i {
                    arc.to = y[0];
                }
            }

            self.connect(y[0], z[0]);
            self.connect(z[0], i);
            self.connect(i, z[1]);
            self.connect(z[1], y[1]);

            for kk in 0..d.len() {
                self.connect(y[0], x[kk * 2]);
                self.connect(x[kk * 2], d[kk]);
                self.connect(d[kk], x[kk * 2 + 1]);
                self.connect(x[kk * 2 + 1], y[1]);
            }
        } else {
            let n = self.next(i);
            let p = self.prev(i);
            for list in self.arcs.iter_mut() {
                list.retain(|a| a.from != i && a.to != i);
            }
            self.mark_modified();

            for kk in 0..num - 1 {
                let n1: Vec<NodeId> = n
                    .iter()
                    .map(|&x| self.duplicate(composition, x, true))
                    .collect();
                let p1: Vec<NodeId> = p
                    .iter()
                    .map(|&x| self.duplicate(composition, x, true))
                    .collect();
                self.connect_from_all(&p1, d[kk]);
                self.connect_to_all(d[kk], &n1);
            }
            self.connect_from_all(&p, i);
            self.connect_to_all(i, &n);
        }

        d.push(i);
        d
    }

    /// Duplicate each listed node `num` times. With `interleaved`, the
    /// copies of later nodes are woven between the copies of earlier ones
    /// so that position `j` of every node's copy-list lines up.
    pub fn duplicate_each(
        &mut self,
        composition: Composition,
        nodes: &[NodeId],
        num: usize,
        interleaved: bool,
        add: bool,
    ) -> Vec<NodeId> {
        let mut result: Vec<NodeId> = Vec::with_capacity(nodes.len() * num);
        for (i, &node) in nodes.iter().enumerate() {
            let temp = self.duplicate_n(composition, node, num, add);
            if interleaved && i > 0 {
                for (j, &t) in temp.iter().enumerate() {
                    result.insert(j * (i + 1) + 1, t);
                }
            } else {
                result.extend(temp);
            }
        }
        result
    }

    /// Contract a node into the cross product of its predecessors and
    /// successors, merging each pred/succ pair under sequence composition.
    ///
    /// Returns a map from the removed duplicate ids to the surviving ids;
    /// externally held ids for the erased region must be chased through it.
    pub fn pinch(&mut self, n: NodeId) -> TranslationMap {
        let (preds, succs) = self.erase(n);
        let composition = match n.kind {
            NodeKind::Place => Composition::Choice,
            NodeKind::Transition => Composition::Parallel,
        };

        let mut left = self.duplicate_each(composition, &preds, succs.len(), false, true);
        let right = self.duplicate_each(composition, &succs, preds.len(), true, true);

        for i in 0..right.len() {
            if i >= left.len() {
                break;
            }
            let _ = self.combine(Composition::Sequence, left[i], right[i]);

            let rk = right[i].kind.code();
            let ro = right[i].kind.opposite().code();
            for arc in self.arcs[rk].iter_mut() {
                if arc.from == right[i] {
                    arc.from = left[i];
                }
            }
            for arc in self.arcs[ro].iter_mut() {
                if arc.to == right[i] {
                    arc.to = left[i];
                }
            }

            if right[i].kind == NodeKind::Place {
                for markings in [&mut self.source, &mut self.reset, &mut self.sink] {
                    for m in markings.iter_mut() {
                        let matching: Vec<K> = m
                            .tokens
                            .iter()
                            .filter(|t| t.index() == right[i].index)
                            .cloned()
                            .collect();
                        for tok in matching {
                            let mut dup = tok.clone();
                            dup.set_index(left[i].index);
                            m.tokens.push(dup);
                        }
                    }
                }
            }
        }

        let mut removal = right.clone();
        removal.sort();
        removal.reverse();
        for &r in &removal {
            self.erase(r);
        }
        for &r in &removal {
            Self::erase_from_ids(r, &mut left);
        }

        let mut map = TranslationMap::new();
        for i in 0..left.len().min(right.len()) {
            map.insert(right[i], vec![left[i]]);
        }
        map
    }

    /// Join a set of `from` markings onto a set of `to` markings.
    ///
    /// Multi-place target markings are reached through a fresh mediator
    /// transition; single-place targets are absorbed into the `from` places
    /// by choice-merging payloads. With `outward` the arcs run from the
    /// targets toward `from` instead. Used to glue incomplete graphs.
    ///
    /// Returns the `from` markings, repaired for any erased places.
    pub fn consolidate(
        &mut self,
        to: &[Marking<K>],
        from: Vec<Marking<K>>,
        outward: bool,
    ) -> Vec<Marking<K>> {
        let mut from = from;
        if from.is_empty() {
            let p = self.create(NodeKind::Place);
            from.push(Marking::from_indices(&[p.index]));
        }
        let mut rem: Vec<NodeId> = Vec::new();

        for k in 0..from.len() {
            let con: Vec<NodeId> = from[k]
                .tokens
                .iter()
                .map(|t| NodeId::place(t.index()))
                .collect();
            for m in to {
                if m.tokens.len() > 1 {
                    let t = self.create(NodeKind::Transition);
                    if outward {
                        self.connect_to_all(t, &con);
                        for tok in &m.tokens {
                            self.connect(NodeId::place(tok.index()), t);
                        }
                    } else {
                        self.connect_from_all(&con, t);
                        for tok in &m.tokens {
                            self.connect(t, NodeId::place(tok.index()));
                        }
                    }
                } else if m.tokens.len() == 1 {
                    let loc = NodeId::place(m.tokens[0].index());
                    let pv = self.prev(loc);
                    let nx = self.next(loc);
                    self.connect_all(&pv, &con);
                    self.connect_all(&con, &nx);
                    for c in &con {
                        self.places[c.index] = P::merge(
                            Composition::Choice,
                            &self.places[c.index],
                            &self.places[loc.index],
                        );
                    }
                    rem.push(loc);
                }
            }
        }

        rem.sort();
        rem.dedup();
        for &r in rem.iter().rev() {
            self.erase(r);
            Self::erase_from_markings(r, &mut from);
        }
        from
    }

    // ------------------------------------------------------------------
    // Structural queries
    // ------------------------------------------------------------------

    /// Successor nodes (duplicates kept when parallel arcs exist).
    pub fn next(&self, n: NodeId) -> Vec<NodeId> {
        self.arcs[n.kind.code()]
            .iter()
            .filter(|a| a.from.index == n.index)
            .map(|a| a.to)
            .collect()
    }

    /// Successors of every listed node, concatenated.
    pub fn next_all(&self, nodes: &[NodeId]) -> Vec<NodeId> {
        nodes.iter().flat_map(|&n| self.next(n)).collect()
    }

    /// Predecessor nodes.
    pub fn prev(&self, n: NodeId) -> Vec<NodeId> {
        self.arcs[n.kind.opposite().code()]
            .iter()
            .filter(|a| a.to.index == n.index)
            .map(|a| a.from)
            .collect()
    }

    /// Predecessors of every listed node, concatenated.
    pub fn prev_all(&self, nodes: &[NodeId]) -> Vec<NodeId> {
        nodes.iter().flat_map(|&n| self.prev(n)).collect()
    }

    /// Predecessors followed by successors.
    pub fn neighbors(&self, n: NodeId) -> Vec<NodeId> {
        let mut result = self.prev(n);
        result.extend(self.next(n));
        result
    }

    /// Ids of the arcs leaving a node.
    pub fn out_arcs(&self, n: NodeId) -> Vec<ArcId> {
        self.arcs[n.kind.code()]
            .iter()
            .enumerate()
            .filter(|(_, a)| a.from.index == n.index)
            .map(|(i, _)| ArcId::new(n.kind, i))
            .collect()
    }

    /// Ids of the arcs entering a node.
    pub fn in_arcs(&self, n: NodeId) -> Vec<ArcId> {
        let o = n.kind.opposite();
        self.arcs[o.code()]
            .iter()
            .enumerate()
            .filter(|(_, a)| a.to.index == n.index)
            .map(|(i, _)| ArcId::new(o, i))
            .collect()
    }

    /// Arcs leaving the head of the given arc.
    pub fn next_arcs(&self, a: ArcId) -> Vec<ArcId> {
        let to = self.arcs[a.kind.code()][a.index].to;
        let o = a.kind.opposite();
        self.arcs[o.code()]
            .iter()
            .enumerate()
            .filter(|(_, arc)| arc.from == to)
            .map(|(i, _)| ArcId::new(o, i))
            .collect()
    }

    /// Arcs entering the tail of the given arc.
    pub fn prev_arcs(&self, a: ArcId) -> Vec<ArcId> {
        let from = self.arcs[a.kind.code()][a.index].from;
        let o = a.kind.opposite();
        self.arcs[o.code()]
            .iter()
            .enumerate()
            .filter(|(_, arc)| arc.to == from)
            .map(|(i, _)| ArcId::new(o, i))
            .collect()
    }

    /// True if no arc touches the node.
    pub fn is_floating(&self, n: NodeId) -> bool {
        self.arcs
            .iter()
            .all(|list| list.iter().all(|a| a.from != n && a.to != n))
    }

    /// True if the place is covered by the reset marking (or, when no
    /// reset is recorded, by some source marking).
    pub fn is_reset(&self, i: NodeId) -> bool {
        if i.kind != NodeKind::Place {
            return false;
        }
        let markings = if self.reset.is_empty() {
            &self.source
        } else {
            &self.reset
        };
        markings.iter().any(|m| m.covers(i.index))
    }

    /// Every simple cycle reachable from the source marking, each reported
    /// as the node sequence around the loop.
    pub fn cycles(&self) -> Vec<Vec<NodeId>> {
        let mut curr: Vec<Vec<NodeId>> = Vec::new();
        for s in &self.source {
            for t in &s.tokens {
                curr.push(vec![NodeId::place(t.index())]);
            }
        }
        curr.sort();
        curr.dedup();

        let mut result = Vec::new();
        while let Some(x) = curr.pop() {
            let Some(&last) = x.last() else {
                continue;
            };
            for nb in self.next(last) {
                if let Some(pos) = x.iter().position(|&v| v == nb) {
                    let mut cycle = x.clone();
                    cycle.drain(0..pos);
                    result.push(cycle);
                } else {
                    let mut ext = x.clone();
                    ext.push(nb);
                    curr.push(ext);
                }
            }
        }
        result
    }
}
