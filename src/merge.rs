//! In-place composition of two whole graphs.
//!
//! [`Graph::merge`] splices a second graph into `self` under sequence,
//! choice or parallel composition and returns a [`TranslationMap`] from
//! the other graph's ids to their images here. The structural append is
//! uniform; the work is in reconciling the marking sets:
//!
//! - **choice** keeps both behaviors side by side: source, sink and reset
//!   lists are sorted-merged, coincident markings payload-merged.
//! - **parallel** runs both behaviors at once: a side with several source
//!   (or sink) markings first collapses them through a fresh place that
//!   fans out (or in) via synthesized transitions, then the two unique
//!   boundary markings are merged pointwise and the reset lists combined
//!   as a pairwise product.
//! - **sequence** splices exit into entry: multiple boundary markings are
//!   funneled through a synthesized join place, single-token boundaries
//!   are fused directly under sequence payload-merge, and the absorbed
//!   places are rewritten to the join in every marking and in the
//!   translation map. Only one side may carry a reset marking.
//!
//! Collapsing erases absorbed boundary places, so the translation map is
//! adjusted as the index range compacts; callers chase their ids through
//! the returned map.

use crate::composition::Composition;
use crate::graph::Graph;
use crate::marking::{Marking, Token, TranslationMap};
use crate::node_id::{Arc, NodeId, NodeKind};
use crate::payload::{PlacePayload, TransitionPayload};

impl<P: PlacePayload, T: TransitionPayload, K: Token> Graph<P, T, K> {
    /// Insert a marking into a sorted marking list, payload-merging it
    /// with a coincident entry.
    fn sorted_insert_merge(list: &mut Vec<Marking<K>>, m: &Marking<K>) {
        match list.binary_search(m) {
            Ok(pos) => {
                let merged = Marking::merge(&list[pos], m);
                list[pos] = merged;
            }
            Err(pos) => list.insert(pos, m.clone()),
        }
    }

    /// Point every token at `from_index` to `to_index`.
    fn retarget_tokens(markings: &mut [Marking<K>], from_index: usize, to_index: usize) {
        for m in markings.iter_mut() {
            for t in m.tokens.iter_mut() {
                if t.index() == from_index {
                    t.set_index(to_index);
                }
            }
        }
    }

    /// Replace every token at `from_index` with one token per node in `m`.
    fn replace_tokens_with(markings: &mut [Marking<K>], from_index: usize, m: &[NodeId]) {
        for mk in markings.iter_mut() {
            let mut i = mk.tokens.len();
            while i > 0 {
                i -= 1;
                if mk.tokens[i].index() == from_index {
                    let original = mk.tokens.remove(i);
                    for node in m {
                        let mut dup = original.clone();
                        dup.set_index(node.index);
                        mk.tokens.push(dup);
                    }
                }
            }
        }
    }

    /// Account for the erasure of `erased` in a translation map:
    /// substitute `replacement` for images of the erased node itself, then
    /// shift same-kind images above it down. Substitution runs first so
    /// the replacements pick up this erasure's shift too.
    fn remap_translation(map: &mut TranslationMap, erased: NodeId, replacement: &[NodeId]) {
        for images in map.values_mut() {
            let mut replaced = false;
            images.retain(|img| {
                if *img == erased {
                    replaced = true;
                    false
                } else {
                    true
                }
            });
            if replaced {
                images.extend_from_slice(replacement);
            }
            for img in images.iter_mut() {
                if img.kind == erased.kind && img.index > erased.index {
                    img.index -= 1;
                }
            }
            images.sort();
            images.dedup();
        }
    }

    /// Collapse several boundary markings through one fresh place.
    ///
    /// Multi-token markings gain a synthesized transition fanning between
    /// the place and their tokens; single-token markings are absorbed (the
    /// old place is rewired through the new one and queued for removal).
    /// Returns the collapsed one-marking list, the absorbed places sorted
    /// highest-first, and the new place.
    fn collapse_boundary(
        &mut self,
        mut markings: Vec<Marking<K>>,
        at_sink: bool,
    ) -> (Vec<Marking<K>>, Vec<NodeId>, NodeId) {
        let p = self.create(NodeKind::Place);
        let mut rem: Vec<NodeId> = Vec::new();

        for i in 0..markings.len() {
            let tokens: Vec<usize> = markings[i].tokens.iter().map(|t| t.index()).collect();
            if tokens.len() > 1 {
                let t = self.create(NodeKind::Transition);
                if at_sink {
                    self.connect(t, p);
                } else {
                    self.connect(p, t);
                }
                for &q in &tokens {
                    let q = NodeId::place(q);
                    if at_sink {
                        self.connect(q, t);
                    } else {
                        self.connect(t, q);
                    }
                }
            } else if tokens.len() == 1 {
                let p0 = NodeId::place(tokens[0]);
                let nx = self.next(p0);
                let pv = self.prev(p0);
                self.connect_to_all(p, &nx);
                self.connect_from_all(&pv, p);
                rem.push(p0);
            }

            markings[i] = Marking::collapse(p.index, &markings[i]);
            if i != 0 {
                let merged = Marking::merge(&markings[0], &markings[i]);
                markings[0] = merged;
            }
        }

        let collapsed = vec![match markings.first() {
            Some(first) => Marking::collapse(p.index, first),
            None => Marking::from_indices(&[p.index]),
        }];
        rem.sort();
        rem.dedup();
        rem.reverse();
        (collapsed, rem, p)
    }

    /// Compose another graph into this one, in place.
    ///
    /// Returns the map from `g`'s node ids to their ids in `self`. When
    /// `self` is empty the other graph is adopted wholesale (identity
    /// map); when `g` is empty, or a sequence composition finds no sink
    /// here or no source there, nothing happens and the map is empty.
    pub fn merge(&mut self, composition: Composition, g: &Graph<P, T, K>) -> TranslationMap {
        if self.places.is_empty() && self.transitions.is_empty() {
            *self = g.clone();
            let mut map = TranslationMap::new();
            for i in 0..self.places.len() {
                map.insert(NodeId::place(i), vec![NodeId::place(i)]);
            }
            for i in 0..self.transitions.len() {
                map.insert(NodeId::transition(i), vec![NodeId::transition(i)]);
            }
            return map;
        }
        if (g.places.is_empty() && g.transitions.is_empty())
            || (composition == Composition::Sequence
                && (self.sink.is_empty() || g.source.is_empty()))
        {
            return TranslationMap::new();
        }

        self.mark_modified();
        let mut map = TranslationMap::new();

        self.places.reserve(g.places.len());
        for i in 0..g.places.len() {
            map.insert(
                NodeId::place(i),
                vec![NodeId::place(self.places.len())],
            );
            self.places.push(g.places[i].clone());
        }
        self.transitions.reserve(g.transitions.len());
        for i in 0..g.transitions.len() {
            map.insert(
                NodeId::transition(i),
                vec![NodeId::transition(self.transitions.len())],
            );
            self.transitions.push(g.transitions[i].clone());
        }

        for kind in [NodeKind::Place, NodeKind::Transition] {
            for arc in &g.arcs[kind.code()] {
                let from = map[&arc.from].clone();
                let to = map[&arc.to].clone();
                for &f in &from {
                    for &t in &to {
                        self.arcs[kind.code()].push(Arc::new(f, t));
                    }
                }
            }
        }

        let mut converted_source: Vec<Marking<K>> =
            g.source.iter().map(|s| s.convert(&map)).collect();
        let mut converted_sink: Vec<Marking<K>> =
            g.sink.iter().map(|s| s.convert(&map)).collect();
        let mut converted_reset: Vec<Marking<K>> =
            g.reset.iter().map(|s| s.convert(&map)).collect();

        // Entry side.
        if composition == Composition::Choice || self.source.is_empty() {
            for s in &converted_source {
                Self::sorted_insert_merge(&mut self.source, s);
            }
            for r in &converted_reset {
                Self::sorted_insert_merge(&mut self.reset, r);
            }
        } else if composition == Composition::Parallel {
            if self.source.len() > 1 {
                let taken = std::mem::take(&mut self.source);
                let (collapsed, rem, p) = self.collapse_boundary(taken, false);
                self.source = collapsed;
                for &r in &rem {
                    Self::retarget_tokens(&mut self.sink, r.index, p.index);
                    Self::retarget_tokens(&mut self.reset, r.index, p.index);
                    Self::remap_translation(&mut map, r, &[p]);
                    Self::erase_from_markings(r, &mut converted_source);
                    Self::erase_from_markings(r, &mut converted_sink);
                    Self::erase_from_markings(r, &mut converted_reset);
                }
                for &r in &rem {
                    self.erase(r);
                }
            }
            if converted_source.len() > 1 {
                let (collapsed, rem, p) = self.collapse_boundary(converted_source, false);
                converted_source = collapsed;
                for &r in &rem {
                    Self::retarget_tokens(&mut converted_sink, r.index, p.index);
                    Self::retarget_tokens(&mut converted_reset, r.index, p.index);
                    Self::remap_translation(&mut map, r, &[p]);
                    Self::erase_from_markings(r, &mut converted_source);
                    Self::erase_from_markings(r, &mut converted_sink);
                    Self::erase_from_markings(r, &mut converted_reset);
                }
                for &r in &rem {
                    self.erase(r);
                }
            }

            if self.source.len() == 1 && converted_source.len() == 1 {
                let merged = Marking::merge(&self.source[0], &converted_source[0]);
                self.source[0] = merged;
            } else if converted_source.len() == 1 {
                self.source = converted_source.clone();
            }

            // Reset states combine as a pairwise product.
            if self.reset.is_empty() && !converted_reset.is_empty() {
                self.reset = self.source.clone();
            } else if !self.reset.is_empty() && converted_reset.is_empty() {
                converted_reset = converted_source.clone();
            }
            if !self.reset.is_empty() || !converted_reset.is_empty() {
                let s = self.reset.len();
                if converted_reset.len() > 1 {
                    for i in 0..converted_reset.len() - 1 {
                        for j in 0..s {
                            let m = Marking::merge(&self.reset[j], &converted_reset[i]);
                            self.reset.push(m);
                        }
                    }
                }
                if let Some(last) = converted_reset.last() {
                    for j in 0..s {
                        let m = Marking::merge(&self.reset[j], last);
                        self.reset[j] = m;
                    }
                }
            }
        }

        // Exit side.
        if composition == Composition::Choice || self.sink.is_empty() {
            for s in &converted_sink {
                Self::sorted_insert_merge(&mut self.sink, s);
            }
        } else if composition == Composition::Parallel {
            if self.sink.len() > 1 {
                let taken = std::mem::take(&mut self.sink);
                let (collapsed, rem, p) = self.collapse_boundary(taken, true);
                self.sink = collapsed;
                for &r in &rem {
                    Self::retarget_tokens(&mut self.source, r.index, p.index);
                    Self::retarget_tokens(&mut self.reset, r.index, p.index);
                    Self::remap_translation(&mut map, r, &[p]);
                    Self::erase_from_markings(r, &mut converted_source);
                    Self::erase_from_markings(r, &mut converted_sink);
                    Self::erase_from_markings(r, &mut converted_reset);
                }
                for &r in &rem {
                    self.erase(r);
                }
            }
            if converted_sink.len() > 1 {
                let (collapsed, rem, p) = self.collapse_boundary(converted_sink, true);
                converted_sink = collapsed;
                for &r in &rem {
                    Self::retarget_tokens(&mut converted_source, r.index, p.index);
                    Self::retarget_tokens(&mut converted_reset, r.index, p.index);
                    Self::remap_translation(&mut map, r, &[p]);
                    Self::erase_from_markings(r, &mut converted_source);
                    Self::erase_from_markings(r, &mut converted_sink);
                    Self::erase_from_markings(r, &mut converted_reset);
                }
                for &r in &rem {
                    self.erase(r);
                }
            }

            if self.sink.len() == 1 && converted_sink.len() == 1 {
                let merged = Marking::merge(&self.sink[0], &converted_sink[0]);
                self.sink[0] = merged;
            } else if converted_sink.len() == 1 {
                self.sink = converted_sink.clone();
            }
        } else if composition == Composition::Sequence {
            if !self.reset.is_empty() && !converted_reset.is_empty() {
                log::error!("merge: only one reset marking allowed in sequential composition");
            } else if self.reset.is_empty() {
                self.reset = converted_reset.clone();
            }

            let mut rem: Vec<NodeId> = Vec::new();
            let mut m: Vec<NodeId> = Vec::new();

            if self.sink.len() > 1 || converted_source.len() > 1 {
                m.push(self.create(NodeKind::Place));

                for i in 0..self.sink.len() {
                    let tokens: Vec<usize> =
                        self.sink[i].tokens.iter().map(|t| t.index()).collect();
                    if tokens.len() > 1 {
                        let pm = self.create(NodeKind::Transition);
                        for &k in &tokens {
                            self.connect(NodeId::place(k), pm);
                        }
                        self.connect_to_all(pm, &m);
                    } else if tokens.len() == 1 {
                        let pm = NodeId::place(tokens[0]);
                        let pv = self.prev(pm);
                        let nx = self.next(pm);
                        self.connect_all(&pv, &m);
                        self.connect_all(&m, &nx);
                        for mk in &m {
                            self.places[mk.index] = P::merge(
                                Composition::Sequence,
                                &self.places[pm.index],
                                &self.places[mk.index],
                            );
                        }
                        rem.push(pm);
                    }
                }

                for i in 0..converted_source.len() {
                    let tokens: Vec<usize> =
                        converted_source[i].tokens.iter().map(|t| t.index()).collect();
                    if tokens.len() > 1 {
                        let pm = self.create(NodeKind::Transition);
                        for &k in &tokens {
                            self.connect(pm, NodeId::place(k));
                        }
                        self.connect_from_all(&m, pm);
                    } else if tokens.len() == 1 {
                        let pm = NodeId::place(tokens[0]);
                        let pv = self.prev(pm);
                        let nx = self.next(pm);
                        self.connect_all(&pv, &m);
                        self.connect_all(&m, &nx);
                        for mk in &m {
                            self.places[mk.index] = P::merge(
                                Composition::Sequence,
                                &self.places[mk.index],
                                &self.places[pm.index],
                            );
                        }
                        rem.push(pm);
                    }
                }
            } else if self.sink.len() == 1 && converted_source.len() == 1 {
                let sink_tokens: Vec<usize> =
                    self.sink[0].tokens.iter().map(|t| t.index()).collect();
                let source_tokens: Vec<usize> =
                    converted_source[0].tokens.iter().map(|t| t.index()).collect();

                if sink_tokens.len() > 1 && source_tokens.len() > 1 {
                    let t = self.create(NodeKind::Transition);
                    for &k in &sink_tokens {
                        self.connect(NodeId::place(k), t);
                    }
                    for &k in &source_tokens {
                        self.connect(t, NodeId::place(k));
                    }
                } else if !sink_tokens.is_empty() && source_tokens.len() == 1 {
                    let p = NodeId::place(source_tokens[0]);
                    let nx = self.next(p);
                    let pv = self.prev(p);
                    for &k in &sink_tokens {
                        let mk = NodeId::place(k);
                        m.push(mk);
                        self.places[mk.index] = P::merge(
                            Composition::Sequence,
                            &self.places[mk.index],
                            &self.places[p.index],
                        );
                        self.connect_to_all(mk, &nx);
                        self.connect_from_all(&pv, mk);
                    }
                    rem.push(p);
                } else if sink_tokens.len() == 1 && !source_tokens.is_empty() {
                    let p = NodeId::place(sink_tokens[0]);
                    let nx = self.next(p);
                    let pv = self.prev(p);
                    for &k in &source_tokens {
                        let mk = NodeId::place(k);
                        m.push(mk);
                        self.places[mk.index] = P::merge(
                            Composition::Sequence,
                            &self.places[p.index],
                            &self.places[mk.index],
                        );
                        self.connect_to_all(mk, &nx);
                        self.connect_from_all(&pv, mk);
                    }
                    rem.push(p);
                }
            }

            rem.sort();
            rem.dedup();
            rem.reverse();
            for &r in &rem {
                Self::replace_tokens_with(&mut converted_sink, r.index, &m);
                Self::replace_tokens_with(&mut self.reset, r.index, &m);
                Self::replace_tokens_with(&mut self.source, r.index, &m);
                Self::remap_translation(&mut map, r, &m);
            }

            self.sink = converted_sink;
            for &r in &rem {
                self.erase(r);
            }
        }

        map
    }
}
