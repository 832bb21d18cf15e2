//! Fixed-point structural reduction.
//!
//! [`Graph::reduce`] repeatedly applies local rewrites until none fires:
//! transitions get phantom input/output places when they lack one,
//! infeasible transitions are erased, vacuous transitions are pinched out
//! (with guards when proper nesting must survive), unmarked dead places
//! and structural duplicate places are pruned, and -- in aggressive mode --
//! internally conditioned or internally parallel transition pairs are
//! fused. Each rewrite restarts the scan, so the result is a fixed point
//! and a second call reports no change.

use crate::composition::Composition;
use crate::graph::Graph;
use crate::marking::Token;
use crate::node_id::{NodeId, NodeKind};
use crate::payload::{PlacePayload, TransitionPayload};

/// Number of elements shared by two sorted id lists.
fn intersection_size(a: &[NodeId], b: &[NodeId]) -> usize {
    let (mut i, mut j, mut n) = (0usize, 0usize, 0usize);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            n += 1;
            i += 1;
            j += 1;
        } else if a[i] < b[j] {
            i += 1;
        } else {
            j += 1;
        }
    }
    n
}

impl<P: PlacePayload, T: TransitionPayload, K: Token> Graph<P, T, K> {
    /// Apply local rewrites until a fixed point is reached. Returns
    /// whether any rewrite fired.
    ///
    /// With `proper_nesting`, vacuous transitions are only pinched in the
    /// local shapes where the contraction cannot break proper nesting:
    /// single-input single-output with a unique far-side neighbor, or a
    /// single-entry / single-exit chain of length two on one side.
    /// `aggressive` additionally fuses internally conditioned transitions
    /// (identical neighbor sets, combined under choice) and internally
    /// parallel ones (disjoint neighbor sets sharing the same unique
    /// far-side transitions, combined under parallel).
    pub fn reduce(&mut self, proper_nesting: bool, aggressive: bool) -> bool {
        let mut result = false;
        let mut change = true;
        while change {
            change = false;

            let mut i = 0usize;
            while i < self.transitions.len() && !change {
                let node = NodeId::transition(i);
                let mut n = self.next(node);
                let mut p = self.prev(node);
                n.sort();
                p.sort();

                let mut affect = false;

                // Every transition needs somewhere to take a token from
                // and somewhere to put one.
                if p.is_empty() {
                    let ph = self.create(NodeKind::Place);
                    self.connect(ph, node);
                    affect = true;
                }
                if !affect && n.is_empty() {
                    let ph = self.create(NodeKind::Place);
                    self.connect(node, ph);
                    affect = true;
                }

                if !affect && self.transitions[i].is_infeasible() {
                    self.erase(node);
                    affect = true;
                }

                if !affect && self.transitions[i].is_vacuous() {
                    if !proper_nesting {
                        self.pinch(node);
                        affect = true;
                    } else {
                        let np = self.next_all(&p);
                        let pn = self.prev_all(&n);
                        if p.len() == 1 && n.len() == 1 && (np.len() == 1 || pn.len() == 1) {
                            self.pinch(node);
                            affect = true;
                        } else {
                            let nn = self.next_all(&n);
                            let nnp = self.next_all(&np);
                            let pp = self.prev_all(&p);
                            let ppn = self.prev_all(&pn);
                            if (n.len() == 1 && nn.len() == 1 && nnp.len() == 1 && np.len() == 1)
                                || (p.len() == 1
                                    && pp.len() == 1
                                    && ppn.len() == 1
                                    && pn.len() == 1)
                            {
                                self.pinch(node);
                                affect = true;
                            }
                        }
                    }
                }

                if affect {
                    change = true;
                } else {
                    i += 1;
                }
            }

            let mut i = 0usize;
            while i < self.places.len() && !change {
                let node = NodeId::place(i);
                let i_is_reset = self.is_reset(node);
                let mut n = self.next(node);
                let mut p = self.prev(node);
                n.sort();
                p.sort();

                let mut affect = false;

                // A place that can never be marked starves its successors.
                if p.is_empty() && (!i_is_reset || n.is_empty()) {
                    self.erase_all(&n);
                    self.erase(node);
                    affect = true;
                }

                if !affect {
                    // Structural duplicates of this place are excess.
                    let mut j = i + 1;
                    while j < self.places.len() {
                        let other = NodeId::place(j);
                        let j_is_reset = self.is_reset(other);
                        let mut n2 = self.next(other);
                        let mut p2 = self.prev(other);
                        n2.sort();
                        p2.sort();
                        if n == n2 && p == p2 && i_is_reset == j_is_reset {
                            self.erase(other);
                            affect = true;
                        } else {
                            j += 1;
                        }
                    }
                }

                if affect {
                    change = true;
                } else {
                    i += 1;
                }
            }

            if aggressive {
                let mut n: Vec<Vec<NodeId>> = Vec::new();
                let mut p: Vec<Vec<NodeId>> = Vec::new();
                let mut nx: Vec<Vec<(Vec<NodeId>, Vec<NodeId>)>> = Vec::new();
                let mut px: Vec<Vec<(Vec<NodeId>, Vec<NodeId>)>> = Vec::new();

                let mut i = 0usize;
                while i < self.transitions.len() && !change {
                    let node = NodeId::transition(i);
                    let mut ni = self.next(node);
                    let mut pi = self.prev(node);
                    ni.sort();
                    pi.sort();

                    let mut nxi = Vec::new();
                    for &x in &ni {
                        let mut a = self.prev(x);
                        let mut b = self.next(x);
                        a.sort();
                        b.sort();
                        nxi.push((a, b));
                    }
                    let mut pxi = Vec::new();
                    for &x in &pi {
                        let mut a = self.prev(x);
                        let mut b = self.next(x);
                        a.sort();
                        b.sort();
                        pxi.push((a, b));
                    }
                    n.push(ni);
                    p.push(pi);
                    nx.push(nxi);
                    px.push(pxi);

                    let mut j = i;
                    while j > 0 && !change {
                        j -= 1;

                        if n[j] == n[i] && p[j] == p[i] {
                            // Internally conditioned: same inputs, same
                            // outputs -- one guarded transition suffices.
                            self.transitions[j] = T::merge(
                                Composition::Choice,
                                &self.transitions[i],
                                &self.transitions[j],
                            );
                            self.erase(node);
                            change = true;
                        } else if intersection_size(&n[i], &n[j]) == 0
                            && intersection_size(&p[i], &p[j]) == 0
                            && nx[i] == nx[j]
                            && px[i] == px[j]
                        {
                            // Internally parallel: disjoint neighborhoods
                            // fed and drained by the same far transitions.
                            self.transitions[j] = T::merge(
                                Composition::Parallel,
                                &self.transitions[i],
                                &self.transitions[j],
                            );
                            let mut tocut = vec![node];
                            tocut.extend(n[i].iter().copied());
                            tocut.extend(p[i].iter().copied());
                            self.erase_all(&tocut);
                            change = true;
                        }
                    }
                    i += 1;
                }
            }

            result = result || change;
        }

        result
    }
}
