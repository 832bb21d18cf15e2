//! Payload contracts for places and transitions.
//!
//! The graph treats node payloads as opaque: it creates them with
//! `Default`, duplicates them with `Clone`, and combines them through the
//! `merge` hooks when structural edits fuse two nodes under a given
//! [`Composition`]. Transitions additionally report two predicates the
//! reducer acts on: an *infeasible* transition can never fire and is
//! erased; a *vacuous* transition does nothing observable and may be
//! pinched out.
//!
//! Both traits are implemented for `()` so the structural core works
//! standalone; real front ends supply payloads carrying guards, actions,
//! or predicate expressions.

use crate::composition::Composition;

/// Data carried by a place.
pub trait PlacePayload: Clone + Default {
    /// Combine two place payloads fused under `composition`.
    fn merge(composition: Composition, p0: &Self, p1: &Self) -> Self;
}

impl PlacePayload for () {
    #[inline]
    fn merge(_composition: Composition, _p0: &Self, _p1: &Self) -> Self {}
}

/// Data carried by a transition.
pub trait TransitionPayload: Clone + Default {
    /// Combine two transition payloads fused under `composition`.
    fn merge(composition: Composition, t0: &Self, t1: &Self) -> Self;

    /// Whether two payloads may be combined under `composition`. Asking the
    /// graph to combine unmergeable transitions is an invariant violation.
    #[inline]
    fn mergeable(_composition: Composition, _t0: &Self, _t1: &Self) -> bool {
        true
    }

    /// True if this transition can never fire.
    #[inline]
    fn is_infeasible(&self) -> bool {
        false
    }

    /// True if firing this transition has no observable effect.
    #[inline]
    fn is_vacuous(&self) -> bool {
        false
    }
}

impl TransitionPayload for () {
    #[inline]
    fn merge(_composition: Composition, _t0: &Self, _t1: &Self) -> Self {}
}
