//! Composition kinds and query relations.
//!
//! Every pair of nodes in a live, bounded handshaking graph is composed in
//! one or more of three structural ways: they alternate on a shared path
//! ([`Composition::Sequence`]), they sit on different branches of a
//! transition fan-out ([`Composition::Parallel`]), or they sit on different
//! branches of a place fan-out ([`Composition::Choice`]). Non-properly
//! nested graphs can compose the same pair in several of these at once,
//! which is why queries distinguish *sometimes* from *always* (see
//! [`Graph::is`](crate::Graph::is)).
//!
//! [`Relation`] extends the structural kinds with two implication relations
//! over choice, `Implies` and `Excludes`, used to ask whether one partial
//! state forces or forbids another.
//!
//! The numeric codes are stable and shared with external tools; `Choice`
//! and `Parallel` are deliberately `0` and `1` so that `1 - c` selects the
//! opposite binary composition, mirroring the `1 - kind` convention on
//! [`NodeKind`](crate::NodeKind).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A structural composition kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Composition {
    /// Composed through a place fan-out: at most one side occurs.
    Choice = 0,
    /// Composed through a transition fan-out: both sides occur, unordered.
    Parallel = 1,
    /// Ordered along a shared path.
    Sequence = 2,
}

impl Composition {
    /// Stable numeric code (`choice = 0`, `parallel = 1`, `sequence = 2`).
    #[inline]
    pub fn code(self) -> usize {
        self as usize
    }

    /// The opposite binary composition.
    ///
    /// Only `Choice` and `Parallel` are duals of each other; calling this
    /// on `Sequence` is a programmer error.
    #[inline]
    pub fn opposite(self) -> Composition {
        match self {
            Composition::Choice => Composition::Parallel,
            Composition::Parallel => Composition::Choice,
            Composition::Sequence => panic!("sequence has no opposite composition"),
        }
    }
}

/// A relation queryable through [`Graph::is`](crate::Graph::is): the three
/// structural compositions plus the choice-implication layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Relation {
    /// See [`Composition::Choice`].
    Choice = 0,
    /// See [`Composition::Parallel`].
    Parallel = 1,
    /// See [`Composition::Sequence`].
    Sequence = 2,
    /// Occurrence of the first side forces occurrence of the second,
    /// independent of parallel ordering.
    Implies = 3,
    /// Occurrence of the first side forbids occurrence of the second.
    Excludes = 4,
}

impl From<Composition> for Relation {
    #[inline]
    fn from(c: Composition) -> Relation {
        match c {
            Composition::Choice => Relation::Choice,
            Composition::Parallel => Relation::Parallel,
            Composition::Sequence => Relation::Sequence,
        }
    }
}
