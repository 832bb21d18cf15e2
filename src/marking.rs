//! Tokens and markings.
//!
//! A [`Marking`] is an ordered set of tokens naming the places that hold a
//! token in some state of the net. Graphs keep three independent marking
//! lists: `source` (entry states), `sink` (exit states) and `reset` (the
//! initial state). The token type is user-supplied so hosts can attach
//! their own data to a token; the core only needs the place index and a
//! total order.

use crate::node_id::NodeId;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Remap from old node ids to their replacements, as returned by
/// [`Graph::merge`](crate::Graph::merge) and
/// [`Graph::pinch`](crate::Graph::pinch).
///
/// A `BTreeMap` keeps iteration deterministic while markings and arcs are
/// rewritten against it.
pub type TranslationMap = BTreeMap<NodeId, Vec<NodeId>>;

/// A token sitting in a place.
///
/// Implemented for `usize` so the structural core can be used with bare
/// place indices; hosts with richer token state implement it themselves.
pub trait Token: Clone + Ord {
    /// A token at the given place index.
    fn new(index: usize) -> Self;

    /// Index of the place holding this token.
    fn index(&self) -> usize;

    /// Move this token to another place index, keeping any other state.
    /// Editors call this when erasure renumbers the place range.
    fn set_index(&mut self, index: usize);
}

impl Token for usize {
    #[inline]
    fn new(index: usize) -> Self {
        index
    }

    #[inline]
    fn index(&self) -> usize {
        *self
    }

    #[inline]
    fn set_index(&mut self, index: usize) {
        *self = index;
    }
}

/// An ordered, duplicate-free sequence of tokens describing one state.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Marking<K = usize> {
    pub tokens: Vec<K>,
}

impl<K: Token> Marking<K> {
    /// A marking over the given tokens. Tokens are sorted and deduplicated.
    pub fn new(mut tokens: Vec<K>) -> Self {
        tokens.sort();
        tokens.dedup();
        Self { tokens }
    }

    /// A marking with one token per listed place index.
    pub fn from_indices(indices: &[usize]) -> Self {
        Self::new(indices.iter().map(|&i| K::new(i)).collect())
    }

    /// True if some token sits at the given place index.
    pub fn covers(&self, index: usize) -> bool {
        self.tokens.iter().any(|t| t.index() == index)
    }

    /// Sorted union of two markings, duplicates removed.
    pub fn merge(s0: &Self, s1: &Self) -> Self {
        let mut tokens = Vec::with_capacity(s0.tokens.len() + s1.tokens.len());
        tokens.extend(s0.tokens.iter().cloned());
        tokens.extend(s1.tokens.iter().cloned());
        tokens.sort();
        tokens.dedup();
        Self { tokens }
    }

    /// Replace the whole token list with a single token at `index`.
    pub fn collapse(index: usize, _s: &Self) -> Self {
        Self {
            tokens: vec![K::new(index)],
        }
    }

    /// Chase every token through a translation map, dropping tokens whose
    /// place has no image.
    pub fn convert(&self, translate: &TranslationMap) -> Self {
        let mut tokens = Vec::new();
        for t in &self.tokens {
            if let Some(images) = translate.get(&NodeId::place(t.index())) {
                for img in images {
                    tokens.push(K::new(img.index));
                }
            }
        }
        Self::new(tokens)
    }
}
