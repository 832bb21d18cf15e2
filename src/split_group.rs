//! Split groups and the set algebra over them.
//!
//! A *split point* is a node with more than one outgoing arc: a transition
//! fan-out starts parallel branches, a place fan-out starts conditional
//! branches. The analyzer annotates every node with the set of splits whose
//! branches lead to it, as [`SplitGroup`] records: "tokens arriving here
//! originated on `branches` out of the `count` branches of the split at
//! `split`".
//!
//! Composition queries never look at the graph structure directly; they are
//! answered entirely by comparing and merging these annotations. The two
//! workhorses are [`compare`] (a boolean verdict) and [`merge`] (a combined
//! annotation list), both parameterized by a group-level and a branch-level
//! [`SetOp`]. The walks operate in lockstep over lists sorted by split, so
//! every operation is linear in the number of groups.
//!
//! `split` is `None` for groups seeded from the initial marking: a reset
//! state with several tokens behaves like a parallel split that happened
//! before time zero. `None` sorts before every real split index, preserving
//! the sentinel's position in the sorted walks.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Set operation selector for [`compare`], [`merge`] and [`merge_inplace`].
///
/// The numeric codes are stable: `INTERSECT = 0`, `UNION = 1`,
/// `DIFFERENCE = 2`, `NEGATIVE_DIFFERENCE = 3`, `SYMMETRIC_DIFFERENCE = 4`,
/// `SUBSET = 5`, `SUBSET_EQUAL = 6`, `NOT_EQUAL = 7`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum SetOp {
    Intersect = 0,
    Union = 1,
    Difference = 2,
    NegativeDifference = 3,
    SymmetricDifference = 4,
    Subset = 5,
    SubsetEqual = 6,
    NotEqual = 7,
}

/// One split-point record in a node's annotation.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplitGroup {
    /// Index of the split node. Its kind is implied by the composition the
    /// annotation belongs to (transition for parallel, place for choice).
    /// `None` marks groups seeded from the initial marking.
    pub split: Option<usize>,
    /// Indices of the branches out of the split that lead to the annotated
    /// node. Sorted and deduplicated.
    pub branches: Vec<usize>,
    /// Total number of branches out of the split.
    pub count: usize,
}

impl SplitGroup {
    /// A group for a single branch out of a split.
    #[inline]
    pub fn new(split: Option<usize>, branch: usize, count: usize) -> Self {
        Self {
            split,
            branches: vec![branch],
            count,
        }
    }

    /// True once every branch of the split has been observed, i.e. the
    /// split has fully merged back together at the annotated node.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.branches.len() == self.count
    }
}

impl fmt::Display for SplitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.split {
            Some(s) => write!(f, "({},{:?}/{})", s, self.branches, self.count),
            None => write!(f, "(*,{:?}/{})", self.branches, self.count),
        }
    }
}

/// Compare two sorted annotation lists under a group-level and a
/// branch-level operation.
///
/// Existential operations (`Intersect`, `Difference`, `NegativeDifference`,
/// `SymmetricDifference`, `NotEqual` at the branch level; `Difference`-like
/// at the group level for incomplete one-sided groups) return `true` at the
/// first witness. `Subset`/`SubsetEqual` are universal: a conflict in
/// direction fails the whole comparison.
///
/// Branch sets only participate when the group operation is `Intersect`,
/// `Difference` or `NegativeDifference`; otherwise only the split keys are
/// inspected. This walk is the authoritative truth table for the query
/// layer (see [`Graph::is`](crate::Graph::is)).
pub fn compare(group_op: SetOp, branch_op: SetOp, g0: &[SplitGroup], g1: &[SplitGroup]) -> bool {
    use SetOp::*;

    // Which side has held elements the other lacks, at each level.
    let mut branch_cmp: Option<u8> = None;
    let mut group_cmp: Option<u8> = None;

    let (mut i, mut j) = (0usize, 0usize);
    while i < g0.len() || j < g1.len() {
        if i < g0.len() && j < g1.len() && g0[i].split == g1[j].split {
            if matches!(group_op, Intersect | Difference | NegativeDifference) {
                let b0 = &g0[i].branches;
                let b1 = &g1[j].branches;
                let mut only0 = false;
                let mut only1 = false;
                let mut shared = false;
                let (mut k, mut l) = (0usize, 0usize);
                while k < b0.len() && l < b1.len() {
                    if b0[k] == b1[l] {
                        shared = true;
                        k += 1;
                        l += 1;
                    } else if b0[k] < b1[l] {
                        only0 = true;
                        k += 1;
                    } else {
                        only1 = true;
                        l += 1;
                    }
                }
                only0 = only0 || k < b0.len();
                only1 = only1 || l < b1.len();

                if (branch_op == SymmetricDifference && only0 && only1)
                    || (branch_op == Intersect && shared)
                {
                    return true;
                }
                if branch_op == Difference && only0 {
                    return true;
                }
                if branch_op == NegativeDifference && only1 {
                    return true;
                }
                if branch_op == NotEqual && (only0 || only1) {
                    return true;
                }
                if matches!(branch_op, Subset | SubsetEqual) && only0 {
                    if branch_cmp == Some(1) {
                        return false;
                    }
                    branch_cmp = Some(0);
                }
                if matches!(branch_op, Subset | SubsetEqual) && only1 {
                    if branch_cmp == Some(0) {
                        return false;
                    }
                    branch_cmp = Some(1);
                }
            }
            i += 1;
            j += 1;
        } else if i < g0.len() && (j >= g1.len() || g0[i].split < g1[j].split) {
            if !g0[i].is_complete() && matches!(group_op, Difference | SymmetricDifference) {
                return true;
            } else if matches!(group_op, Subset | SubsetEqual) {
                if group_cmp == Some(1) {
                    return false;
                }
                group_cmp = Some(0);
            }
            i += 1;
        } else {
            if !g1[j].is_complete() && matches!(group_op, NegativeDifference | SymmetricDifference)
            {
                return true;
            } else if matches!(group_op, Subset | SubsetEqual) {
                if group_cmp == Some(0) {
                    return false;
                }
                group_cmp = Some(1);
            }
            j += 1;
        }
    }

    (group_op == SubsetEqual || (group_op == Subset && group_cmp.is_some()) || group_op == Intersect)
        && (branch_op == SubsetEqual || (branch_op == Subset && branch_cmp.is_some()))
}

/// Merge two sorted annotation lists into a new one.
///
/// Where splits align, the output group's branches are computed by
/// `branch_op` (`Intersect`, `Union` or `Difference`). A split present on
/// only one side is kept unless the group operation is `Intersect` (and a
/// right-only split additionally requires `Union`).
pub fn merge(
    group_op: SetOp,
    branch_op: SetOp,
    g0: &[SplitGroup],
    g1: &[SplitGroup],
) -> Vec<SplitGroup> {
    use SetOp::*;

    let mut result = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < g0.len() || j < g1.len() {
        if i < g0.len() && j < g1.len() && g0[i].split == g1[j].split {
            let mut out = SplitGroup {
                split: g0[i].split,
                branches: Vec::new(),
                count: g0[i].count,
            };
            let b0 = &g0[i].branches;
            let b1 = &g1[j].branches;
            let (mut k, mut l) = (0usize, 0usize);
            while k < b0.len() || l < b1.len() {
                if k < b0.len() && l < b1.len() && b0[k] == b1[l] {
                    if branch_op != Difference {
                        out.branches.push(b0[k]);
                    }
                    k += 1;
                    l += 1;
                } else if k < b0.len() && (l >= b1.len() || b0[k] < b1[l]) {
                    if branch_op != Intersect {
                        out.branches.push(b0[k]);
                    }
                    k += 1;
                } else {
                    if branch_op == Union {
                        out.branches.push(b1[l]);
                    }
                    l += 1;
                }
            }
            result.push(out);
            i += 1;
            j += 1;
        } else if i < g0.len() && (j >= g1.len() || g0[i].split < g1[j].split) {
            if group_op != Intersect {
                result.push(g0[i].clone());
            }
            i += 1;
        } else {
            if group_op == Union {
                result.push(g1[j].clone());
            }
            j += 1;
        }
    }
    result
}

/// Merge `g1` into `g0` in place.
///
/// Used by the fixed-point analyzer, always with `(Union, Union)`; the
/// operation is monotone there, which is what makes in-progress reads of
/// neighbor annotations safe during a sweep. Groups of `g1` whose split
/// equals `exclude` are skipped, so a node never imports its own split.
pub fn merge_inplace(
    group_op: SetOp,
    branch_op: SetOp,
    g0: &mut Vec<SplitGroup>,
    g1: &[SplitGroup],
    exclude: Option<usize>,
) {
    use SetOp::*;

    let (mut i, mut j) = (0usize, 0usize);
    while i < g0.len() || j < g1.len() {
        while j < g1.len() && exclude.is_some() && g1[j].split == exclude {
            j += 1;
        }

        if i < g0.len() && j < g1.len() && g0[i].split == g1[j].split {
            let (mut k, mut l) = (0usize, 0usize);
            while k < g0[i].branches.len() || l < g1[j].branches.len() {
                if k < g0[i].branches.len()
                    && l < g1[j].branches.len()
                    && g0[i].branches[k] == g1[j].branches[l]
                {
                    k += 1;
                    l += 1;
                } else if k < g0[i].branches.len()
                    && (l >= g1[j].branches.len() || g0[i].branches[k] < g1[j].branches[l])
                {
                    if branch_op == Intersect {
                        g0[i].branches.remove(k);
                    } else {
                        k += 1;
                    }
                } else if l < g1[j].branches.len() {
                    if branch_op == Union {
                        let b = g1[j].branches[l];
                        g0[i].branches.insert(k, b);
                        k += 1;
                    }
                    l += 1;
                }
            }
            i += 1;
            j += 1;
        } else if i < g0.len() && (j >= g1.len() || g0[i].split < g1[j].split) {
            if group_op == Intersect {
                g0.remove(i);
            } else {
                i += 1;
            }
        } else if j < g1.len() {
            if group_op == Union {
                g0.insert(i, g1[j].clone());
                i += 1;
            }
            j += 1;
        }
    }
}
