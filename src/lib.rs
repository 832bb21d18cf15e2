//! # Tokenflow
//!
//! A library for building, analyzing and composing **bipartite concurrency
//! graphs** -- the Petri-net variant used as the intermediate
//! representation in asynchronous handshaking circuit synthesis. Higher
//! level tools hand it a net, edit it structurally, and ask how any two
//! nodes (or partial states) are composed: in sequence, in parallel, or in
//! choice -- and whether that holds *always* or only on some executions.
//!
//! ## Key Features
//!
//! - **Dense typed handles** - places and transitions addressed by
//!   `(kind, index)` ids with explicit renumbering contracts
//! - **Structural editors** - create, connect, erase, copy, insert,
//!   duplicate, pinch, consolidate, reduce
//! - **Split-group analysis** - a fixed-point annotation of which split
//!   branches lead to each node, sound under non-properly-nested graphs
//! - **Composition queries** - `is(relation, a, b, always)` for choice,
//!   parallel, sequence, implies and excludes, on nodes or node sets
//! - **Clique machinery** - maximal-clique selection and grouping over any
//!   composition relation (Bron-Kerbosch)
//! - **Whole-graph merging** - sequence/choice/parallel composition of two
//!   nets with translation maps for id stability
//! - **Opaque payloads** - the graph is generic over place, transition and
//!   token types; behavior hooks are a five-method contract
//!
//! ## Quick Start
//!
//! ```
//! use tokenflow::{Graph, NodeKind, Relation};
//!
//! // Build a choice diamond:  t5 -> p0 -> (t0 p1 t1 | t2 p2 t3) -> p3 -> t4
//! let mut g: Graph = Graph::new();
//! let p = g.create_many(NodeKind::Place, 4);
//! let t = g.create_many(NodeKind::Transition, 6);
//! g.connect_sequence(&[t[5], p[0], t[0], p[1], t[1], p[3], t[4]]);
//! g.connect_sequence(&[p[0], t[2], p[2], t[3], p[3]]);
//!
//! // The two branches are always mutually exclusive...
//! assert!(g.is(Relation::Choice, t[0], t[2], true));
//! // ...and the stem is always sequenced with the merge point.
//! assert!(g.is(Relation::Sequence, p[0], p[3], true));
//! assert!(!g.is(Relation::Parallel, t[0], t[2], false));
//! ```
//!
//! ## Core Concepts
//!
//! ### Nodes, arcs and markings
//!
//! A net alternates between [`NodeKind::Place`] (token holders) and
//! [`NodeKind::Transition`] (events); arcs always connect opposite kinds,
//! and the editors insert anonymous mediators to keep it that way. Three
//! [`Marking`] lists describe the boundary behavior: `source` (entry
//! states), `sink` (exit states) and `reset` (the initial state).
//!
//! ### Split groups
//!
//! Every node with more than one outgoing arc *splits* the behavior: a
//! transition fan-out starts parallel branches, a place fan-out starts
//! conditional branches. The analyzer computes, per node, which branches
//! of which splits lead to it ([`SplitGroup`]); all composition queries
//! are answered by set algebra over those annotations, so they stay
//! meaningful when splits are not properly nested.
//!
//! ### Queries
//!
//! [`Graph::is`] answers pairwise composition; [`Graph::is_sets`] lifts it
//! to partial states (the shared nodes are dropped first). `always = true`
//! strengthens the question from "on some execution" to "on every
//! execution where both occur". [`Graph::select`] partitions a node list
//! into maximal cliques of a relation, and [`Graph::distance`] /
//! [`Graph::is_reachable`] give arc-count reachability.
//!
//! ### Editing
//!
//! Ids are dense per kind and renumber on erasure: editors that remove or
//! fuse nodes return predecessor/successor lists or a [`TranslationMap`]
//! so callers can repair the handles they hold. Every mutation invalidates
//! the analysis caches; the next query recomputes them.
//!
//! ## Payload contract
//!
//! Hosts parameterize [`Graph`] with their own place/transition payloads
//! and token type:
//!
//! ```
//! use tokenflow::{Composition, Graph, PlacePayload, TransitionPayload};
//!
//! #[derive(Clone, Default)]
//! struct Guard { exprs: Vec<String> }
//!
//! impl TransitionPayload for Guard {
//!     fn merge(_c: Composition, t0: &Self, t1: &Self) -> Self {
//!         let mut exprs = t0.exprs.clone();
//!         exprs.extend(t1.exprs.iter().cloned());
//!         Guard { exprs }
//!     }
//!     fn is_vacuous(&self) -> bool {
//!         self.exprs.is_empty()
//!     }
//! }
//!
//! #[derive(Clone, Default)]
//! struct Slot;
//! impl PlacePayload for Slot {
//!     fn merge(_c: Composition, _p0: &Self, _p1: &Self) -> Self { Slot }
//! }
//!
//! let mut g: Graph<Slot, Guard> = Graph::new();
//! let t = g.create_transition(Guard::default());
//! assert!(g.transitions[t.index].is_vacuous());
//! ```
//!
//! The core never interprets payloads beyond the five hooks: `merge` on
//! both kinds, plus `mergeable`, `is_infeasible` and `is_vacuous` on
//! transitions.
//!
//! ## Feature Flags
//!
//! - `serde` - serde derives on the small value types (ids, arcs, split
//!   groups, markings)
//!
//! ## Module Overview
//!
//! - [`graph`] - the store, marking sets, and structural editors
//! - [`analysis`] - split-group fixed point and composition queries
//! - [`select`] - clique selection/grouping over relations
//! - [`distance`] - all-pairs hop distances and reachability
//! - [`merge`] - whole-graph composition
//! - [`reduce`] - fixed-point local rewrites
//! - [`split_group`] - the annotation records and their set algebra
//! - [`marking`] - tokens, markings, translation maps
//! - [`node_id`] - typed node/arc handles
//! - [`composition`] - composition kinds and query relations
//! - [`payload`] - the payload contracts

pub mod analysis;
pub mod composition;
pub mod distance;
pub mod graph;
pub mod marking;
pub mod merge;
pub mod node_id;
pub mod payload;
pub mod reduce;
pub mod select;
pub mod split_group;

pub use composition::{Composition, Relation};
pub use graph::{Graph, NodePayload};
pub use marking::{Marking, Token, TranslationMap};
pub use node_id::{Arc, ArcId, NodeId, NodeKind};
pub use payload::{PlacePayload, TransitionPayload};
pub use split_group::{SetOp, SplitGroup, compare, merge as merge_split_groups, merge_inplace};
