//! Composition queries over the canonical handshake shapes: diamonds,
//! interleaved rings, nested splits, non-proper sharing.

use tokenflow::{Composition, Graph, Marking, NodeId, NodeKind, Relation};

fn pair_list(a: &[NodeId], b: &[NodeId]) -> Vec<(NodeId, NodeId)> {
    if b.is_empty() {
        let mut out = Vec::new();
        for i in 0..a.len() {
            for j in i + 1..a.len() {
                out.push((a[i], a[j]));
            }
        }
        out
    } else {
        a.iter()
            .flat_map(|&x| b.iter().map(move |&y| (x, y)))
            .collect()
    }
}

fn structural(rel: Relation) -> bool {
    matches!(
        rel,
        Relation::Choice | Relation::Parallel | Relation::Sequence
    )
}

/// Every cross pair must satisfy the relation under `always` and
/// `sometimes`, and no competing relation may hold. With an empty `b` the
/// pairs are drawn from within `a`.
fn assert_always(g: &mut Graph, rel: Relation, a: &[NodeId], b: &[NodeId], bidir: bool) {
    for (x, y) in pair_list(a, b) {
        if x == y {
            assert!(!g.is(rel, x, y, false), "{x} composed with itself");
            continue;
        }
        assert!(g.is(rel, x, y, true), "expected {x} always {rel:?} {y}");
        assert!(g.is(rel, x, y, false), "expected {x} sometimes {rel:?} {y}");
        if bidir {
            assert!(g.is(rel, y, x, true), "expected {y} always {rel:?} {x}");
            assert!(g.is(rel, y, x, false), "expected {y} sometimes {rel:?} {x}");
        }
        if structural(rel) {
            for other in [Relation::Choice, Relation::Parallel, Relation::Sequence] {
                if other == rel {
                    continue;
                }
                assert!(!g.is(other, x, y, false), "did not expect {x} {other:?} {y}");
                if bidir {
                    assert!(!g.is(other, y, x, false), "did not expect {y} {other:?} {x}");
                }
            }
        } else {
            let other = if rel == Relation::Implies {
                Relation::Excludes
            } else {
                Relation::Implies
            };
            assert!(!g.is(other, x, y, false), "did not expect {x} {other:?} {y}");
            if bidir {
                assert!(!g.is(other, y, x, false), "did not expect {y} {other:?} {x}");
            }
        }
    }
}

fn assert_sometimes(g: &mut Graph, rel: Relation, a: &[NodeId], b: &[NodeId], bidir: bool) {
    for (x, y) in pair_list(a, b) {
        if x == y {
            assert!(!g.is(rel, x, y, false), "{x} composed with itself");
            continue;
        }
        assert!(g.is(rel, x, y, false), "expected {x} sometimes {rel:?} {y}");
        if bidir {
            assert!(g.is(rel, y, x, false), "expected {y} sometimes {rel:?} {x}");
        }
    }
}

fn assert_never(g: &mut Graph, rel: Relation, a: &[NodeId], b: &[NodeId], bidir: bool) {
    for (x, y) in pair_list(a, b) {
        assert!(!g.is(rel, x, y, false), "did not expect {x} {rel:?} {y}");
        if bidir {
            assert!(!g.is(rel, y, x, false), "did not expect {y} {rel:?} {x}");
        }
    }
}

fn assert_not_always(g: &mut Graph, rel: Relation, a: &[NodeId], b: &[NodeId]) {
    for (x, y) in pair_list(a, b) {
        assert!(!g.is(rel, x, y, true), "did not expect {x} always {rel:?} {y}");
    }
}

#[test]
fn always_choice_diamond() {
    //          ->t0-->p1-->t1-           .
    //         /               \          .
    //  t5-->p0                 >p3-->t4  .
    //         \               /          .
    //          ->t2-->p2-->t3-           .
    let mut g: Graph = Graph::new();
    let p = g.create_many(NodeKind::Place, 4);
    let t = g.create_many(NodeKind::Transition, 6);
    g.connect_sequence(&[t[5], p[0], t[0], p[1], t[1], p[3], t[4]]);
    g.connect_sequence(&[p[0], t[2], p[2], t[3], p[3]]);

    assert_always(&mut g, Relation::Choice, &[t[0], p[1], t[1]], &[t[2], p[2], t[3]], true);
    assert_always(
        &mut g,
        Relation::Sequence,
        &[t[5], p[0], t[0], p[1], t[1], p[3], t[4]],
        &[],
        true,
    );
    assert_always(
        &mut g,
        Relation::Sequence,
        &[t[5], p[0], t[2], p[2], t[3], p[3], t[4]],
        &[],
        true,
    );

    assert_always(&mut g, Relation::Implies, &[t[0], p[1], t[1], p[3], t[4]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[2], p[2], t[3], p[3], t[4]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[5], p[0]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[1], p[1], t[0], p[0], t[5]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[3], p[2], t[2], p[0], t[5]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[4], p[3]], &[], false);

    assert_sometimes(&mut g, Relation::Excludes, &[t[5], p[0], t[4], p[3]], &[t[0], p[1], t[1]], false);
    assert_sometimes(&mut g, Relation::Excludes, &[t[5], p[0], t[4], p[3]], &[t[2], p[2], t[3]], false);
    assert_sometimes(&mut g, Relation::Implies, &[t[5], p[0], t[4], p[3]], &[t[0], p[1], t[1]], false);
    assert_sometimes(&mut g, Relation::Implies, &[t[5], p[0], t[4], p[3]], &[t[2], p[2], t[3]], false);
}

#[test]
fn always_parallel_diamond() {
    //          ->p0-->t1-->p1-           .
    //         /               \          .
    //  p5-->t0                 >t3-->p4  .
    //         \               /          .
    //          ->p2-->t2-->p3-           .
    let mut g: Graph = Graph::new();
    let p = g.create_many(NodeKind::Place, 6);
    let t = g.create_many(NodeKind::Transition, 4);
    g.connect_sequence(&[p[5], t[0], p[0], t[1], p[1], t[3], p[4]]);
    g.connect_sequence(&[t[0], p[2], t[2], p[3], t[3]]);

    assert_always(&mut g, Relation::Parallel, &[p[0], t[1], p[1]], &[p[2], t[2], p[3]], true);
    assert_always(
        &mut g,
        Relation::Sequence,
        &[p[5], t[0], p[0], t[1], p[1], t[3], p[4]],
        &[],
        true,
    );
    assert_always(
        &mut g,
        Relation::Sequence,
        &[p[5], t[0], p[2], t[2], p[3], t[3], p[4]],
        &[],
        true,
    );

    assert_always(
        &mut g,
        Relation::Implies,
        &[p[5], t[0], p[0], t[1], p[1], t[3], p[4]],
        &[],
        true,
    );
    assert_always(
        &mut g,
        Relation::Implies,
        &[p[5], t[0], p[2], t[2], p[3], t[3], p[4]],
        &[],
        true,
    );
    assert_always(&mut g, Relation::Implies, &[p[0], t[1], p[1]], &[p[2], t[2], p[3]], true);
    assert_never(
        &mut g,
        Relation::Excludes,
        &[p[5], t[0], p[0], t[1], p[1], t[3], p[4]],
        &[],
        true,
    );
    assert_never(&mut g, Relation::Excludes, &[p[0], t[1], p[1]], &[p[2], t[2], p[3]], true);
}

#[test]
fn regular_interleaved_rings() {
    //  =->*p0-->t0-->p1-->t1-=  .
    //       \ /  \ /            .
    //        X    X             .
    //       / \  / \            .
    //  =->*p2-->t2-->p3-->t3-=  .
    let mut g: Graph = Graph::new();
    let p = g.create_many(NodeKind::Place, 4);
    let t = g.create_many(NodeKind::Transition, 4);
    g.connect_sequence(&[p[0], t[0], p[1], t[1], p[0]]);
    g.connect_sequence(&[p[2], t[2], p[3], t[3], p[2]]);
    g.connect(p[0], t[2]);
    g.connect(p[2], t[0]);
    g.connect(t[0], p[3]);
    g.connect(t[2], p[1]);
    g.reset.push(Marking::from_indices(&[p[0].index, p[2].index]));

    assert_always(&mut g, Relation::Sequence, &[p[0], t[0], p[1], t[1]], &[], true);
    assert_always(&mut g, Relation::Sequence, &[p[2], t[2], p[3], t[3]], &[], true);
    assert_always(&mut g, Relation::Sequence, &[p[0], t[2], p[1], t[1]], &[], true);
    assert_always(&mut g, Relation::Sequence, &[p[2], t[0], p[3], t[3]], &[], true);
    assert_always(&mut g, Relation::Parallel, &[p[1], t[1], p[0]], &[p[3], t[3], p[2]], true);
    assert_always(&mut g, Relation::Choice, &[t[0]], &[t[2]], true);
    assert_never(
        &mut g,
        Relation::Parallel,
        &[p[1], t[1], p[0], p[3], t[3], p[2]],
        &[t[0], t[2]],
        true,
    );
    assert!(!g.is_sets(Relation::Parallel, &[p[1], p[0], p[3], p[2]], &[t[0], t[2]], false));

    assert_always(&mut g, Relation::Implies, &[p[0], p[1], t[1]], &[], false);
    assert_always(&mut g, Relation::Implies, &[p[2], p[3], t[3]], &[], false);
    assert_always(
        &mut g,
        Relation::Implies,
        &[t[0], t[2]],
        &[p[1], t[1], p[0], p[3], t[3], p[2]],
        false,
    );
    assert_sometimes(
        &mut g,
        Relation::Implies,
        &[p[1], t[1], p[0], p[3], t[3], p[2]],
        &[t[0], t[2]],
        false,
    );
    assert_sometimes(
        &mut g,
        Relation::Excludes,
        &[p[1], t[1], p[0], p[3], t[3], p[2]],
        &[t[0], t[2]],
        false,
    );
}

#[test]
fn parallel_within_choice() {
    //          -->p1-->t1-->p2           .
    //         /               \          .
    //     ->t0-->p3-->t2-->p4-->t3-      .
    //    /                         \     .
    //  p0                           >p6  .
    //    \                         /     .
    //     ->t4-->p5-->t5-----------      .
    let mut g: Graph = Graph::new();
    let p = g.create_many(NodeKind::Place, 7);
    let t = g.create_many(NodeKind::Transition, 6);
    g.connect_sequence(&[p[0], t[0], p[1], t[1], p[2], t[3]]);
    g.connect_sequence(&[t[0], p[3], t[2], p[4], t[3], p[6]]);
    g.connect_sequence(&[p[0], t[4], p[5], t[5], p[6]]);

    assert_always(
        &mut g,
        Relation::Sequence,
        &[p[0], t[0], p[1], t[1], p[2], t[3], p[6]],
        &[],
        true,
    );
    assert_always(
        &mut g,
        Relation::Sequence,
        &[p[0], t[0], p[3], t[2], p[4], t[3], p[6]],
        &[],
        true,
    );
    assert_always(&mut g, Relation::Sequence, &[p[0], t[4], p[5], t[5], p[6]], &[], true);
    assert_always(&mut g, Relation::Parallel, &[p[1], t[1], p[2]], &[p[3], t[2], p[4]], true);
    assert_always(
        &mut g,
        Relation::Choice,
        &[t[4], p[5], t[5]],
        &[t[0], p[1], t[1], p[2], p[3], t[2], p[4], t[3]],
        true,
    );

    assert_always(&mut g, Relation::Implies, &[t[0], p[1], t[1], p[2], t[3], p[6]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[3], p[2], t[1], p[1], t[0], p[0]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[0], p[3], t[2], p[4], t[3], p[6]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[3], p[4], t[2], p[3], t[0], p[0]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[4], p[5], t[5], p[6]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[5], p[5], t[4], p[0]], &[], false);
    assert_always(&mut g, Relation::Implies, &[p[1], t[1], p[2]], &[p[3], t[2], p[4]], true);
    assert_always(
        &mut g,
        Relation::Excludes,
        &[t[4], p[5], t[5]],
        &[t[0], p[1], t[1], p[2], p[3], t[2], p[4], t[3]],
        true,
    );
    assert_always(&mut g, Relation::Implies, &[p[0], p[6]], &[], false);
    assert_always(&mut g, Relation::Implies, &[p[6], p[0]], &[], false);

    let branches = [t[0], p[1], t[1], p[2], p[3], t[2], p[4], t[3], t[4], p[5], t[5]];
    assert_sometimes(&mut g, Relation::Implies, &[p[0], p[6]], &branches, false);
    assert_not_always(&mut g, Relation::Excludes, &[p[0], p[6]], &branches);
    assert_sometimes(&mut g, Relation::Excludes, &[p[0], p[6]], &branches, false);
    assert_not_always(&mut g, Relation::Implies, &[p[0], p[6]], &branches);

    // Whole partial states.
    assert!(g.is_sets(Relation::Parallel, &[p[1], t[1], p[2]], &[p[3], t[2], p[4]], true));
    assert!(g.is_sets(
        Relation::Choice,
        &[t[4], p[5], t[5]],
        &[t[0], p[1], t[1], p[2], p[3], t[2], p[4], t[3]],
        true,
    ));
    assert!(!g.is_sets(Relation::Implies, &[p[0], p[6]], &[t[4], p[5], t[5]], true));
    assert!(g.is_sets(Relation::Implies, &[p[0], p[6]], &[t[4], p[5], t[5]], false));
}

#[test]
fn choice_within_parallel() {
    //          -->t1-->p1-->t2           .
    //         /               \          .
    //     ->p0-->t3-->p2-->t4-->p3-      .
    //    /                         \     .
    //  t0                           >t6  .
    //    \                         /     .
    //     ->p4-->t5-->p5-----------      .
    let mut g: Graph = Graph::new();
    let p = g.create_many(NodeKind::Place, 6);
    let t = g.create_many(NodeKind::Transition, 7);
    g.connect_sequence(&[t[0], p[0], t[1], p[1], t[2], p[3]]);
    g.connect_sequence(&[p[0], t[3], p[2], t[4], p[3], t[6]]);
    g.connect_sequence(&[t[0], p[4], t[5], p[5], t[6]]);

    assert_always(
        &mut g,
        Relation::Sequence,
        &[t[0], p[0], t[1], p[1], t[2], p[3], t[6]],
        &[],
        true,
    );
    assert_always(
        &mut g,
        Relation::Sequence,
        &[t[0], p[0], t[3], p[2], t[4], p[3], t[6]],
        &[],
        true,
    );
    assert_always(&mut g, Relation::Sequence, &[t[0], p[4], t[5], p[5], t[6]], &[], true);
    assert_always(&mut g, Relation::Sequence, &[t[0], p[0], p[3], t[6]], &[], true);
    assert_always(&mut g, Relation::Choice, &[t[1], p[1], t[2]], &[t[3], p[2], t[4]], true);
    assert_always(
        &mut g,
        Relation::Parallel,
        &[p[0], t[1], p[1], t[2], t[3], p[2], t[4], p[3]],
        &[p[4], t[5], p[5]],
        true,
    );
    assert_always(&mut g, Relation::Parallel, &[p[4], t[5], p[5]], &[p[0], p[3]], true);
    assert_sometimes(
        &mut g,
        Relation::Parallel,
        &[p[4], t[5], p[5]],
        &[t[1], p[1], t[2], t[3], p[2], t[4]],
        true,
    );
    assert_never(
        &mut g,
        Relation::Sequence,
        &[p[4], t[5], p[5]],
        &[t[1], p[1], t[2], t[3], p[2], t[4]],
        true,
    );

    assert_always(&mut g, Relation::Implies, &[t[1], p[1], t[2], p[3], t[6]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[3], p[2], t[4], p[3], t[6]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[0], p[4], t[5], p[5], t[6]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[2], p[1], t[1], p[0], t[0]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[0], p[0], p[3], t[6]], &[], true);
    assert_always(&mut g, Relation::Excludes, &[t[1], p[1], t[2]], &[t[3], p[2], t[4]], true);
    assert_always(
        &mut g,
        Relation::Implies,
        &[p[0], t[1], p[1], t[2], t[3], p[2], t[4], p[3]],
        &[p[4], t[5], p[5]],
        false,
    );
    assert_always(&mut g, Relation::Implies, &[p[4], t[5], p[5]], &[p[0], p[3]], false);
    assert_sometimes(
        &mut g,
        Relation::Implies,
        &[p[4], t[5], p[5]],
        &[t[1], p[1], t[2], t[3], p[2], t[4]],
        false,
    );
    assert_sometimes(
        &mut g,
        Relation::Excludes,
        &[p[4], t[5], p[5]],
        &[t[1], p[1], t[2], t[3], p[2], t[4]],
        false,
    );
    assert_sometimes(
        &mut g,
        Relation::Implies,
        &[p[0], p[3]],
        &[t[1], p[1], t[2], t[3], p[2], t[4]],
        false,
    );
    assert_sometimes(
        &mut g,
        Relation::Excludes,
        &[p[0], p[3]],
        &[t[1], p[1], t[2], t[3], p[2], t[4]],
        false,
    );
}

#[test]
fn nonproper_choice_sharing() {
    //     ->t0-->p1-->t1-->p2-->t2-      .
    //    /         \               \     .
    //  p0           ->t6-           >p5  .
    //    \               \         /     .
    //     ->t3-->p3-->t4-->p4-->t5-      .
    let mut g: Graph = Graph::new();
    let p = g.create_many(NodeKind::Place, 6);
    let t = g.create_many(NodeKind::Transition, 7);
    g.connect_sequence(&[p[0], t[0], p[1], t[1], p[2], t[2], p[5]]);
    g.connect_sequence(&[p[0], t[3], p[3], t[4], p[4], t[5], p[5]]);
    g.connect(p[1], t[6]);
    g.connect(t[6], p[4]);

    assert!(g.is(Relation::Choice, t[1], t[6], true));
    assert!(g.is(Relation::Choice, t[3], t[6], true));

    assert_always(
        &mut g,
        Relation::Choice,
        &[t[0], p[1], t[1], p[2], t[2]],
        &[t[3], p[3], t[4]],
        true,
    );
    assert_always(&mut g, Relation::Choice, &[t[1], p[2], t[2]], &[t[6]], true);
    assert_always(
        &mut g,
        Relation::Choice,
        &[t[6]],
        &[t[3], p[3], t[4], t[1], p[2], t[2]],
        true,
    );
    assert_always(
        &mut g,
        Relation::Sequence,
        &[p[0], t[0], p[1], t[1], p[2], t[2], p[5]],
        &[],
        true,
    );
    assert_always(
        &mut g,
        Relation::Sequence,
        &[p[0], t[3], p[3], t[4], p[4], t[5], p[5]],
        &[],
        true,
    );
    assert_always(
        &mut g,
        Relation::Sequence,
        &[p[0], t[0], p[1], t[6], p[4], t[5], p[5]],
        &[],
        true,
    );

    assert_always(&mut g, Relation::Implies, &[t[0], p[1], p[5]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[1], p[2], t[2], p[5]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[6], p[4], t[5], p[5]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[2], p[2], t[1], p[1], t[0], p[0]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[5], p[4], p[0]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[6], p[1], t[0], p[0]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[4], p[3], t[3], p[0]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[3], p[3], t[4], p[5]], &[], false);
    assert_always(&mut g, Relation::Implies, &[p[4], t[5], p[5]], &[], false);
    assert_sometimes(&mut g, Relation::Implies, &[t[3], p[3], t[4]], &[p[4], t[5]], false);

    assert_always(
        &mut g,
        Relation::Excludes,
        &[t[0], p[1], t[1], p[2], t[2]],
        &[t[3], p[3], t[4]],
        true,
    );
    assert_always(&mut g, Relation::Excludes, &[t[1], p[2], t[2]], &[t[6]], true);
    assert_always(
        &mut g,
        Relation::Excludes,
        &[t[6]],
        &[t[3], p[3], t[4], t[1], p[2], t[2]],
        true,
    );
}

#[test]
fn nonproper_parallel_sharing() {
    //     ->p0-->t1-->p1-->t2-->p2-      .
    //    /         \               \     .
    //  t0           ->p6-           >t5  .
    //    \               \         /     .
    //     ->p3-->t3-->p4-->t4-->p5-      .
    let mut g: Graph = Graph::new();
    let p = g.create_many(NodeKind::Place, 7);
    let t = g.create_many(NodeKind::Transition, 6);
    g.connect_sequence(&[t[0], p[0], t[1], p[1], t[2], p[2], t[5]]);
    g.connect_sequence(&[t[0], p[3], t[3], p[4], t[4], p[5], t[5]]);
    g.connect(t[1], p[6]);
    g.connect(p[6], t[4]);

    assert_always(
        &mut g,
        Relation::Parallel,
        &[p[0], t[1], p[1], t[2], p[2], p[6]],
        &[p[3], t[3], p[4]],
        true,
    );
    assert_always(&mut g, Relation::Parallel, &[p[1], t[2], p[2]], &[p[6]], true);
    assert_always(
        &mut g,
        Relation::Sequence,
        &[t[0], p[0], t[1], p[1], t[2], p[2], t[5]],
        &[],
        true,
    );
    assert_always(
        &mut g,
        Relation::Sequence,
        &[t[0], p[3], t[3], p[4], t[4], p[5], t[5]],
        &[],
        true,
    );
    assert_always(
        &mut g,
        Relation::Sequence,
        &[t[0], p[0], t[1], p[6], t[4], p[5], t[5]],
        &[],
        true,
    );

    let everything = [
        t[0], p[0], t[1], p[1], t[2], p[2], t[5], p[6], p[3], t[3], p[4], t[4], p[5],
    ];
    assert_always(&mut g, Relation::Implies, &everything, &[], true);
}

#[test]
fn shared_choice_branches() {
    //          ->p1-->t1-->p2-->t2-->p3             .
    //         /                        \            .
    //     ->t0                          ->t5        .
    //    /    \                        /    \       .
    //  p0      ->p4-->t3-->p5-->t4-->p6      ->p10  .
    //    \    /                        \    /       .
    //     ->t6                          ->t9        .
    //         \                        /            .
    //          ->p7-->t7-->p8-->t8-->p9             .
    let mut g: Graph = Graph::new();
    let p = g.create_many(NodeKind::Place, 11);
    let t = g.create_many(NodeKind::Transition, 10);
    g.connect_sequence(&[p[0], t[0], p[1], t[1], p[2], t[2], p[3], t[5], p[10]]);
    g.connect_sequence(&[t[0], p[4], t[3], p[5], t[4], p[6], t[5]]);
    g.connect_sequence(&[p[0], t[6], p[4]]);
    g.connect_sequence(&[p[6], t[9], p[10]]);
    g.connect_sequence(&[t[6], p[7], t[7], p[8], t[8], p[9], t[9]]);

    assert_always(
        &mut g,
        Relation::Sequence,
        &[p[0], t[0], p[1], t[1], p[2], t[2], p[3], t[5], p[10]],
        &[],
        true,
    );
    assert_always(
        &mut g,
        Relation::Sequence,
        &[p[0], p[4], t[3], p[5], t[4], p[6], p[10]],
        &[],
        true,
    );
    assert_sometimes(
        &mut g,
        Relation::Sequence,
        &[p[0], t[0], p[4], t[3], p[5], t[4], p[6], t[5], p[10]],
        &[],
        true,
    );
    assert_always(
        &mut g,
        Relation::Sequence,
        &[p[0], t[6], p[7], t[7], p[8], t[8], p[9], t[9], p[10]],
        &[],
        true,
    );
    assert_always(
        &mut g,
        Relation::Choice,
        &[t[0], p[1], t[1], p[2], t[2], p[3], t[5]],
        &[t[6], p[7], t[7], p[8], t[8], p[9], t[9]],
        true,
    );

    assert_sometimes(
        &mut g,
        Relation::Parallel,
        &[p[4], t[3], p[5], t[4], p[6]],
        &[p[7], t[7], p[8], t[8], p[9]],
        false,
    );
    assert_sometimes(
        &mut g,
        Relation::Parallel,
        &[p[4], t[3], p[5], t[4], p[6]],
        &[p[1], t[1], p[2], t[2], p[3]],
        false,
    );

    assert_always(&mut g, Relation::Implies, &[t[0], p[1], t[1], p[2], t[2], p[3]], &[], false);
    assert_always(&mut g, Relation::Implies, &[t[0]], &[p[4], t[3], p[5], t[4], p[6]], false);
    assert_always(&mut g, Relation::Implies, &[t[6], p[7], t[7], p[8], t[8], p[9]], &[], false);
    assert_always(
        &mut g,
        Relation::Implies,
        &[p[0], p[4], t[3], p[5], t[4], p[6], p[10]],
        &[],
        false,
    );
    assert_always(
        &mut g,
        Relation::Implies,
        &[p[7], t[7], p[8], t[8], p[9]],
        &[p[4], t[3], p[5], t[4], p[6]],
        false,
    );
    assert_always(
        &mut g,
        Relation::Implies,
        &[p[1], t[1], p[2], t[2], p[3]],
        &[p[4], t[3], p[5], t[4], p[6]],
        false,
    );
    assert_always(
        &mut g,
        Relation::Excludes,
        &[t[0], p[1], t[1], p[2], t[2], p[3], t[5]],
        &[t[6], p[7], t[7], p[8], t[8], p[9], t[9]],
        true,
    );
    assert_sometimes(
        &mut g,
        Relation::Excludes,
        &[p[4], t[3], p[5], t[4], p[6]],
        &[p[7], t[7], p[8], t[8], p[9]],
        false,
    );
    assert_sometimes(
        &mut g,
        Relation::Implies,
        &[p[4], t[3], p[5], t[4], p[6]],
        &[p[7], t[7], p[8], t[8], p[9]],
        false,
    );
}

#[test]
fn choice_of_parallel_diamonds_sets() {
    //          ->t1-->p1-->t2-           .
    //         /               \          .
    //     ->p0                 >p3       .
    //    /    \               /   \      .
    //   /      ->t3-->p2-->t4-     \     .
    // t0                            >t9  .
    //   \      ->t5-->p5-->t6-     /     .
    //    \    /               \   /      .
    //     ->p4                 >p7       .
    //         \               /          .
    //          ->t7-->p6-->t8-           .
    let mut g: Graph = Graph::new();
    let p = g.create_many(NodeKind::Place, 8);
    let t = g.create_many(NodeKind::Transition, 10);
    g.connect_sequence(&[t[0], p[0], t[1], p[1], t[2], p[3], t[9]]);
    g.connect_sequence(&[p[0], t[3], p[2], t[4], p[3]]);
    g.connect_sequence(&[t[0], p[4], t[5], p[5], t[6], p[7], t[9]]);
    g.connect_sequence(&[p[4], t[7], p[6], t[8], p[7]]);

    assert!(g.is_sets(Relation::Choice, &[p[1], p[5]], &[p[2], p[6]], false));
    assert!(g.is_sets(Relation::Choice, &[p[1], p[5]], &[p[2], p[5]], false));
    assert!(!g.is_sets(Relation::Parallel, &[p[1], p[5]], &[p[2], p[6]], false));
    assert!(!g.is_sets(Relation::Parallel, &[p[1], p[5]], &[p[2], p[5]], false));
    assert!(!g.is_sets(Relation::Sequence, &[p[1], p[5]], &[p[2], p[6]], false));
    assert!(!g.is_sets(Relation::Sequence, &[p[1], p[5]], &[p[2], p[5]], false));
    assert!(g.is_sets(Relation::Sequence, &[p[0], p[4]], &[p[3], p[7]], false));
    assert!(!g.is_sets(Relation::Choice, &[p[0], p[4]], &[p[3], p[7]], false));
    assert!(!g.is_sets(Relation::Parallel, &[p[0], p[4]], &[p[3], p[7]], false));

    assert!(g.is_sets(Relation::Excludes, &[p[1], p[5]], &[p[2], p[6]], false));
    assert!(g.is_sets(Relation::Excludes, &[p[1], p[5]], &[p[2], p[5]], false));
    assert!(!g.is_sets(Relation::Implies, &[p[1], p[5]], &[p[2], p[6]], false));
    assert!(!g.is_sets(Relation::Implies, &[p[1], p[5]], &[p[2], p[5]], false));
    assert!(!g.is_sets(Relation::Excludes, &[p[0], p[4]], &[p[3], p[7]], false));
    assert!(g.is_sets(Relation::Implies, &[p[0], p[4]], &[p[3], p[7]], false));

    // Duplicate members and self-overlap degenerate to the neutral answer.
    assert!(!g.is_sets(Relation::Choice, &[p[1], p[1]], &[p[1]], false));
    assert!(!g.is_sets(Relation::Parallel, &[], &[p[1]], false));
}

#[test]
fn nested_parallel_diamonds_sets() {
    //               ->p1-->t2-->p2-                .
    //              /               \               .
    //     ->p0-->t1                 >t4-->p5       .
    //    /         \               /        \      .
    //   /           ->p3-->t3-->p4-          \     .
    // t0                                      >t9  .
    //   \           ->p7-->t6-->p8-          /     .
    //    \         /               \        /      .
    //     ->p6-->t5                 >t8-->p11      .
    //              \               /               .
    //               ->p9-->t7-->p10                .
    let mut g: Graph = Graph::new();
    let p = g.create_many(NodeKind::Place, 12);
    let t = g.create_many(NodeKind::Transition, 10);
    g.connect_sequence(&[t[0], p[0], t[1], p[1], t[2], p[2], t[4], p[5], t[9]]);
    g.connect_sequence(&[t[1], p[3], t[3], p[4], t[4]]);
    g.connect_sequence(&[t[0], p[6], t[5], p[7], t[6], p[8], t[8], p[11], t[9]]);
    g.connect_sequence(&[t[5], p[9], t[7], p[10], t[8]]);

    assert!(g.is_sets(Relation::Parallel, &[t[2], t[3]], &[t[6], t[7]], false));
    assert!(!g.is_sets(Relation::Choice, &[t[2], t[3]], &[t[6], t[7]], false));
    assert!(!g.is_sets(Relation::Sequence, &[t[2], t[3]], &[t[6], t[7]], false));
    assert!(g.is_sets(Relation::Parallel, &[t[2], t[6]], &[t[3], t[7]], false));
    assert!(g.is_sets(Relation::Parallel, &[t[2], t[6]], &[t[6], t[7]], false));

    assert!(g.is_sets(Relation::Sequence, &[p[1], p[3]], &[p[2], p[4]], false));
    assert!(!g.is_sets(Relation::Choice, &[p[1], p[3]], &[p[2], p[4]], false));
    assert!(!g.is_sets(Relation::Parallel, &[p[1], p[3]], &[p[2], p[4]], false));

    assert!(g.is_sets(Relation::Implies, &[t[2], t[3]], &[t[6], t[7]], false));
    assert!(!g.is_sets(Relation::Excludes, &[t[2], t[3]], &[t[6], t[7]], false));
    assert!(g.is_sets(Relation::Implies, &[p[1], p[3]], &[p[2], p[4]], false));
    assert!(!g.is_sets(Relation::Excludes, &[p[1], p[3]], &[p[2], p[4]], false));
}

#[test]
fn redundant_places_are_detected_and_pruned() {
    //          ->p0-->t1-->p1-           .
    //         /               \          .
    //  p5-->t0-->pr------------>t3-->p4  .
    //         \               /          .
    //          ->p2-->t2-->p3-           .
    let mut g: Graph = Graph::new();
    let p = g.create_many(NodeKind::Place, 6);
    let t = g.create_many(NodeKind::Transition, 4);
    g.connect_sequence(&[p[5], t[0], p[0], t[1], p[1], t[3], p[4]]);
    g.connect_sequence(&[t[0], p[2], t[2], p[3], t[3]]);
    let pr = g.create(NodeKind::Place);
    g.connect(t[0], pr);
    g.connect(pr, t[3]);

    // pr spans the whole fork, so its token adds nothing beyond either
    // branch place's.
    assert!(g.is_redundant_to(pr, p[0]));
    assert!(g.is_redundant(pr));
    assert!(!g.is_redundant(p[0]));
    assert!(!g.is_redundant_to(p[0], p[2]));

    assert_eq!(vec![p[0], pr], g.add_redundant(vec![p[0]]));

    g.erase_redundant();
    assert_eq!(6, g.size_of(NodeKind::Place));
    assert!(!g.is_redundant(p[0]));
}

#[test]
fn crosses_reset_spans_the_initial_marking() {
    // Two independent marked rings; each carries its own initial-marking
    // sentinel around the loop.
    let mut g: Graph = Graph::new();
    let p = g.create_many(NodeKind::Place, 4);
    let t = g.create_many(NodeKind::Transition, 4);
    g.connect_sequence(&[p[0], t[0], p[1], t[1], p[0]]);
    g.connect_sequence(&[p[2], t[2], p[3], t[3], p[2]]);
    g.reset.push(Marking::from_indices(&[p[0].index, p[2].index]));

    assert!(!g.crosses_reset(&[p[0]]));
    assert!(!g.crosses_reset(&[p[1]]));
    assert!(g.crosses_reset(&[p[0], p[1]]));
    assert!(g.crosses_reset(&[t[0], p[0]]));
}

#[test]
fn invert_complements_split_branches() {
    let mut g: Graph = Graph::new();
    let p = g.create_many(NodeKind::Place, 4);
    let t = g.create_many(NodeKind::Transition, 6);
    g.connect_sequence(&[t[5], p[0], t[0], p[1], t[1], p[3], t[4]]);
    g.connect_sequence(&[p[0], t[2], p[2], t[3], p[3]]);

    let groups = g.split_groups_of(Composition::Choice, t[0]);
    assert_eq!(1, groups.len());
    assert_eq!(Some(p[0].index), groups[0].split);
    assert_eq!(vec![t[0].index], groups[0].branches);

    let inverted = g.invert(Composition::Choice, groups);
    assert_eq!(vec![t[2].index], inverted[0].branches);
}

#[test]
fn queries_recompute_after_edits() {
    // A straight chain has no choice anywhere; adding a second branch off
    // its head place must flip the answer without an explicit recompute.
    let mut g: Graph = Graph::new();
    let p = g.create_many(NodeKind::Place, 2);
    let t = g.create_many(NodeKind::Transition, 2);
    g.connect_sequence(&[p[0], t[0], p[1], t[1]]);

    assert!(!g.is(Relation::Choice, t[0], t[1], false));
    assert!(g.is(Relation::Sequence, t[0], t[1], true));

    let t2 = g.create(NodeKind::Transition);
    g.connect(p[0], t2);

    assert!(g.is(Relation::Choice, t[0], t2, true));
    assert!(!g.is(Relation::Choice, t[0], t[1], false));
}
