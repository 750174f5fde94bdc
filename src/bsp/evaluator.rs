//! Cost function scoring candidate partition sides (spec.md §4.6). No
//! `partitionevaluator.h/.cpp` was present in the retrieved original-source
//! pack, so this is implemented directly from the spec's textual
//! description rather than ported from C++.

use slotmap::SlotMap;

use crate::geom::SHORT_HEDGE_EPSILON;

use super::block_tree::{BlockNodeId, BlockTree};
use super::segment::{LineRelationship, LineSegment, SegmentId, SideRef};

/// Evaluates every map-originated candidate side in `node`'s subtree and
/// returns the minimum-cost one, or `None` if no candidate remains that
/// would actually divide the set (the subspace is then convex and becomes
/// a leaf).
///
/// A candidate with zero splits and an empty left or right tally doesn't
/// divide anything: every other segment lies flush against it (it's a
/// hull edge of an already-convex region), so choosing it would hand the
/// identical candidate set back to the next recursion with one side
/// empty, collapse, and repeat forever. Such candidates are disqualified
/// rather than merely scored low.
pub fn choose_partition(
    tree: &BlockTree,
    node: BlockNodeId,
    segs: &SlotMap<SegmentId, LineSegment>,
    split_cost_factor: i32,
) -> Option<SideRef> {
    let candidates = tree.collect_preorder(node);

    let mut best: Option<(SideRef, i64)> = None;
    for &candidate_ref in &candidates {
        let seg = &segs[candidate_ref.segment];
        // Synthesized partition sides are not considered as future
        // partitions (spec.md §4.6: "candidate segment that originates
        // from a map line").
        if seg.side(candidate_ref.side).map_side.is_none() {
            continue;
        }
        let candidate_side = seg.side(candidate_ref.side);

        let mut left = 0i64;
        let mut right = 0i64;
        let mut splits = 0i64;
        let mut penalty = 0i64;

        for &other_ref in &candidates {
            if other_ref == candidate_ref {
                continue;
            }
            let other = segs[other_ref.segment].side(other_ref.side);
            let (rel, from_dist, to_dist) = other.relationship(candidate_side);
            match rel {
                LineRelationship::Collinear => {}
                LineRelationship::Right | LineRelationship::RightIntercept => right += 1,
                LineRelationship::Left | LineRelationship::LeftIntercept => left += 1,
                LineRelationship::Intersects => {
                    splits += 1;
                    let total = other.length;
                    let t = from_dist / (from_dist - to_dist);
                    let near_len = (t * total).abs();
                    let far_len = total - near_len;
                    if near_len < SHORT_HEDGE_EPSILON || far_len < SHORT_HEDGE_EPSILON {
                        penalty += 1;
                    }
                }
            }
        }

        if splits == 0 && (right == 0 || left == 0) {
            continue;
        }

        let cost = (right - left).abs() + splits * split_cost_factor as i64 + penalty * split_cost_factor as i64;
        let better = match &best {
            None => true,
            Some((best_ref, best_cost)) => {
                cost < *best_cost
                    || (cost == *best_cost && seg.index < segs[best_ref.segment].index)
            }
        };
        if better {
            best = Some((candidate_ref, cost));
        }
    }

    best.map(|(side_ref, _)| side_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::block_tree::IBounds;
    use crate::bsp::segment::SideKind;
    use crate::geom::Point2;
    use slotmap::KeyData;

    fn dummy_vertex(n: u64) -> crate::mesh::VertexId {
        crate::mesh::VertexId::from(KeyData::from_ffi(n))
    }

    fn map_side(mut seg: LineSegment, line_index: usize) -> LineSegment {
        seg.front.map_side = Some(super::super::segment::MapSideRef { line_index, side: SideKind::Front });
        seg
    }

    #[test]
    fn picks_lowest_cost_candidate_that_actually_divides_the_set() {
        // A "T": A is horizontal, B and C are perpendicular stubs landing
        // on opposite sides of A, so A is a genuine (non-degenerate)
        // partition candidate; B and C are not (nothing lands on the far
        // side of either).
        let mut segs: SlotMap<SegmentId, LineSegment> = SlotMap::with_key();
        let a = segs.insert(map_side(
            LineSegment::new(0, dummy_vertex(1), dummy_vertex(2), Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)),
            0,
        ));
        let b = segs.insert(map_side(
            LineSegment::new(1, dummy_vertex(3), dummy_vertex(4), Point2::new(10.0, 0.0), Point2::new(10.0, 10.0)),
            1,
        ));
        let c = segs.insert(map_side(
            LineSegment::new(2, dummy_vertex(5), dummy_vertex(6), Point2::new(10.0, 0.0), Point2::new(10.0, -10.0)),
            2,
        ));

        let mut tree = BlockTree::new(IBounds { min_x: -16, min_y: -16, max_x: 16, max_y: 16 });
        let a_ref = SideRef { segment: a, side: SideKind::Front };
        let b_ref = SideRef { segment: b, side: SideKind::Front };
        let c_ref = SideRef { segment: c, side: SideKind::Front };
        tree.link(tree.root, a_ref, (0, 0), (10, 0), true);
        tree.link(tree.root, b_ref, (10, 0), (10, 10), true);
        tree.link(tree.root, c_ref, (10, 0), (10, -10), true);

        let picked = choose_partition(&tree, tree.root, &segs, 7);
        assert_eq!(picked, Some(a_ref));
    }

    #[test]
    fn hull_only_candidates_are_all_disqualified_as_already_convex() {
        // A square: every edge has all three others flush on one side, so
        // none of them would actually divide the set. The region is
        // already convex and must become a leaf, not loop forever
        // re-picking the same hull edge.
        let mut segs: SlotMap<SegmentId, LineSegment> = SlotMap::with_key();
        let pts = [(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)];
        let mut tree = BlockTree::new(IBounds { min_x: 0, min_y: 0, max_x: 16, max_y: 16 });
        for i in 0..4 {
            let (fx, fy) = pts[i];
            let (tx, ty) = pts[(i + 1) % 4];
            let id = segs.insert(map_side(
                LineSegment::new(i, dummy_vertex(i as u64), dummy_vertex(i as u64 + 10), Point2::new(fx, fy), Point2::new(tx, ty)),
                i,
            ));
            let side_ref = SideRef { segment: id, side: SideKind::Front };
            tree.link(tree.root, side_ref, (fx as i32, fy as i32), (tx as i32, ty as i32), true);
        }

        assert_eq!(choose_partition(&tree, tree.root, &segs, 7), None);
    }

    #[test]
    fn no_map_originated_candidate_returns_none() {
        let segs: SlotMap<SegmentId, LineSegment> = SlotMap::with_key();
        let tree = BlockTree::new(IBounds { min_x: 0, min_y: 0, max_x: 16, max_y: 16 });
        assert_eq!(choose_partition(&tree, tree.root, &segs, 7), None);
    }
}
