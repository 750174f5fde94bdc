//! Top-level orchestration: turns a set of map lines into a [`BspTree`]
//! plus a [`Mesh`] holding the built leaf geometries (spec.md §4, §6).
//! Grounded on `original_source/.../src/world/bsp/partitioner.cpp` in full.

use std::collections::HashMap;

use log::{debug, trace};
use slotmap::SlotMap;

use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::events::BuildEvent;
use crate::geom::{Point2, SlopeType, DIST_EPSILON};
use crate::map::Line;
use crate::mesh::{Mesh, VertexId};

use super::block_tree::{BlockNodeId, BlockTree, IBounds};
use super::edgetip::{EdgeTip, EdgeTips};
use super::evaluator::choose_partition;
use super::hplane::HPlane;
use super::segment::{
    Edge, LineRelationship, LineSegment, MapSideRef, SegmentId, Side, SideKind, SideRef,
};
use super::subspace::{ConvexSubspaceProxy, SubspaceId};
use super::tree::{BspElement, BspTree, Partition};

/// Builds a [`BspTree`] from a set of map lines, writing the resulting
/// geometry into a caller-supplied [`Mesh`] (spec.md §3 Partitioner).
#[derive(Debug, Default)]
pub struct Partitioner {
    config: BuildConfig,

    segments: SlotMap<SegmentId, LineSegment>,
    subspaces: SlotMap<SubspaceId, ConvexSubspaceProxy>,
    edge_tips: HashMap<VertexId, EdgeTips>,
    hplane: HPlane,

    events: Vec<BuildEvent>,
    vertex_count: usize,
    segment_count: usize,
    next_synthetic_index: usize,
}

impl Partitioner {
    pub fn new(config: BuildConfig) -> Self {
        Partitioner {
            config,
            ..Default::default()
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Resolve a leaf's [`SubspaceId`] (spec.md §3 BspLeaf) to the built
    /// subspace, giving access to its DCEL face(s) for callers that need to
    /// walk the returned geometry.
    pub fn subspace(&self, id: SubspaceId) -> &ConvexSubspaceProxy {
        &self.subspaces[id]
    }

    /// Build the tree for `lines` into `mesh`, returning it along with any
    /// non-fatal events noticed along the way (spec.md §4.8).
    pub fn make_bsp_tree(
        &mut self,
        lines: &[Line],
        mesh: &mut Mesh,
    ) -> Result<(BspTree, Vec<BuildEvent>), BuildError> {
        self.segments.clear();
        self.subspaces.clear();
        self.edge_tips.clear();
        self.hplane.clear_intercepts();
        self.events.clear();
        self.vertex_count = 0;
        self.segment_count = 0;
        self.next_synthetic_index = 0;

        let mut sorted: Vec<&Line> = lines.iter().collect();
        sorted.sort_by_key(|l| l.index);

        let mut seen_indices: Vec<usize> = Vec::with_capacity(sorted.len());
        for line in &sorted {
            if seen_indices.contains(&line.index) {
                return Err(BuildError::DuplicateLineIndex { index: line.index });
            }
            seen_indices.push(line.index);
            if line.start.x == line.end.x && line.start.y == line.end.y {
                return Err(BuildError::ZeroLengthSegment { index: line.index });
            }
        }

        let bounds = blockmap_bounds(&sorted);
        let mut block_tree = BlockTree::new(bounds);
        let mut vertex_cache: HashMap<(u64, u64), VertexId> = HashMap::new();

        self.create_initial_line_segments(&sorted, mesh, &mut block_tree, &mut vertex_cache);

        let root_node = block_tree.root;
        let root = self.partition_space(mesh, &mut block_tree, root_node)?;
        let Some(mut root) = root else {
            return Err(BuildError::StructuralInvariant(
                "no line segments to partition".into(),
            ));
        };

        self.split_overlapping_segments(mesh);
        self.build_subspace_geometries(mesh)?;
        self.backfill_leaf_sectors(&mut root);

        Ok((root, std::mem::take(&mut self.events)))
    }

    fn get_or_create_vertex(
        &mut self,
        mesh: &mut Mesh,
        cache: &mut HashMap<(u64, u64), VertexId>,
        p: Point2,
    ) -> VertexId {
        let key = (p.x.to_bits(), p.y.to_bits());
        if let Some(&id) = cache.get(&key) {
            return id;
        }
        let id = mesh.new_vertex(p);
        cache.insert(key, id);
        self.vertex_count += 1;
        id
    }

    /// spec.md §4.8 step 1: one [`LineSegment`] per map line, linked into
    /// the block tree by whichever sides have a sector, with an
    /// [`EdgeTip`] seeded at each endpoint.
    fn create_initial_line_segments(
        &mut self,
        lines: &[&Line],
        mesh: &mut Mesh,
        block_tree: &mut BlockTree,
        vertex_cache: &mut HashMap<(u64, u64), VertexId>,
    ) {
        for line in lines {
            let from_vertex = self.get_or_create_vertex(mesh, vertex_cache, line.start.point());
            let to_vertex = self.get_or_create_vertex(mesh, vertex_cache, line.end.point());

            let mut seg = LineSegment::new(line.index, from_vertex, to_vertex, line.start.point(), line.end.point());
            seg.front.sector = line.front_sector;
            seg.front.map_side = Some(MapSideRef { line_index: line.index, side: SideKind::Front });
            seg.back.sector = line.effective_back_sector();
            seg.back.map_side = Some(MapSideRef { line_index: line.index, side: SideKind::Back });
            let seg_id = self.segments.insert(seg);
            let root = block_tree.root;

            if self.segments[seg_id].front.sector.is_some() {
                self.link_side(block_tree, root, SideRef { segment: seg_id, side: SideKind::Front });
            }
            if self.segments[seg_id].back.sector.is_some() {
                self.link_side(block_tree, root, SideRef { segment: seg_id, side: SideKind::Back });
            }

            self.insert_edge_tips_for_segment(seg_id);
        }
    }

    /// EdgeTip(seg.front()) at the from-vertex, EdgeTip(seg.back()) at the
    /// to-vertex (edgetip.h constructor, mirrored at both endpoints).
    fn insert_edge_tips_for_segment(&mut self, seg_id: SegmentId) {
        let seg = &self.segments[seg_id];
        let front_has_sector = seg.front.sector.is_some();
        let back_has_sector = seg.back.sector.is_some();

        let tip_from = EdgeTip {
            angle: seg.front.angle,
            front: front_has_sector.then_some((seg_id, SideKind::Front)),
            back: back_has_sector.then_some((seg_id, SideKind::Back)),
        };
        let tip_to = EdgeTip {
            angle: seg.back.angle,
            front: back_has_sector.then_some((seg_id, SideKind::Back)),
            back: front_has_sector.then_some((seg_id, SideKind::Front)),
        };
        let (from_vertex, to_vertex) = (seg.front.from_vertex, seg.front.to_vertex);

        self.edge_tips.entry(from_vertex).or_default().insert(tip_from);
        self.edge_tips.entry(to_vertex).or_default().insert(tip_to);
    }

    fn clear_edge_tips_for_segment(&mut self, seg_id: SegmentId, from_vertex: VertexId, to_vertex: VertexId) {
        if let Some(tips) = self.edge_tips.get_mut(&from_vertex) {
            tips.clear_by_segment(seg_id);
        }
        if let Some(tips) = self.edge_tips.get_mut(&to_vertex) {
            tips.clear_by_segment(seg_id);
        }
    }

    fn link_side(&mut self, block_tree: &mut BlockTree, root: BlockNodeId, side_ref: SideRef) {
        let side = self.segments[side_ref.segment].side(side_ref.side);
        let from = to_grid(side.from);
        let to = to_grid(side.to);
        let is_map_originated = side.map_side.is_some();
        let node = block_tree.link(root, side_ref, from, to, is_map_originated);
        self.segments[side_ref.segment].side_mut(side_ref.side).block_node = Some(node);
    }

    /// Whether `side_ref`'s own owning segment is self-referencing (front and
    /// back attributed to the same sector). Used to classify the *resolved*
    /// before/after segment at a partition gap (partitioner.cpp:662,665
    /// `afterLineSegment()->mapLine().isSelfReferencing()` /
    /// `beforeLineSegment()->mapLine().isSelfReferencing()`), which is not
    /// necessarily the segment that created the intercept in the first place
    /// (several segments can converge at the same vertex).
    fn side_segment_is_self_referencing(&self, side_ref: SideRef) -> bool {
        let seg = &self.segments[side_ref.segment];
        seg.front.sector.is_some() && seg.front.sector == seg.back.sector
    }

    fn intercept_partition(&mut self, side_ref: SideRef, edge: Edge) {
        let side = self.segments[side_ref.segment].side(side_ref.side).clone();
        let vertex = match edge {
            Edge::From => side.from_vertex,
            Edge::To => side.to_vertex,
        };
        let seg = &self.segments[side_ref.segment];
        let self_referencing = seg.front.sector.is_some() && seg.front.sector == seg.back.sector;
        let tips = self.edge_tips.entry(vertex).or_default().clone();
        self.hplane.intercept(side_ref, &side, edge, &tips, &self.segments, self_referencing);
    }

    /// spec.md §4.5 `intersect`, with the horizontal/vertical special cases
    /// from `intersectPartition` (spec.md §F).
    fn intersect_partition_point(&self, side: &Side, from_dist: f64, to_dist: f64) -> Point2 {
        if self.hplane.slope_type == Some(SlopeType::Horizontal) && side.slope_type == SlopeType::Vertical {
            return Point2::new(side.from.x, self.hplane.origin.y);
        }
        if self.hplane.slope_type == Some(SlopeType::Vertical) && side.slope_type == SlopeType::Horizontal {
            return Point2::new(self.hplane.origin.x, side.from.y);
        }
        let ds = from_dist / (from_dist - to_dist);
        let mut point = side.from;
        if side.slope_type != SlopeType::Vertical {
            point.x += side.direction.x * ds;
        }
        if side.slope_type != SlopeType::Horizontal {
            point.y += side.direction.y * ds;
        }
        point
    }

    /// Splits the segment referenced by `kind` at `point`. The existing
    /// segment keeps the portion from its own origin up to `point`; a newly
    /// allocated segment becomes the far portion, in the direction of
    /// `side_ref.side` (linesegment split, partitioner.cpp `splitLineSegment`).
    fn split_line_segment(
        &mut self,
        mesh: &mut Mesh,
        side_ref: SideRef,
        point: Point2,
        update_edge_tips: bool,
    ) -> SideRef {
        let kind = side_ref.side;
        let old_id = side_ref.segment;

        let (old_index, old_from_vertex, old_to_vertex, old_from, old_to, front_sector, back_sector, front_map, partition_map_line) = {
            let old = &self.segments[old_id];
            (
                old.index,
                old.front.from_vertex,
                old.front.to_vertex,
                old.front.from,
                old.front.to,
                old.front.sector,
                old.back.sector,
                old.front.map_side,
                old.front.partition_map_line,
            )
        };

        let new_vertex = mesh.new_vertex(point);
        self.vertex_count += 1;

        let mut new_seg = LineSegment::new(old_index, old_from_vertex, old_to_vertex, old_from, old_to);
        new_seg.front.sector = front_sector;
        new_seg.front.map_side = front_map;
        new_seg.front.partition_map_line = partition_map_line;
        new_seg.back.sector = back_sector;
        new_seg.back.map_side = front_map.map(|m| MapSideRef { line_index: m.line_index, side: SideKind::Back });
        new_seg.back.partition_map_line = partition_map_line;
        let new_id = self.segments.insert(new_seg);

        let opposite = kind.opposite();
        let (old_replace_edge, new_replace_edge) = match kind {
            SideKind::Front => (Edge::To, Edge::From),
            SideKind::Back => (Edge::From, Edge::To),
        };
        self.segments[old_id].replace_vertex(old_replace_edge, new_vertex, point);
        self.segments[new_id].replace_vertex(new_replace_edge, new_vertex, point);

        let front_right_ref = SideRef { segment: new_id, side: kind };
        let old_opposite_ref = SideRef { segment: old_id, side: opposite };
        let new_opposite_ref = SideRef { segment: new_id, side: opposite };

        self.segments[old_id].side_mut(kind).right_neighbor = Some(front_right_ref);
        self.segments[new_id].side_mut(kind).left_neighbor = Some(side_ref);
        self.segments[old_id].side_mut(opposite).left_neighbor = Some(new_opposite_ref);
        self.segments[new_id].side_mut(opposite).right_neighbor = Some(old_opposite_ref);

        for &(src, dst) in &[(side_ref, front_right_ref), (old_opposite_ref, new_opposite_ref)] {
            if let Some(subspace_id) = self.segments[src.segment].side(src.side).subspace {
                self.subspaces[subspace_id].add_one_segment(dst);
                self.segments[dst.segment].side_mut(dst.side).subspace = Some(subspace_id);
            }
        }

        if update_edge_tips {
            self.clear_edge_tips_for_segment(old_id, old_from_vertex, old_to_vertex);
            self.clear_edge_tips_for_segment(new_id, old_from_vertex, old_to_vertex);
            self.insert_edge_tips_for_segment(old_id);
            self.insert_edge_tips_for_segment(new_id);
        }

        front_right_ref
    }

    /// spec.md §4.4/§4.8 step 3(b): classify `side_ref` against the current
    /// partition and route it (or its two halves) into `rights`/`lefts`.
    fn divide_one_segment(
        &mut self,
        mesh: &mut Mesh,
        block_tree: &mut BlockTree,
        side_ref: SideRef,
        rights: BlockNodeId,
        lefts: BlockNodeId,
    ) {
        let side = self.segments[side_ref.segment].side(side_ref.side).clone();
        let (rel, from_dist, to_dist) = self.hplane.relationship(&side);

        match rel {
            LineRelationship::Collinear => {
                self.intercept_partition(side_ref, Edge::From);
                self.intercept_partition(side_ref, Edge::To);
                if side.direction.dot(self.hplane.direction) < 0.0 {
                    self.link_side(block_tree, lefts, side_ref);
                } else {
                    self.link_side(block_tree, rights, side_ref);
                }
            }
            LineRelationship::Right | LineRelationship::RightIntercept => {
                if rel == LineRelationship::RightIntercept {
                    let edge = if from_dist < DIST_EPSILON { Edge::From } else { Edge::To };
                    self.intercept_partition(side_ref, edge);
                }
                self.link_side(block_tree, rights, side_ref);
            }
            LineRelationship::Left | LineRelationship::LeftIntercept => {
                if rel == LineRelationship::LeftIntercept {
                    let edge = if from_dist > -DIST_EPSILON { Edge::From } else { Edge::To };
                    self.intercept_partition(side_ref, edge);
                }
                self.link_side(block_tree, lefts, side_ref);
            }
            LineRelationship::Intersects => {
                let point = self.intersect_partition_point(&side, from_dist, to_dist);
                let new_side_ref = self.split_line_segment(mesh, side_ref, point, true);

                let opposite = side_ref.side.opposite();
                let old_opposite_ref = SideRef { segment: side_ref.segment, side: opposite };
                let new_opposite_ref = SideRef { segment: new_side_ref.segment, side: opposite };
                if let Some(back_block) = self.segments[old_opposite_ref.segment].side(old_opposite_ref.side).block_node {
                    self.link_side(block_tree, back_block, new_opposite_ref);
                }

                self.intercept_partition(side_ref, Edge::To);

                if from_dist < 0.0 {
                    self.link_side(block_tree, rights, new_side_ref);
                    self.link_side(block_tree, lefts, side_ref);
                } else {
                    self.link_side(block_tree, rights, side_ref);
                    self.link_side(block_tree, lefts, new_side_ref);
                }
            }
        }
    }

    fn divide_segments(
        &mut self,
        mesh: &mut Mesh,
        block_tree: &mut BlockTree,
        node: BlockNodeId,
        rights: BlockNodeId,
        lefts: BlockNodeId,
    ) {
        let drained = block_tree.drain_preorder(node);
        for side_ref in drained {
            self.segments[side_ref.segment].side_mut(side_ref.side).block_node = None;
            self.divide_one_segment(mesh, block_tree, side_ref, rights, lefts);
        }
    }

    /// spec.md §4.8 step 3(c): close the gaps the partition cut across,
    /// synthesizing new segments for open space and collecting
    /// [`BuildEvent::UnclosedSector`] for gaps that never close.
    fn add_partition_line_segments(
        &mut self,
        mesh: &mut Mesh,
        block_tree: &mut BlockTree,
        rights: BlockNodeId,
        lefts: BlockNodeId,
        source_partition_side: Option<SideRef>,
        source_map_line: Option<usize>,
    ) -> Result<(), BuildError> {
        trace!("building partition segments along {:?}", self.hplane.direction);
        self.hplane.sort_and_merge_intercepts();

        let (near_dist, far_dist) = if let Some(part_ref) = source_partition_side {
            let side = self.segments[part_ref.segment].side(part_ref.side).clone();
            (self.hplane.intersect(&side, Edge::From), self.hplane.intersect(&side, Edge::To))
        } else {
            (0.0, 0.0)
        };

        let intercepts = self.hplane.intercepts.clone();
        for pair in intercepts.windows(2) {
            let (cur, next) = (pair[0], pair[1]);

            if source_partition_side.is_some() && cur.distance >= near_dist && next.distance <= far_dist {
                continue;
            }
            if cur.after.is_none() && next.before.is_none() {
                continue;
            }

            let cur_point = side_edge_point(&self.segments, cur.side, cur.edge);
            let next_point = side_edge_point(&self.segments, next.side, next.edge);

            if cur.after.is_some() && next.before.is_none() {
                if !cur.self_referencing {
                    let near_point = midpoint(cur_point, next_point);
                    self.events.push(BuildEvent::UnclosedSector { sector: cur.after, near_point });
                }
                continue;
            }
            if cur.after.is_none() && next.before.is_some() {
                if !next.self_referencing {
                    let near_point = midpoint(cur_point, next_point);
                    self.events.push(BuildEvent::UnclosedSector { sector: next.before, near_point });
                }
                continue;
            }

            // Definitely open space.
            let mut sector = cur.after;
            if cur.before.is_none() && next.before == next.after {
                sector = next.before;
            } else if cur.after != next.before {
                if !cur.self_referencing && !next.self_referencing {
                    debug!("sector mismatch across partition: {:?} != {:?}", cur.after, next.before);
                }
                let after_is_self_ref_map_side = cur
                    .after_side
                    .map(|sr| self.segments[sr.segment].side(sr.side).map_side.is_some() && self.side_segment_is_self_referencing(sr))
                    .unwrap_or(false);
                if after_is_self_ref_map_side {
                    let before_is_non_self_ref_map_side = next
                        .before_side
                        .map(|sr| self.segments[sr.segment].side(sr.side).map_side.is_some() && !self.side_segment_is_self_referencing(sr))
                        .unwrap_or(false);
                    if before_is_non_self_ref_map_side {
                        sector = next.before;
                    }
                }
            }

            let Some(sector) = sector else {
                return Err(BuildError::StructuralInvariant(
                    "open partition gap has no attributable sector".into(),
                ));
            };

            let (from_vertex, from_point) = (cur_vertex(&self.segments, cur.side, cur.edge), cur_point);
            let (to_vertex, to_point) = (cur_vertex(&self.segments, next.side, next.edge), next_point);

            self.next_synthetic_index += 1;
            let index = self.next_synthetic_index;
            let mut new_seg = LineSegment::new(index, from_vertex, to_vertex, from_point, to_point);
            new_seg.front.sector = Some(sector);
            new_seg.front.partition_map_line = source_map_line;
            new_seg.back.sector = Some(sector);
            new_seg.back.partition_map_line = source_map_line;
            let new_id = self.segments.insert(new_seg);

            self.insert_edge_tips_for_segment(new_id);
            self.link_side(block_tree, rights, SideRef { segment: new_id, side: SideKind::Front });
            self.link_side(block_tree, lefts, SideRef { segment: new_id, side: SideKind::Back });
        }

        Ok(())
    }

    /// spec.md §4.8 step 3: choose a partition, divide, recurse; or, if no
    /// partition remains, collect the leaf's segments into a convex
    /// subspace (partitioner.cpp `partitionSpace`).
    fn partition_space(
        &mut self,
        mesh: &mut Mesh,
        block_tree: &mut BlockTree,
        node: BlockNodeId,
    ) -> Result<Option<BspTree>, BuildError> {
        let Some(part_ref) = choose_partition(block_tree, node, &self.segments, self.config.split_cost_factor) else {
            let segments = block_tree.drain_preorder(node);
            if segments.is_empty() {
                return Ok(None);
            }

            let mut proxy = ConvexSubspaceProxy::new();
            proxy.add_segments(segments.iter().copied());
            let subspace_id = self.subspaces.insert(proxy);

            for side_ref in &segments {
                self.segments[side_ref.segment].side_mut(side_ref.side).subspace = Some(subspace_id);
                self.segments[side_ref.segment].side_mut(side_ref.side).block_node = None;
            }

            return Ok(Some(BspElement::leaf(subspace_id, None)));
        };

        let part_side = self.segments[part_ref.segment].side(part_ref.side).clone();
        let source_map_line = part_side.map_side.map(|m| m.line_index);
        self.hplane.configure(&part_side, source_map_line);
        let partition = Partition { origin: self.hplane.origin, direction: self.hplane.direction };

        let bounds = block_tree.bounds(node);
        let rights = block_tree.new_root(bounds);
        let lefts = block_tree.new_root(bounds);

        self.divide_segments(mesh, block_tree, node, rights, lefts);
        self.add_partition_line_segments(mesh, block_tree, rights, lefts, Some(part_ref), source_map_line)?;

        let right_tree = self.partition_space(mesh, block_tree, rights)?;
        let left_tree = self.partition_space(mesh, block_tree, lefts)?;

        match (right_tree, left_tree) {
            (None, other) | (other, None) => Ok(other),
            (Some(right), Some(left)) => Ok(Some(BspElement::node(partition, right, left))),
        }
    }

    /// partitioner.cpp `splitOverlappingSegments`: within each leaf's
    /// clockwise-ordered segment run, colinear overlaps that survived
    /// partitioning (because they don't break convexity) are split at the
    /// shorter segment's `to` vertex.
    fn split_overlapping_segments(&mut self, mesh: &mut Mesh) {
        let subspace_ids: Vec<SubspaceId> = self.subspaces.keys().collect();
        for subspace_id in subspace_ids {
            let ordered = self.subspaces[subspace_id].ordered_for_overlap_split(&self.segments);
            let n = ordered.len();
            let mut i = 0;
            while i + 1 < n {
                let mut k = i;
                while k + 1 < n && fequal(ordered[k + 1].1, ordered[i].1) {
                    k += 1;
                }

                for l in i..k {
                    for m in (l + 1)..=k {
                        let a = ordered[l].0;
                        let b = ordered[m].0;
                        let (a_len, b_len) = {
                            let segs = &self.segments;
                            (segs[a.segment].side(a.side).length, segs[b.segment].side(b.side).length)
                        };
                        if fequal(a_len, b_len) {
                            continue;
                        }
                        let b_to = self.segments[b.segment].side(b.side).to;
                        let a_side = self.segments[a.segment].side(a.side);
                        if b_to == a_side.from || b_to == a_side.to {
                            continue;
                        }
                        self.split_line_segment(mesh, a, b_to, false);
                    }
                }
                i = k + 1;
            }
        }
    }

    /// Sector attribution (`ConvexSubspaceProxy::sector`) is only known once
    /// its geometry has been built, which happens after the tree shape is
    /// final; walk the finished tree once to copy it onto each leaf.
    fn backfill_leaf_sectors(&self, elem: &mut BspElement) {
        match elem {
            BspElement::Leaf(leaf) => {
                leaf.sector = self.subspaces[leaf.subspace].sector;
            }
            BspElement::Node { right, left, .. } => {
                self.backfill_leaf_sectors(right);
                self.backfill_leaf_sectors(left);
            }
        }
    }

    /// partitioner.cpp `buildSubspaceGeometries`: builds each leaf's DCEL
    /// face(s), then a final pass adds a twin half-edge to any front side
    /// that still lacks one.
    fn build_subspace_geometries(&mut self, mesh: &mut Mesh) -> Result<(), BuildError> {
        let subspace_ids: Vec<SubspaceId> = self.subspaces.keys().collect();
        for subspace_id in &subspace_ids {
            let mut proxy = std::mem::take(&mut self.subspaces[*subspace_id]);
            proxy.build_geometry(&mut self.segments, mesh)?;
            for side_ref in proxy.segments() {
                if self.segments[side_ref.segment].side(side_ref.side).hedge.is_some() {
                    self.segment_count += 1;
                }
            }
            self.subspaces[*subspace_id] = proxy;
        }

        for subspace_id in &subspace_ids {
            let sides: Vec<SideRef> = self.subspaces[*subspace_id].segments().to_vec();
            for side_ref in sides {
                let opposite = side_ref.side.opposite();
                let front_hedge = self.segments[side_ref.segment].side(side_ref.side).hedge;
                let back_hedge = self.segments[side_ref.segment].side(opposite).hedge;
                if let (Some(h), None) = (front_hedge, back_hedge) {
                    let back_origin = self.segments[side_ref.segment].side(opposite).from_vertex;
                    let twin = mesh.new_hedge(back_origin);
                    mesh.link_twins(h, twin);
                    self.segments[side_ref.segment].side_mut(opposite).hedge = Some(twin);
                }
            }
        }

        Ok(())
    }
}

fn fequal(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn to_grid(p: Point2) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

fn side_edge_point(segs: &SlotMap<SegmentId, LineSegment>, side_ref: SideRef, edge: Edge) -> Point2 {
    let side = segs[side_ref.segment].side(side_ref.side);
    match edge {
        Edge::From => side.from,
        Edge::To => side.to,
    }
}

fn cur_vertex(segs: &SlotMap<SegmentId, LineSegment>, side_ref: SideRef, edge: Edge) -> VertexId {
    let side = segs[side_ref.segment].side(side_ref.side);
    match edge {
        Edge::From => side.from_vertex,
        Edge::To => side.to_vertex,
    }
}

fn midpoint(a: Point2, b: Point2) -> Point2 {
    Point2::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

fn ceil_pow2(n: i32) -> i32 {
    if n <= 1 {
        return 1;
    }
    let mut p = 1;
    while p < n {
        p <<= 1;
    }
    p
}

/// `blockmapBounds` (partitioner.cpp): the map's integer bounding box,
/// snapped to an 8-unit grid on the minimum corner and grown to a
/// power-of-two multiple of 128 units on each axis.
fn blockmap_bounds(lines: &[&Line]) -> IBounds {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for line in lines {
        for p in [line.start.point(), line.end.point()] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
    }

    let mi_min_x = min_x.floor() as i32;
    let mi_min_y = min_y.floor() as i32;
    let mi_max_x = max_x.ceil() as i32;
    let mi_max_y = max_y.ceil() as i32;

    let b_min_x = mi_min_x - (mi_min_x & 0x7);
    let b_min_y = mi_min_y - (mi_min_y & 0x7);
    let bw = ((mi_max_x - b_min_x) / 128) + 1;
    let bh = ((mi_max_y - b_min_y) / 128) + 1;

    IBounds {
        min_x: b_min_x,
        min_y: b_min_y,
        max_x: b_min_x + 128 * ceil_pow2(bw),
        max_y: b_min_y + 128 * ceil_pow2(bh),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Vertex;

    fn square_lines() -> Vec<Line> {
        let pts = [
            Vertex::new(0.0, 0.0),
            Vertex::new(0.0, 256.0),
            Vertex::new(256.0, 256.0),
            Vertex::new(256.0, 0.0),
        ];
        (0..4)
            .map(|i| Line::new(i, pts[i], pts[(i + 1) % 4], Some(1), None))
            .collect()
    }

    #[test]
    fn single_convex_quad_builds_one_leaf() {
        let lines = square_lines();
        let mut mesh = Mesh::new();
        let mut partitioner = Partitioner::new(BuildConfig::default());
        let (tree, events) = partitioner.make_bsp_tree(&lines, &mut mesh).unwrap();
        assert!(tree.is_leaf());
        assert!(events.is_empty());
        if let BspElement::Leaf(leaf) = &tree {
            assert_eq!(leaf.sector, Some(1));
        }
    }

    #[test]
    fn zero_length_line_is_rejected() {
        let p = Vertex::new(0.0, 0.0);
        let lines = vec![Line::new(0, p, p, Some(1), None)];
        let mut mesh = Mesh::new();
        let mut partitioner = Partitioner::new(BuildConfig::default());
        assert!(matches!(
            partitioner.make_bsp_tree(&lines, &mut mesh),
            Err(BuildError::ZeroLengthSegment { index: 0 })
        ));
    }

    #[test]
    fn duplicate_line_index_is_rejected() {
        let lines = vec![
            Line::new(0, Vertex::new(0.0, 0.0), Vertex::new(10.0, 0.0), Some(1), None),
            Line::new(0, Vertex::new(10.0, 0.0), Vertex::new(10.0, 10.0), Some(1), None),
        ];
        let mut mesh = Mesh::new();
        let mut partitioner = Partitioner::new(BuildConfig::default());
        assert!(matches!(
            partitioner.make_bsp_tree(&lines, &mut mesh),
            Err(BuildError::DuplicateLineIndex { index: 0 })
        ));
    }

    #[test]
    fn two_rooms_share_two_sided_line_with_twinned_hedges() {
        // Two unit squares sharing the edge x=256, rooms in sectors 1 and 2.
        let mut lines = vec![
            Line::new(0, Vertex::new(0.0, 0.0), Vertex::new(0.0, 256.0), Some(1), None),
            Line::new(1, Vertex::new(0.0, 256.0), Vertex::new(256.0, 256.0), Some(1), None),
            Line::new(2, Vertex::new(256.0, 256.0), Vertex::new(256.0, 0.0), Some(1), Some(2)),
            Line::new(3, Vertex::new(256.0, 0.0), Vertex::new(0.0, 0.0), Some(1), None),
            Line::new(4, Vertex::new(256.0, 256.0), Vertex::new(512.0, 256.0), Some(2), None),
            Line::new(5, Vertex::new(512.0, 256.0), Vertex::new(512.0, 0.0), Some(2), None),
            Line::new(6, Vertex::new(512.0, 0.0), Vertex::new(256.0, 0.0), Some(2), None),
        ];
        lines.sort_by_key(|l| l.index);

        let mut mesh = Mesh::new();
        let mut partitioner = Partitioner::new(BuildConfig::default());
        let (tree, _events) = partitioner.make_bsp_tree(&lines, &mut mesh).unwrap();
        assert!(!tree.is_leaf());

        let right_leaf = tree.locate(Point2::new(128.0, 128.0));
        let left_leaf = tree.locate(Point2::new(384.0, 128.0));
        assert_ne!(right_leaf.sector, left_leaf.sector);
    }
}
