//! Two-sided oriented line segment with precomputed geometric cache
//! (spec.md §3 LineSegment, §4.2). Grounded on
//! `original_source/.../include/doomsday/world/bsp/linesegment.h` and
//! `.../src/world/bsp/linesegment.cpp`.

use slotmap::new_key_type;

use crate::geom::{slope_type, Point2, SlopeType, Vec2, DIST_EPSILON};
use crate::map::SectorId;
use crate::mesh::VertexId;

use super::block_tree::BlockNodeId;
use super::subspace::SubspaceId;
use crate::mesh::HEdgeId;

new_key_type! {
    pub struct SegmentId;
}

/// Which of the two oriented halves of a [`LineSegment`] is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SideKind {
    Front,
    Back,
}

impl SideKind {
    pub fn opposite(self) -> SideKind {
        match self {
            SideKind::Front => SideKind::Back,
            SideKind::Back => SideKind::Front,
        }
    }
}

/// Identifies the `From` or `To` endpoint of a segment side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    From,
    To,
}

/// A reference to one side of one segment, e.g. for neighbor chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideRef {
    pub segment: SegmentId,
    pub side: SideKind,
}

/// The map line-side a segment side was produced from, if any (synthesized
/// partition segments have none).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapSideRef {
    pub line_index: usize,
    pub side: SideKind,
}

/// The relationship of a line segment to another, expressed via signed
/// perpendicular distances of its endpoints (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRelationship {
    Collinear,
    Right,
    RightIntercept,
    Left,
    LeftIntercept,
    Intersects,
}

/// One oriented side of a [`LineSegment`] (spec.md §3).
#[derive(Debug, Clone)]
pub struct Side {
    pub from_vertex: VertexId,
    pub to_vertex: VertexId,
    pub from: Point2,
    pub to: Point2,

    pub sector: Option<SectorId>,
    pub map_side: Option<MapSideRef>,
    /// Set when this side was generated from a partition, so that future
    /// splits of the *same* partition line test as distance-zero against
    /// each other (linesegment.cpp `distance()` special rule).
    pub partition_map_line: Option<usize>,

    pub left_neighbor: Option<SideRef>,
    pub right_neighbor: Option<SideRef>,

    pub block_node: Option<BlockNodeId>,
    pub subspace: Option<SubspaceId>,
    pub hedge: Option<HEdgeId>,

    pub direction: Vec2,
    pub length: f64,
    pub angle: f64,
    pub p_para: f64,
    pub p_perp: f64,
    pub slope_type: SlopeType,
}

impl Side {
    fn new(from_vertex: VertexId, to_vertex: VertexId, from: Point2, to: Point2) -> Self {
        let mut side = Side {
            from_vertex,
            to_vertex,
            from,
            to,
            sector: None,
            map_side: None,
            partition_map_line: None,
            left_neighbor: None,
            right_neighbor: None,
            block_node: None,
            subspace: None,
            hedge: None,
            direction: Vec2::new(0.0, 0.0),
            length: 0.0,
            angle: 0.0,
            p_para: 0.0,
            p_perp: 0.0,
            slope_type: SlopeType::Horizontal,
        };
        side.update_cache();
        side
    }

    /// Recompute direction, length, angle, slope type, and the perpendicular
    /// (`pPerp`) / parallel (`pPara`) offsets (linesegment.cpp `updateCache`).
    pub fn update_cache(&mut self) {
        self.direction = self.from.to(self.to);
        self.length = self.direction.length();
        self.angle = self.direction.angle();
        self.slope_type = slope_type(self.direction);
        self.p_perp = self.from.y * self.direction.x - self.from.x * self.direction.y;
        self.p_para = -self.from.x * self.direction.x - self.from.y * self.direction.y;
    }

    /// Signed perpendicular distances of `self`'s endpoints to the infinite
    /// line defined by `other`, interpreted as a partition
    /// (linesegment.cpp `Side::distance`).
    ///
    /// Special rule: if both sides were produced from the same partition
    /// map line, both distances are forced to zero to avoid drift from
    /// repeated splitting of the same partition.
    pub fn distance(&self, other: &Side) -> (f64, f64) {
        if let (Some(a), Some(b)) = (self.partition_map_line, other.partition_map_line) {
            if a == b {
                return (0.0, 0.0);
            }
        }
        let from_dist = crate::geom::perp_distance(other.from, other.direction, other.length, self.from);
        let to_dist = crate::geom::perp_distance(other.from, other.direction, other.length, self.to);
        (from_dist, to_dist)
    }

    /// Classify `self` against `other` treated as the partition
    /// (linesegment.cpp free function `lineRelationship`, spec.md §4.2).
    pub fn relationship(&self, other: &Side) -> (LineRelationship, f64, f64) {
        let (from_dist, to_dist) = self.distance(other);
        (line_relationship(from_dist, to_dist), from_dist, to_dist)
    }
}

/// `lineRelationship(fromDist, toDist)` — spec.md §4.2 bullet list.
pub fn line_relationship(from_dist: f64, to_dist: f64) -> LineRelationship {
    if from_dist.abs() <= DIST_EPSILON && to_dist.abs() <= DIST_EPSILON {
        return LineRelationship::Collinear;
    }
    if from_dist >= -DIST_EPSILON && to_dist >= -DIST_EPSILON {
        return if from_dist.abs() < DIST_EPSILON || to_dist.abs() < DIST_EPSILON {
            LineRelationship::RightIntercept
        } else {
            LineRelationship::Right
        };
    }
    if from_dist <= DIST_EPSILON && to_dist <= DIST_EPSILON {
        return if from_dist.abs() < DIST_EPSILON || to_dist.abs() < DIST_EPSILON {
            LineRelationship::LeftIntercept
        } else {
            LineRelationship::Left
        };
    }
    LineRelationship::Intersects
}

/// A (possibly split) finite directed segment with Front and Back sides
/// sharing two vertex endpoints (spec.md §3, §4.2).
#[derive(Debug, Clone)]
pub struct LineSegment {
    pub index: usize,
    pub front: Side,
    pub back: Side,
}

impl LineSegment {
    pub fn new(index: usize, from_vertex: VertexId, to_vertex: VertexId, from: Point2, to: Point2) -> Self {
        LineSegment {
            index,
            front: Side::new(from_vertex, to_vertex, from, to),
            back: Side::new(to_vertex, from_vertex, to, from),
        }
    }

    pub fn side(&self, kind: SideKind) -> &Side {
        match kind {
            SideKind::Front => &self.front,
            SideKind::Back => &self.back,
        }
    }

    pub fn side_mut(&mut self, kind: SideKind) -> &mut Side {
        match kind {
            SideKind::Front => &mut self.front,
            SideKind::Back => &mut self.back,
        }
    }

    /// Replace whichever vertex is referenced as `edge`, recomputing both
    /// sides' caches atomically (spec.md §4.2 "Replacing either vertex").
    pub fn replace_vertex(&mut self, edge: Edge, vertex: VertexId, pos: Point2) {
        match edge {
            Edge::From => {
                self.front.from_vertex = vertex;
                self.front.from = pos;
                self.back.to_vertex = vertex;
                self.back.to = pos;
            }
            Edge::To => {
                self.front.to_vertex = vertex;
                self.front.to = pos;
                self.back.from_vertex = vertex;
                self.back.from = pos;
            }
        }
        self.front.update_cache();
        self.back.update_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use slotmap::KeyData;

    fn dummy_vertex(n: u64) -> VertexId {
        VertexId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn update_cache_computes_length_and_angle() {
        let seg = LineSegment::new(
            0,
            dummy_vertex(1),
            dummy_vertex(2),
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 4.0),
        );
        assert_approx_eq!(seg.front.length, 5.0);
        assert_approx_eq!(seg.back.length, 5.0);
    }

    #[test]
    fn collinear_segment_has_zero_distance() {
        let partition = LineSegment::new(
            0,
            dummy_vertex(1),
            dummy_vertex(2),
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
        );
        let collinear = LineSegment::new(
            1,
            dummy_vertex(3),
            dummy_vertex(4),
            Point2::new(2.0, 0.0),
            Point2::new(8.0, 0.0),
        );
        let (rel, from_d, to_d) = collinear.front.relationship(&partition.front);
        assert_eq!(rel, LineRelationship::Collinear);
        assert_approx_eq!(from_d, 0.0);
        assert_approx_eq!(to_d, 0.0);
    }

    #[test]
    fn segment_fully_right_of_partition() {
        let partition = LineSegment::new(
            0,
            dummy_vertex(1),
            dummy_vertex(2),
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
        );
        let right = LineSegment::new(
            1,
            dummy_vertex(3),
            dummy_vertex(4),
            Point2::new(2.0, -5.0),
            Point2::new(8.0, -5.0),
        );
        let (rel, _, _) = right.front.relationship(&partition.front);
        assert_eq!(rel, LineRelationship::Right);
    }

    #[test]
    fn segment_intersecting_partition() {
        let partition = LineSegment::new(
            0,
            dummy_vertex(1),
            dummy_vertex(2),
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
        );
        let crossing = LineSegment::new(
            1,
            dummy_vertex(3),
            dummy_vertex(4),
            Point2::new(5.0, -5.0),
            Point2::new(5.0, 5.0),
        );
        let (rel, _, _) = crossing.front.relationship(&partition.front);
        assert_eq!(rel, LineRelationship::Intersects);
    }

    #[test]
    fn same_partition_line_forces_zero_distance() {
        let mut a = LineSegment::new(
            0,
            dummy_vertex(1),
            dummy_vertex(2),
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
        );
        let mut b = LineSegment::new(
            1,
            dummy_vertex(3),
            dummy_vertex(4),
            Point2::new(3.0, 50.0),
            Point2::new(7.0, 50.0),
        );
        a.front.partition_map_line = Some(42);
        b.front.partition_map_line = Some(42);
        let (from_d, to_d) = b.front.distance(&a.front);
        assert_approx_eq!(from_d, 0.0);
        assert_approx_eq!(to_d, 0.0);
    }
}
