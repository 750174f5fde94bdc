//! The current partitioning half-plane plus its sorted list of intercepts
//! (spec.md §3, §4.5). Grounded on
//! `original_source/.../include/doomsday/world/bsp/hplane.h`.

use crate::geom::{perp_distance, slope_type, Point2, SlopeType, Vec2, DIST_EPSILON};
use crate::map::SectorId;

use slotmap::SlotMap;

use super::edgetip::EdgeTips;
use super::segment::{line_relationship, Edge, LineRelationship, LineSegment, Side, SideRef};
use super::segment::SegmentId;

/// One point where a previously-existing segment side crosses the current
/// partition (spec.md §3 HPlane.Intercept).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intercept {
    pub distance: f64,
    pub side: SideRef,
    pub edge: Edge,
    /// The segment side immediately before/after this intercept in the
    /// partition's angular order, resolved via the vertex's `EdgeTips`
    /// (hplane.h `intercept`: `beforeLineSegment`/`afterLineSegment`).
    pub before_side: Option<SideRef>,
    pub after_side: Option<SideRef>,
    pub before: Option<SectorId>,
    pub after: Option<SectorId>,
    pub self_referencing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct HPlane {
    pub origin: Point2,
    pub direction: Vec2,
    pub length: f64,
    pub angle: f64,
    pub slope_type: Option<SlopeType>,
    /// The map line a synthetic/source partition ultimately derives from,
    /// mirrored from the source side's own `partition_map_line`/`map_side`
    /// so [`HPlane::distance`] can apply the same same-partition-line
    /// zero-distance rule as `Side::distance` (linesegment.cpp).
    pub source_map_line: Option<usize>,
    pub intercepts: Vec<Intercept>,
}

impl HPlane {
    /// Reconfigure the half-plane from `side` (hplane.h `configure`).
    pub fn configure(&mut self, side: &Side, source_map_line: Option<usize>) {
        self.origin = side.from;
        self.direction = side.direction;
        self.length = side.length;
        self.angle = side.angle;
        self.slope_type = Some(slope_type(side.direction));
        self.source_map_line = source_map_line;
        self.intercepts.clear();
    }

    pub fn inverse_angle(&self) -> f64 {
        let a = self.angle + 180.0;
        if a >= 360.0 {
            a - 360.0
        } else {
            a
        }
    }

    /// Perpendicular distance of `point` from the partition line
    /// (hplane.h `distance`).
    pub fn distance_to_point(&self, point: Point2) -> f64 {
        perp_distance(self.origin, self.direction, self.length, point)
    }

    /// Perpendicular distances of `side`'s endpoints (hplane.h `distance`),
    /// applying the same-partition-line zero-distance special case.
    pub fn distance(&self, side: &Side) -> (f64, f64) {
        if let (Some(a), Some(b)) = (self.source_map_line, side.partition_map_line) {
            if a == b {
                return (0.0, 0.0);
            }
        }
        (self.distance_to_point(side.from), self.distance_to_point(side.to))
    }

    /// Classify `side` against the partition (hplane.h `relationship`).
    pub fn relationship(&self, side: &Side) -> (LineRelationship, f64, f64) {
        let (from_dist, to_dist) = self.distance(side);
        (line_relationship(from_dist, to_dist), from_dist, to_dist)
    }

    /// Parallel distance (along the partition direction, from the origin)
    /// to the endpoint of `side` identified by `edge` (spec.md §4.5
    /// `intersect`).
    pub fn intersect(&self, side: &Side, edge: Edge) -> f64 {
        let point = match edge {
            Edge::From => side.from,
            Edge::To => side.to,
        };
        if self.length <= 0.0 {
            return 0.0;
        }
        let dx = point.x - self.origin.x;
        let dy = point.y - self.origin.y;
        (dx * self.direction.x + dy * self.direction.y) / self.length
    }

    /// Add a new intercept for `(side, edge)` unless one already exists for
    /// that exact pair, in which case return `None` (hplane.h `intercept`).
    pub fn intercept(
        &mut self,
        side_ref: SideRef,
        side: &Side,
        edge: Edge,
        edge_tips: &EdgeTips,
        segs: &SlotMap<SegmentId, LineSegment>,
        self_referencing: bool,
    ) -> Option<usize> {
        if self
            .intercepts
            .iter()
            .any(|i| i.side == side_ref && i.edge == edge)
        {
            return None;
        }

        let distance = self.intersect(side, edge);

        // Sides immediately before/after the intersection along the
        // partition's angular order: the tips adjacent to the inverse
        // partition angle and the partition angle respectively (spec.md
        // §4.5 `intercept`).
        let before_side = tip_side_at(edge_tips, self.inverse_angle());
        let after_side = tip_side_at(edge_tips, self.angle);
        let before = before_side.and_then(|sr| segs[sr.segment].side(sr.side).sector);
        let after = after_side.and_then(|sr| segs[sr.segment].side(sr.side).sector);

        self.intercepts.push(Intercept {
            distance,
            side: side_ref,
            edge,
            before_side,
            after_side,
            before,
            after,
            self_referencing,
        });
        Some(self.intercepts.len() - 1)
    }

    /// Sort by distance, then merge intercepts within `1/128` distance,
    /// keeping the earlier distance and combining `before`/`after`
    /// attribution (self-referencing sides preferred out).
    ///
    /// hplane.h documents this strategy itself as "very suspect" — it can
    /// move the effective intercept position away from any actual segment
    /// vertex, which is exactly the kind of near-miss the Mesh's clockwise
    /// ordering later has to tolerate. Preserved as specified; not
    /// redesigned here (spec.md §9 Open Questions).
    pub fn sort_and_merge_intercepts(&mut self) {
        self.intercepts
            .sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());

        let mut merged: Vec<Intercept> = Vec::with_capacity(self.intercepts.len());
        for cur in self.intercepts.drain(..) {
            if let Some(prev) = merged.last_mut() {
                if (cur.distance - prev.distance).abs() <= DIST_EPSILON {
                    if prev.self_referencing && !cur.self_referencing {
                        prev.before = cur.before.or(prev.before);
                        prev.after = cur.after.or(prev.after);
                        prev.before_side = cur.before_side.or(prev.before_side);
                        prev.after_side = cur.after_side.or(prev.after_side);
                        prev.self_referencing = false;
                    } else {
                        prev.before = prev.before.or(cur.before);
                        prev.after = prev.after.or(cur.after);
                        prev.before_side = prev.before_side.or(cur.before_side);
                        prev.after_side = prev.after_side.or(cur.after_side);
                    }
                    continue;
                }
            }
            merged.push(cur);
        }
        self.intercepts = merged;
    }

    pub fn clear_intercepts(&mut self) {
        self.intercepts.clear();
    }
}

fn tip_side_at(edge_tips: &EdgeTips, angle: f64) -> Option<SideRef> {
    edge_tips
        .at(angle, crate::geom::ANGLE_EPSILON)
        .and_then(|tip| tip.front.or(tip.back))
        .map(|(segment, side)| SideRef { segment, side })
}
