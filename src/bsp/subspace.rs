//! Accumulator for the segments belonging to one BSP leaf: orders them
//! clockwise, classifies them into per-sector "continuities", builds the
//! DCEL face(s), and attributes the winning continuity's sector to the leaf
//! (spec.md §3, §4.7). Grounded on
//! `original_source/.../src/world/bsp/convexsubspaceproxy.cpp`.

use std::collections::HashMap;

use slotmap::{new_key_type, SlotMap};

use crate::geom::{angle_delta, Point2, ANGLE_EPSILON};
use crate::map::SectorId;
use crate::mesh::{angular_span, Mesh};

use super::segment::{LineSegment, SegmentId, SideKind, SideRef};

new_key_type! {
    pub struct SubspaceId;
}

#[derive(Debug, Clone, Copy)]
struct Annotated {
    side: SideRef,
    from_angle: f64,
    to_angle: f64,
    length: f64,
}

/// A maximal clockwise-ordered subset of a leaf's segments all attributed
/// to the same sector (spec.md GLOSSARY, §4.7 step 3).
#[derive(Debug, Clone, Default)]
pub struct Continuity {
    pub sector: Option<SectorId>,
    pub norm: u32,
    pub part: u32,
    pub self_ref: u32,
    pub coverage: f64,
    pub ordered: Vec<SideRef>,
}

impl Continuity {
    /// `norm` wins; ties broken by larger coverage — preserved verbatim per
    /// spec.md §9 Open Questions (the heuristic is stated, not derived).
    fn is_better_than(&self, other: &Continuity) -> bool {
        if self.norm != other.norm {
            self.norm > other.norm
        } else {
            self.coverage > other.coverage
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConvexSubspaceProxy {
    segments: Vec<SideRef>,
    pub sector: Option<SectorId>,
    pub face: Option<crate::mesh::FaceId>,
    pub extra_faces: Vec<crate::mesh::FaceId>,
}

impl ConvexSubspaceProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[SideRef] {
        &self.segments
    }

    /// Add `side`, pruning exact duplicates (spec.md §4.7: "duplicates are
    /// pruned").
    pub fn add_one_segment(&mut self, side: SideRef) {
        if !self.segments.contains(&side) {
            self.segments.push(side);
        }
    }

    pub fn add_segments(&mut self, sides: impl IntoIterator<Item = SideRef>) {
        for s in sides {
            self.add_one_segment(s);
        }
    }

    /// The clockwise ordering (see [`Self::build_geometry`]) exposed as
    /// `(side, fromAngle)` pairs, for the overlap-splitting post-pass which
    /// needs the ordering but not a full geometry build.
    pub fn ordered_for_overlap_split(&self, segs: &SlotMap<SegmentId, LineSegment>) -> Vec<(SideRef, f64)> {
        self.build_ordered(segs)
            .into_iter()
            .map(|a| (a.side, a.from_angle))
            .collect()
    }

    fn centroid(&self, segs: &SlotMap<SegmentId, LineSegment>) -> Point2 {
        let mut sx = 0.0;
        let mut sy = 0.0;
        let mut n = 0.0;
        for side in &self.segments {
            let s = segs[side.segment].side(side.side);
            sx += s.from.x + s.to.x;
            sy += s.from.y + s.to.y;
            n += 2.0;
        }
        if n == 0.0 {
            Point2::new(0.0, 0.0)
        } else {
            Point2::new(sx / n, sy / n)
        }
    }

    /// Build the clockwise ordering via the "double bubble sort": primary
    /// descending `fromAngle` around the centroid, secondary (ties) longer
    /// segment first (spec.md §4.7 steps 1-3).
    fn build_ordered(&self, segs: &SlotMap<SegmentId, LineSegment>) -> Vec<Annotated> {
        let center = self.centroid(segs);
        let mut annotated: Vec<Annotated> = self
            .segments
            .iter()
            .map(|&side| {
                let s = segs[side.segment].side(side.side);
                Annotated {
                    side,
                    from_angle: center.to(s.from).angle(),
                    to_angle: center.to(s.to).angle(),
                    length: s.length,
                }
            })
            .collect();

        // Double bubble sort: descending fromAngle, ties broken by
        // descending length.
        let n = annotated.len();
        for i in 0..n {
            for j in 0..n.saturating_sub(1 + i) {
                let swap = if annotated[j].from_angle != annotated[j + 1].from_angle {
                    annotated[j].from_angle < annotated[j + 1].from_angle
                } else {
                    annotated[j].length < annotated[j + 1].length
                };
                if swap {
                    annotated.swap(j, j + 1);
                }
            }
        }
        annotated
    }

    /// spec.md §4.7 steps 3-7: classify into continuities, build extra
    /// meshes for discordant duplicates, build the primary face, and
    /// attribute the winning continuity's sector to the leaf.
    pub fn build_geometry(
        &mut self,
        segs: &mut SlotMap<SegmentId, LineSegment>,
        mesh: &mut Mesh,
    ) -> Result<(), crate::error::BuildError> {
        let has_map_side = self
            .segments
            .iter()
            .any(|side| segs[side.segment].side(side.side).map_side.is_some());
        if self.segments.len() >= 3 && !has_map_side {
            return Err(crate::error::BuildError::IllegalSubspace {
                segment_count: self.segments.len(),
            });
        }

        let ordered = self.build_ordered(segs);

        // Step 3: continuity classification, grouped by attributed sector.
        let mut continuities: HashMap<Option<SectorId>, Continuity> = HashMap::new();
        let mut discordant: Vec<Annotated> = Vec::new();
        // Distinct sides occupying the same angular span around the leaf's
        // centroid (not the same `SideRef` — `add_one_segment` already
        // prunes exact-identity duplicates on insertion, so two genuinely
        // different, overlapping map sides are what this actually catches;
        // matches `OrderedSegment::operator==`'s `fequal(fromAngle, ...)`).
        let mut seen_positions: Vec<Annotated> = Vec::new();

        for a in &ordered {
            let s = segs[a.side.segment].side(a.side.side);
            let sector = s.sector;
            let is_partition = s.map_side.is_none();
            let is_self_ref = s.map_side.is_some()
                && segs[a.side.segment]
                    .side(a.side.side.opposite())
                    .sector
                    == sector
                && sector.is_some();

            let is_same_position = seen_positions.iter().any(|seen| {
                angle_delta(a.from_angle, seen.from_angle) < ANGLE_EPSILON
                    && angle_delta(a.to_angle, seen.to_angle) < ANGLE_EPSILON
            });
            if is_same_position {
                discordant.push(*a);
                continue;
            }
            seen_positions.push(*a);

            let continuity = continuities.entry(sector).or_insert_with(|| Continuity {
                sector,
                ..Default::default()
            });
            if is_self_ref {
                continuity.self_ref += 1;
            } else if is_partition {
                continuity.part += 1;
            } else {
                continuity.norm += 1;
            }
            continuity.coverage += angular_span(a.from_angle, a.to_angle);
            continuity.ordered.push(a.side);
        }

        // Step 4: discord handling — build a separate extra mesh per
        // discordant side, its own small face.
        for a in &discordant {
            let face = mesh.new_face();
            let side = segs[a.side.segment].side(a.side.side);
            let h = mesh.new_hedge(side.from_vertex);
            mesh.hedge_mut(h).face = Some(face);
            mesh.face_mut(face).hedge = Some(h);
            mesh.link_next(h, h);
            mesh.update_bounds(face);
            mesh.update_center(face);
            self.extra_faces.push(face);
        }

        // Step 6: sector attribution — largest norm wins, ties by coverage.
        let winner = continuities
            .values()
            .fold(None::<&Continuity>, |best, c| match best {
                None => Some(c),
                Some(b) if c.is_better_than(b) => Some(c),
                Some(b) => Some(b),
            })
            .cloned();
        self.sector = winner.as_ref().and_then(|c| c.sector);

        // Step 5: primary face, built from every non-discordant side,
        // regardless of which continuity it landed in (a leaf's boundary
        // is the union of its sides; only sector *attribution* is chosen
        // by the winning continuity).
        let non_discordant: Vec<&Annotated> = ordered
            .iter()
            .filter(|a| !discordant.iter().any(|d| d.side == a.side))
            .collect();

        if non_discordant.len() >= 3 {
            let face = mesh.new_face();
            let mut head: Option<crate::mesh::HEdgeId> = None;
            let mut made: Vec<crate::mesh::HEdgeId> = Vec::new();

            // Iterate in reverse so repeated head-insertion yields a
            // clockwise ring (spec.md §4.7 step 5).
            for a in non_discordant.iter().rev() {
                let existing = segs[a.side.segment].side(a.side.side).hedge;
                let h = match existing {
                    Some(h) => h,
                    None => {
                        let side = segs[a.side.segment].side(a.side.side);
                        let h = mesh.new_hedge(side.from_vertex);
                        segs[a.side.segment].side_mut(a.side.side).hedge = Some(h);
                        if let Some(back_h) = segs[a.side.segment].side(a.side.side.opposite()).hedge {
                            mesh.link_twins(h, back_h);
                        }
                        h
                    }
                };
                mesh.hedge_mut(h).face = Some(face);
                made.push(h);
                if let Some(prev_head) = head {
                    mesh.link_next(h, prev_head);
                }
                head = Some(h);
            }
            if let (Some(first), Some(last)) = (made.last(), made.first()) {
                mesh.link_next(*last, *first);
            }
            mesh.face_mut(face).hedge = head;
            mesh.update_bounds(face);
            mesh.update_center(face);
            self.face = Some(face);
        }

        Ok(())
    }
}
