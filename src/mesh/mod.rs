//! Doubly-connected edge list, implemented as a `slotmap` arena with stable
//! handles rather than owning references, per spec.md §9 Design Notes
//! ("Cyclic mutable graph (DCEL) ... implement as an arena with stable
//! indices"). Grounded on the half-edge arena pattern in
//! `other_examples/7745a268_setzer22-blackjack__blackjack_engine-src-mesh-halfedge.rs.rs`.

use slotmap::{new_key_type, SlotMap};

use crate::geom::Point2;

new_key_type! {
    pub struct VertexId;
    pub struct HEdgeId;
    pub struct FaceId;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub pos: Point2,
}

/// Directed edge from `origin`, with optional twin/next/prev/face links
/// (spec.md §3 HalfEdge). All four are `Option` because the invariants only
/// hold once construction of the owning face/twin is complete.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfEdge {
    pub origin: VertexId,
    pub twin: Option<HEdgeId>,
    pub next: Option<HEdgeId>,
    pub prev: Option<HEdgeId>,
    pub face: Option<FaceId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: Point2,
    pub max: Point2,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Face {
    pub hedge: Option<HEdgeId>,
    pub hedge_count: usize,
    pub bounds: Option<AABB>,
    pub center: Option<Point2>,
}

#[derive(Debug, Default)]
pub struct Mesh {
    vertices: SlotMap<VertexId, MeshVertex>,
    hedges: SlotMap<HEdgeId, HalfEdge>,
    faces: SlotMap<FaceId, Face>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_vertex(&mut self, pos: Point2) -> VertexId {
        self.vertices.insert(MeshVertex { pos })
    }

    pub fn new_hedge(&mut self, origin: VertexId) -> HEdgeId {
        self.hedges.insert(HalfEdge {
            origin,
            twin: None,
            next: None,
            prev: None,
            face: None,
        })
    }

    pub fn new_face(&mut self) -> FaceId {
        self.faces.insert(Face::default())
    }

    pub fn remove_vertex(&mut self, id: VertexId) {
        self.vertices.remove(id);
    }

    pub fn remove_hedge(&mut self, id: HEdgeId) {
        self.hedges.remove(id);
    }

    pub fn remove_face(&mut self, id: FaceId) {
        self.faces.remove(id);
    }

    pub fn vertex(&self, id: VertexId) -> &MeshVertex {
        &self.vertices[id]
    }

    pub fn hedge(&self, id: HEdgeId) -> &HalfEdge {
        &self.hedges[id]
    }

    pub fn hedge_mut(&mut self, id: HEdgeId) -> &mut HalfEdge {
        &mut self.hedges[id]
    }

    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id]
    }

    pub fn face_mut(&mut self, id: FaceId) -> &mut Face {
        &mut self.faces[id]
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn hedge_count(&self) -> usize {
        self.hedges.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Link `a.next = b`, `b.prev = a`.
    pub fn link_next(&mut self, a: HEdgeId, b: HEdgeId) {
        self.hedges[a].next = Some(b);
        self.hedges[b].prev = Some(a);
    }

    /// Link `a` and `b` as twins of each other.
    pub fn link_twins(&mut self, a: HEdgeId, b: HEdgeId) {
        self.hedges[a].twin = Some(b);
        self.hedges[b].twin = Some(a);
    }

    /// Iterate the boundary ring of `face` starting from its own half-edge,
    /// following `next`. Stops after at most `hedge_count` steps so a
    /// malformed ring can never loop forever.
    pub fn face_ring(&self, face: FaceId) -> Vec<HEdgeId> {
        let mut out = Vec::new();
        let Some(start) = self.faces[face].hedge else {
            return out;
        };
        let mut cur = start;
        loop {
            out.push(cur);
            let Some(next) = self.hedges[cur].next else {
                break;
            };
            cur = next;
            if cur == start || out.len() > self.hedges.len() {
                break;
            }
        }
        out
    }

    /// Recompute the cached bounding box of `face` from its current ring.
    pub fn update_bounds(&mut self, face: FaceId) {
        let ring = self.face_ring(face);
        if ring.is_empty() {
            self.faces[face].bounds = None;
            return;
        }
        let mut min = self.vertices[self.hedges[ring[0]].origin].pos;
        let mut max = min;
        for &h in &ring {
            let p = self.vertices[self.hedges[h].origin].pos;
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        self.faces[face].bounds = Some(AABB { min, max });
        self.faces[face].hedge_count = ring.len();
    }

    /// Recompute the cached centroid of `face` from its current ring.
    pub fn update_center(&mut self, face: FaceId) {
        let ring = self.face_ring(face);
        if ring.is_empty() {
            self.faces[face].center = None;
            return;
        }
        let mut sx = 0.0;
        let mut sy = 0.0;
        for &h in &ring {
            let p = self.vertices[self.hedges[h].origin].pos;
            sx += p.x;
            sy += p.y;
        }
        let n = ring.len() as f64;
        self.faces[face].center = Some(Point2::new(sx / n, sy / n));
    }

    /// Debug/validation helper (spec.md §4.1): every consecutive triple of
    /// ring vertices must turn the same way, within the construction
    /// epsilon. An empty or degenerate (< 3 vertex) ring is vacuously convex.
    pub fn face_is_convex(&self, face: FaceId) -> bool {
        let ring = self.face_ring(face);
        if ring.len() < 3 {
            return true;
        }
        let pts: Vec<Point2> = ring
            .iter()
            .map(|&h| self.vertices[self.hedges[h].origin].pos)
            .collect();
        let n = pts.len();
        let mut sign = 0.0_f64;
        for i in 0..n {
            let a = pts[i];
            let b = pts[(i + 1) % n];
            let c = pts[(i + 2) % n];
            let cross = a.to(b).cross(b.to(c));
            if cross.abs() < 1e-9 {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }

    /// Debug/validation helper (spec.md §8 invariant 1): ring is clockwise
    /// in a y-down-or-up-agnostic sense consistent with [`face_is_convex`]'s
    /// turn sign, i.e. the signed area is negative for the convention used
    /// throughout this crate (clockwise when y increases upward).
    pub fn face_is_clockwise(&self, face: FaceId) -> bool {
        let ring = self.face_ring(face);
        if ring.len() < 3 {
            return true;
        }
        let pts: Vec<Point2> = ring
            .iter()
            .map(|&h| self.vertices[self.hedges[h].origin].pos)
            .collect();
        let mut area2 = 0.0;
        for i in 0..pts.len() {
            let a = pts[i];
            let b = pts[(i + 1) % pts.len()];
            area2 += a.x * b.y - b.x * a.y;
        }
        area2 < 0.0
    }
}

/// Angular coverage helper shared by [`crate::bsp::subspace`]: the positive
/// span an edge covers going from `from_angle` to `to_angle` around a
/// center, used when accumulating a continuity's angular coverage.
pub fn angular_span(from_angle: f64, to_angle: f64) -> f64 {
    let span = to_angle - from_angle;
    if span >= 0.0 {
        span
    } else {
        span + 360.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_face_ring_is_empty() {
        let mut mesh = Mesh::new();
        let f = mesh.new_face();
        assert!(mesh.face_ring(f).is_empty());
        assert!(mesh.face_is_convex(f));
    }

    #[test]
    fn quad_ring_is_convex_and_clockwise() {
        let mut mesh = Mesh::new();
        let v = [
            mesh.new_vertex(Point2::new(0.0, 0.0)),
            mesh.new_vertex(Point2::new(0.0, 128.0)),
            mesh.new_vertex(Point2::new(128.0, 128.0)),
            mesh.new_vertex(Point2::new(128.0, 0.0)),
        ];
        let hedges: Vec<_> = v.iter().map(|&vid| mesh.new_hedge(vid)).collect();
        for i in 0..4 {
            mesh.link_next(hedges[i], hedges[(i + 1) % 4]);
        }
        let face = mesh.new_face();
        mesh.face_mut(face).hedge = Some(hedges[0]);
        for &h in &hedges {
            mesh.hedge_mut(h).face = Some(face);
        }
        mesh.update_bounds(face);
        mesh.update_center(face);

        assert!(mesh.face_is_convex(face));
        assert!(mesh.face_is_clockwise(face));
        assert_eq!(mesh.face(face).hedge_count, 4);
        let bounds = mesh.face(face).bounds.unwrap();
        assert_eq!(bounds.min, Point2::new(0.0, 0.0));
        assert_eq!(bounds.max, Point2::new(128.0, 128.0));
    }

    #[test]
    fn twins_link_symmetrically() {
        let mut mesh = Mesh::new();
        let a = mesh.new_vertex(Point2::new(0.0, 0.0));
        let b = mesh.new_vertex(Point2::new(1.0, 0.0));
        let h1 = mesh.new_hedge(a);
        let h2 = mesh.new_hedge(b);
        mesh.link_twins(h1, h2);
        assert_eq!(mesh.hedge(h1).twin, Some(h2));
        assert_eq!(mesh.hedge(h2).twin, Some(h1));
    }
}
