//! Per-vertex angularly-sorted set of outgoing segment sides, used to
//! resolve sector continuity at intersections (spec.md §3, §4.3). Grounded
//! on `original_source/.../include/doomsday/world/bsp/edgetip.h`.

use crate::geom::ANGLE_EPSILON;

use super::segment::{SegmentId, SideKind};

/// Where the edge of a line segment and a vertex meet. `front` is the side
/// of increasing angles, `back` the side of decreasing angles; either may
/// be absent (edgetip.h).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeTip {
    pub angle: f64,
    pub front: Option<(SegmentId, SideKind)>,
    pub back: Option<(SegmentId, SideKind)>,
}

impl EdgeTip {
    pub fn new(angle: f64) -> Self {
        EdgeTip {
            angle,
            front: None,
            back: None,
        }
    }
}

/// Always-sorted (ascending angle) collection of [`EdgeTip`]s at one vertex.
#[derive(Debug, Clone, Default)]
pub struct EdgeTips {
    tips: Vec<EdgeTip>,
}

impl EdgeTips {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EdgeTip> {
        self.tips.iter()
    }

    /// Insert `tip` in ascending-angle order (edgetip.h `insert`). Mirrors
    /// the original's reverse-scan insertion.
    pub fn insert(&mut self, tip: EdgeTip) {
        self.insert_with_epsilon(tip, ANGLE_EPSILON);
    }

    pub fn insert_with_epsilon(&mut self, tip: EdgeTip, epsilon: f64) {
        let mut pos = self.tips.len();
        while pos > 0 && tip.angle + epsilon < self.tips[pos - 1].angle {
            pos -= 1;
        }
        self.tips.insert(pos, tip);
    }

    pub fn smallest(&self) -> Option<&EdgeTip> {
        self.tips.first()
    }

    pub fn largest(&self) -> Option<&EdgeTip> {
        self.tips.last()
    }

    /// Nearest tip within `epsilon` degrees of `angle`, accounting for
    /// wraparound at 360 (edgetip.h `at`).
    pub fn at(&self, angle: f64, epsilon: f64) -> Option<&EdgeTip> {
        self.tips.iter().find(|tip| {
            let delta = (tip.angle - angle).abs();
            delta < epsilon || delta > 360.0 - epsilon
        })
    }

    /// Smallest tip with angle strictly greater than `angle + epsilon`
    /// (edgetip.h `after`).
    pub fn after(&self, angle: f64, epsilon: f64) -> Option<&EdgeTip> {
        self.tips.iter().find(|tip| angle + epsilon < tip.angle)
    }

    pub fn clear(&mut self) {
        self.tips.clear();
    }

    /// Remove every tip whose front or back side belongs to `segment`
    /// (edgetip.h `clearByLineSegment`).
    pub fn clear_by_segment(&mut self, segment: SegmentId) {
        self.tips.retain(|tip| {
            !tip.front.is_some_and(|(s, _)| s == segment) && !tip.back.is_some_and(|(s, _)| s == segment)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn seg(n: u64) -> SegmentId {
        SegmentId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn insert_keeps_ascending_order() {
        let mut tips = EdgeTips::new();
        tips.insert(EdgeTip::new(90.0));
        tips.insert(EdgeTip::new(10.0));
        tips.insert(EdgeTip::new(45.0));
        let angles: Vec<f64> = tips.iter().map(|t| t.angle).collect();
        assert_eq!(angles, vec![10.0, 45.0, 90.0]);
    }

    #[test]
    fn at_finds_within_epsilon_and_wraps() {
        let mut tips = EdgeTips::new();
        tips.insert(EdgeTip::new(0.001));
        assert!(tips.at(359.9995, 1.0 / 128.0).is_some());
        assert!(tips.at(180.0, 1.0 / 128.0).is_none());
    }

    #[test]
    fn after_skips_tips_not_strictly_greater() {
        let mut tips = EdgeTips::new();
        tips.insert(EdgeTip::new(10.0));
        tips.insert(EdgeTip::new(20.0));
        let found = tips.after(10.0, 1.0 / 128.0).unwrap();
        assert_eq!(found.angle, 20.0);
    }

    #[test]
    fn clear_by_segment_removes_matching_tips() {
        let mut tips = EdgeTips::new();
        let mut tip = EdgeTip::new(0.0);
        tip.front = Some((seg(1), SideKind::Front));
        tips.insert(tip);
        tips.insert(EdgeTip::new(5.0));
        tips.clear_by_segment(seg(1));
        assert_eq!(tips.len(), 1);
    }
}
