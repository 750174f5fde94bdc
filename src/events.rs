//! Replaces the original observer/audience pattern with a plain collected
//! event list (spec.md §9 Design Notes).

use crate::geom::Point2;
use crate::map::SectorId;

/// A non-fatal condition noticed during the build. Returned alongside the
/// tree rather than delivered through a callback, so a caller that does not
/// care can simply ignore the `Vec`.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    /// A gap was found along a partition where neither side closes onto a
    /// (non-self-referencing) sector. See spec.md §4.8(e) and Scenario D.
    UnclosedSector {
        sector: Option<SectorId>,
        near_point: Point2,
    },
}
