//! Fatal error kinds surfaced by the builder (spec.md §7).
//!
//! Non-fatal conditions (unclosed sectors, intercept merging) are not
//! errors: see [`crate::events::BuildEvent`].

use thiserror::Error;

/// Fatal failure of the BSP build. No partial tree is returned when this is
/// surfaced; the caller should discard the mesh.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("line segment {index} has zero length")]
    ZeroLengthSegment { index: usize },

    #[error("duplicate line index {index} in input")]
    DuplicateLineIndex { index: usize },

    #[error("convex subspace has {segment_count} segments but no map-originated segment")]
    IllegalSubspace { segment_count: usize },

    #[error("segment expected to be linked under block-tree node {node}, but the node has no such descendant")]
    MissingBlockTreeNode { node: usize },

    #[error("structural invariant violated: {0}")]
    StructuralInvariant(String),
}
