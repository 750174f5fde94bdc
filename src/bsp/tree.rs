//! The output binary tree: internal nodes carry a partition line, leaves
//! carry a convex subspace (spec.md §3 BspTree).

use crate::geom::{Point2, Vec2};
use crate::map::SectorId;

use super::subspace::SubspaceId;

/// A partition line snapshot stored on a [`BspNode`]: origin point plus
/// direction vector (spec.md §6 external interfaces).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partition {
    pub origin: Point2,
    pub direction: Vec2,
}

/// A leaf: reference to the convex subspace built for it, plus the sector
/// heuristically attributed to it (spec.md §3, §4.7 step 6).
#[derive(Debug, Clone)]
pub struct BspLeaf {
    pub subspace: SubspaceId,
    pub sector: Option<SectorId>,
}

/// Either an internal node with a partition and two children (right = in
/// front of the partition along its direction, left = behind), or a leaf.
#[derive(Debug, Clone)]
pub enum BspElement {
    Node {
        partition: Partition,
        right: Box<BspElement>,
        left: Box<BspElement>,
    },
    Leaf(BspLeaf),
}

pub type BspTree = BspElement;

impl BspElement {
    pub fn leaf(subspace: SubspaceId, sector: Option<SectorId>) -> Self {
        BspElement::Leaf(BspLeaf { subspace, sector })
    }

    pub fn node(partition: Partition, right: BspElement, left: BspElement) -> Self {
        BspElement::Node {
            partition,
            right: Box::new(right),
            left: Box::new(left),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BspElement::Leaf(_))
    }

    /// Descend from this element toward the point `p`, following the
    /// convention `(p - partition.origin) x partition.direction`: a
    /// non-negative cross product is the right child, negative is left
    /// (spec.md §8 Round-trip 1).
    pub fn locate<'a>(&'a self, p: Point2) -> &'a BspLeaf {
        match self {
            BspElement::Leaf(leaf) => leaf,
            BspElement::Node { partition, right, left } => {
                let rel = partition.origin.to(p);
                let side = rel.cross(partition.direction);
                if side >= 0.0 {
                    right.locate(p)
                } else {
                    left.locate(p)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn subspace(n: u64) -> SubspaceId {
        SubspaceId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn locate_descends_to_correct_leaf() {
        let partition = Partition {
            origin: Point2::new(0.0, 0.0),
            direction: Vec2::new(0.0, 1.0),
        };
        let tree = BspElement::node(
            partition,
            BspElement::leaf(subspace(1), Some(1)),
            BspElement::leaf(subspace(2), Some(2)),
        );
        let right_leaf = tree.locate(Point2::new(5.0, 0.0));
        assert_eq!(right_leaf.sector, Some(1));
        let left_leaf = tree.locate(Point2::new(-5.0, 0.0));
        assert_eq!(left_leaf.sector, Some(2));
    }
}
