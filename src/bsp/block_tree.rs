//! Recursive spatial index of segment sides ("SuperBlock" in the original
//! source), used for fast partition-candidate enumeration and bounding
//! queries (spec.md §3, §4.4). Grounded on spec.md §4.4,
//! `original_source/.../src/world/bsp/partitioner.cpp`'s
//! `linkLineSegmentInBlockTree`, and `.../superblockmap.h`'s
//! `LineSegmentBlock::link`, which takes a single `LineSegmentSide` rather
//! than a whole segment — front and back sides of one segment can, and
//! routinely do, end up linked at different nodes.

use slotmap::{new_key_type, SlotMap};

use super::segment::SideRef;

new_key_type! {
    pub struct BlockNodeId;
}

/// Split threshold: once a node's box is this size or smaller on both
/// axes, sides stop descending further and link at that node.
const SPLIT_THRESHOLD: i32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IBounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl IBounds {
    pub fn width(&self) -> i32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockNode {
    pub bounds: Option<IBounds>,
    pub sides: Vec<SideRef>,
    pub map_count: u32,
    pub partition_count: u32,
    pub left: Option<BlockNodeId>,
    pub right: Option<BlockNodeId>,
}

impl BlockNode {
    fn new(bounds: IBounds) -> Self {
        BlockNode {
            bounds: Some(bounds),
            ..Default::default()
        }
    }

    pub fn total_count(&self) -> u32 {
        self.map_count + self.partition_count
    }
}

#[derive(Debug)]
pub struct BlockTree {
    nodes: SlotMap<BlockNodeId, BlockNode>,
    pub root: BlockNodeId,
}

impl BlockTree {
    pub fn new(bounds: IBounds) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(BlockNode::new(bounds));
        BlockTree { nodes, root }
    }

    /// Allocate a fresh, unparented root node sharing this tree's arena.
    /// Used when partitioning splits one node's contents into a `rights`
    /// and a `lefts` subset: both get their own root here rather than a
    /// separate `BlockTree` instance, so a side's `block_node` handle
    /// stays valid across the split (superblockmap.h models this with
    /// three independent trees; a single shared arena is the Rust-idiomatic
    /// equivalent since handles are stable regardless of logical owner).
    pub fn new_root(&mut self, bounds: IBounds) -> BlockNodeId {
        self.nodes.insert(BlockNode::new(bounds))
    }

    pub fn node(&self, id: BlockNodeId) -> &BlockNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: BlockNodeId) -> &mut BlockNode {
        &mut self.nodes[id]
    }

    pub fn bounds(&self, id: BlockNodeId) -> IBounds {
        self.nodes[id].bounds.expect("block node always has bounds")
    }

    /// Link `side` (spanning `from`..`to`) into this tree, descending from
    /// `start`, incrementing the map/partition counter at every node
    /// visited on the way down. Returns the node the side was finally
    /// linked at.
    pub fn link(
        &mut self,
        start: BlockNodeId,
        side: SideRef,
        from: (i32, i32),
        to: (i32, i32),
        is_map_originated: bool,
    ) -> BlockNodeId {
        let mut node = start;
        loop {
            if is_map_originated {
                self.nodes[node].map_count += 1;
            } else {
                self.nodes[node].partition_count += 1;
            }

            let bounds = self.bounds(node);
            if bounds.width() <= SPLIT_THRESHOLD && bounds.height() <= SPLIT_THRESHOLD {
                self.nodes[node].sides.push(side);
                return node;
            }

            let split_on_x = bounds.width() >= bounds.height();
            let (from_coord, to_coord, mid) = if split_on_x {
                (from.0, to.0, (bounds.min_x + bounds.max_x) / 2)
            } else {
                (from.1, to.1, (bounds.min_y + bounds.max_y) / 2)
            };
            let from_side = (from_coord > mid) as usize;
            let to_side = (to_coord > mid) as usize;

            if from_side == to_side {
                node = self.child(node, from_side, split_on_x, mid);
            } else {
                self.nodes[node].sides.push(side);
                return node;
            }
        }
    }

    fn child(&mut self, node: BlockNodeId, side: usize, split_on_x: bool, mid: i32) -> BlockNodeId {
        let existing = if side == 0 {
            self.nodes[node].left
        } else {
            self.nodes[node].right
        };
        if let Some(child) = existing {
            return child;
        }
        let parent_bounds = self.bounds(node);
        let child_bounds = if split_on_x {
            if side == 0 {
                IBounds { max_x: mid, ..parent_bounds }
            } else {
                IBounds { min_x: mid, ..parent_bounds }
            }
        } else if side == 0 {
            IBounds { max_y: mid, ..parent_bounds }
        } else {
            IBounds { min_y: mid, ..parent_bounds }
        };
        let child = self.nodes.insert(BlockNode::new(child_bounds));
        if side == 0 {
            self.nodes[node].left = Some(child);
        } else {
            self.nodes[node].right = Some(child);
        }
        child
    }

    /// Remove `side` from whichever node's own list it was linked to.
    /// Ancestor counters are left untouched here; callers that need exact
    /// live counts during drains decrement as they pop (spec.md §4.4
    /// removal policy).
    pub fn unlink(&mut self, node: BlockNodeId, side: SideRef) {
        self.nodes[node].sides.retain(|&s| s != side);
    }

    /// Iterative pre-order traversal draining every side under `start`:
    /// the node's own sides first, then its left subtree, then its right
    /// subtree (spec.md §5: "block-tree traversal is pre-order").
    pub fn drain_preorder(&mut self, start: BlockNodeId) -> Vec<SideRef> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            out.append(&mut self.nodes[node].sides);
            if let Some(right) = self.nodes[node].right {
                stack.push(right);
            }
            if let Some(left) = self.nodes[node].left {
                stack.push(left);
            }
        }
        out
    }

    /// Non-destructive variant of [`drain_preorder`] used by the cost
    /// evaluator, which must see every candidate without disturbing the
    /// tree (spec.md §4.6: "iterate all other segments in the node's
    /// subtree").
    pub fn collect_preorder(&self, start: BlockNodeId) -> Vec<SideRef> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            out.extend(self.nodes[node].sides.iter().copied());
            if let Some(right) = self.nodes[node].right {
                stack.push(right);
            }
            if let Some(left) = self.nodes[node].left {
                stack.push(left);
            }
        }
        out
    }
}
