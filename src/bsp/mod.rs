//! Binary space partition construction (spec.md §3, §4).
//!
//! `segment`/`edgetip`/`hplane`/`block_tree`/`evaluator`/`subspace` are the
//! building blocks; `partitioner` is the orchestration entry point and
//! `tree` is the resulting output type.

pub mod block_tree;
pub mod edgetip;
pub mod evaluator;
pub mod hplane;
pub mod partitioner;
pub mod segment;
pub mod subspace;
pub mod tree;

pub use partitioner::Partitioner;
pub use segment::{LineSegment, SideKind, SideRef};
pub use tree::{BspElement, BspLeaf, BspTree, Partition};