//! A deterministic binary space partition builder for 2D polygonal level
//! maps in the id Tech 1 tradition (spec.md §1 Overview).
//!
//! [`bsp::Partitioner::make_bsp_tree`] is the entry point: it consumes a
//! set of [`map::Line`]s, writes the built leaf geometry into a
//! [`mesh::Mesh`], and returns a [`bsp::BspTree`] plus any
//! [`events::BuildEvent`]s noticed along the way.

pub mod bsp;
pub mod config;
pub mod error;
pub mod events;
pub mod geom;
pub mod map;
pub mod mesh;

pub use bsp::{BspTree, Partitioner};
pub use config::BuildConfig;
pub use error::BuildError;
pub use events::BuildEvent;
