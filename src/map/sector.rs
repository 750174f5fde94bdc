//! A sector is, from the builder's point of view, purely an identity the
//! leaves get attributed to. Floor/ceiling heights, textures, light, and
//! sector-type thinkers are external-collaborator concerns (spec.md §1)
//! that this crate never touches.

pub type SectorId = usize;
