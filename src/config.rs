//! Builder configuration (spec.md §6 external interfaces).

/// Tunables for a single [`crate::bsp::partitioner::Partitioner::make_bsp_tree`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildConfig {
    /// Weight applied to the split count in the partition cost function.
    /// Default matches the original: 7.
    pub split_cost_factor: i32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            split_cost_factor: 7,
        }
    }
}
