use serde::{Deserialize, Serialize};

/// Runtime parameters derived from the configuration, used on every sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    /// Side length of the square lattice.
    pub lattice_size: usize,
    /// Total number of cells (lattice_size squared).
    pub cell_count: usize,
    /// Number of Monte Carlo sweeps in one run.
    pub mc_steps: u32,
    /// Single-cell update attempts per sweep (round(update_fraction * n^2)).
    pub updates_per_sweep: usize,
    /// Half-width of the neighborhood bounding square; neighbors qualify when
    /// their Euclidean distance is strictly below this.
    pub influence_radius: u32,
    /// Distance at which a neighbor's weight 1 - d/decay crosses zero.
    pub weight_decay: f64,
    /// Target long-run vegetated fraction, derived from rainfall.
    pub carrying_capacity: f64,
}
