use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Square binary grid of vegetation states: 0 = bare, 1 = vegetated.
///
/// Stored row-major in a flat vector. Cloning performs the deep copy used to
/// capture trajectory snapshots, so stored snapshots never alias the live
/// lattice being mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lattice {
    size: usize,
    cells: Vec<u8>,
}

impl Lattice {
    /// An all-bare lattice of the given side length.
    pub fn bare(size: usize) -> Self {
        Lattice {
            size,
            cells: vec![0; size * size],
        }
    }

    /// Builds a lattice from row-major cell values.
    pub fn from_cells(size: usize, cells: Vec<u8>) -> Result<Self> {
        if cells.len() != size * size {
            anyhow::bail!(
                "expected {} cells for a {}x{} lattice, got {}",
                size * size,
                size,
                size,
                cells.len()
            );
        }
        if cells.iter().any(|&c| c > 1) {
            anyhow::bail!("lattice cells must be 0 or 1");
        }
        Ok(Lattice { size, cells })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of cells (size squared).
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> u8 {
        self.cells[i * self.size + j]
    }

    #[inline(always)]
    pub fn set(&mut self, i: usize, j: usize, value: u8) {
        debug_assert!(value <= 1);
        self.cells[i * self.size + j] = value;
    }

    #[inline(always)]
    pub fn is_vegetated(&self, i: usize, j: usize) -> bool {
        self.get(i, j) == 1
    }

    /// Number of vegetated cells.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|&&c| c == 1).count()
    }

    /// Fraction of vegetated cells, the global occupancy f.
    pub fn vegetated_fraction(&self) -> f64 {
        self.occupied() as f64 / self.cell_count() as f64
    }
}

/// Time-ordered sequence of lattice snapshots from a single run.
///
/// Insertion order is simulated-time order; once a run completes the
/// trajectory is only read, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    size: usize,
    snapshots: Vec<Lattice>,
}

impl Trajectory {
    pub fn new(size: usize) -> Self {
        Trajectory {
            size,
            snapshots: Vec::new(),
        }
    }

    /// Appends a snapshot. Panics if the lattice side differs from the
    /// trajectory's; all snapshots of one run share a fixed size.
    pub fn push(&mut self, snapshot: Lattice) {
        assert_eq!(
            snapshot.size(),
            self.size,
            "snapshot size does not match trajectory"
        );
        self.snapshots.push(snapshot);
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[Lattice] {
        &self.snapshots
    }

    pub fn get(&self, step: usize) -> Option<&Lattice> {
        self.snapshots.get(step)
    }

    pub fn last(&self) -> Option<&Lattice> {
        self.snapshots.last()
    }

    /// Vegetated fraction at every recorded step, the forest-cover curve.
    pub fn cover_series(&self) -> Vec<f64> {
        self.snapshots
            .iter()
            .map(Lattice::vegetated_fraction)
            .collect()
    }
}
