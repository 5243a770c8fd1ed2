use crate::error::EngineError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use vegetation_common::{Lattice, Trajectory};

/// Cluster-size histogram of one lattice snapshot.
///
/// `counts[s]` is the number of clusters of size s; index 0 counts bare cells
/// (each its own trivial non-cluster). The full form spans 0..=n^2; the
/// trimmed form drops trailing empty buckets above the largest observed
/// cluster size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterHistogram {
    counts: Vec<u64>,
}

/// Scalar summaries over clusters of size >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub num_clusters: u64,
    pub mean_size: f64,
    pub std_dev: f64,
}

impl ClusterHistogram {
    /// Wraps raw bucket counts; `counts[0]` must be the bare-cell bucket.
    pub fn from_counts(counts: Vec<u64>) -> Self {
        assert!(!counts.is_empty(), "histogram needs at least the bare bucket");
        ClusterHistogram { counts }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Number of bare cells (bucket 0).
    pub fn bare_cells(&self) -> u64 {
        self.counts[0]
    }

    /// Largest cluster size with a non-empty bucket, 0 when no clusters.
    pub fn largest_cluster(&self) -> usize {
        self.counts
            .iter()
            .rposition(|&c| c > 0)
            .filter(|&s| s >= 1)
            .unwrap_or(0)
    }

    /// Total number of clusters (sizes >= 1).
    pub fn cluster_count(&self) -> u64 {
        self.counts[1..].iter().sum()
    }

    /// Total vegetated cells, recovered as the size-weighted bucket sum.
    pub fn vegetated_cells(&self) -> u64 {
        self.counts
            .iter()
            .enumerate()
            .map(|(size, &count)| size as u64 * count)
            .sum()
    }

    /// Drops trailing empty buckets above the largest observed cluster size.
    /// The bare bucket is always kept.
    pub fn trim(&mut self) {
        let keep = self.largest_cluster() + 1;
        self.counts.truncate(keep);
    }

    /// Cluster count, mean size, and population standard deviation, weighted
    /// directly by bucket counts. Sizes >= 1 only: bucket 0 holds bare cells,
    /// not clusters.
    pub fn summarize(&self) -> Result<ClusterSummary, EngineError> {
        let num_clusters = self.cluster_count();
        if num_clusters == 0 {
            return Err(EngineError::EmptyClusterSet);
        }

        let mean_size = self.vegetated_cells() as f64 / num_clusters as f64;

        let mut deviation_sq_sum = 0.0;
        for (size, &count) in self.counts.iter().enumerate().skip(1) {
            if count == 0 {
                continue;
            }
            let deviation = size as f64 - mean_size;
            deviation_sq_sum += count as f64 * deviation * deviation;
        }
        let std_dev = (deviation_sq_sum / num_clusters as f64).sqrt();

        Ok(ClusterSummary {
            num_clusters,
            mean_size,
            std_dev,
        })
    }
}

/// Decomposes the lattice into 4-connected vegetated components and counts
/// clusters of each size.
///
/// Every cell is visited exactly once as a flood-fill seed. Unvisited bare
/// cells increment bucket 0; unvisited vegetated cells grow a component over
/// an explicit stack (no recursion, so lattice size cannot overflow the call
/// stack). With `trim` the trailing empty buckets are dropped; otherwise the
/// full n^2 + 1 bucket vector is returned.
pub fn label_clusters(lattice: &Lattice, trim: bool) -> ClusterHistogram {
    let n = lattice.size();
    let mut counts = vec![0u64; n * n + 1];
    let mut visited = vec![false; n * n];
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for i in 0..n {
        for j in 0..n {
            if visited[i * n + j] {
                continue;
            }
            visited[i * n + j] = true;

            if !lattice.is_vegetated(i, j) {
                counts[0] += 1;
                continue;
            }

            let mut cluster_size = 1u64;
            stack.push((i, j));
            while let Some((ci, cj)) = stack.pop() {
                // von Neumann neighbors; wrapping_sub turns underflow into an
                // out-of-range index caught by the bounds check.
                let neighbors = [
                    (ci.wrapping_sub(1), cj),
                    (ci + 1, cj),
                    (ci, cj.wrapping_sub(1)),
                    (ci, cj + 1),
                ];
                for (a, b) in neighbors {
                    if a >= n || b >= n {
                        continue;
                    }
                    if !visited[a * n + b] && lattice.is_vegetated(a, b) {
                        visited[a * n + b] = true;
                        stack.push((a, b));
                        cluster_size += 1;
                    }
                }
            }
            counts[cluster_size as usize] += 1;
        }
    }

    let mut histogram = ClusterHistogram::from_counts(counts);
    if trim {
        histogram.trim();
    }
    histogram
}

/// Labels every snapshot of a trajectory in parallel, one histogram per
/// recorded step.
pub fn label_trajectory(trajectory: &Trajectory, trim: bool) -> Vec<ClusterHistogram> {
    trajectory
        .snapshots()
        .par_iter()
        .map(|lattice| label_clusters(lattice, trim))
        .collect()
}

/// Averages the final-snapshot summaries across an ensemble of runs.
pub fn ensemble_summary(trajectories: &[Trajectory]) -> Result<ClusterSummary, EngineError> {
    if trajectories.is_empty() {
        return Err(EngineError::EmptyClusterSet);
    }
    let size = trajectories[0].size();
    for trajectory in trajectories {
        if trajectory.size() != size {
            return Err(EngineError::DimensionMismatch {
                expected: size,
                found: trajectory.size(),
            });
        }
    }

    let summaries: Vec<ClusterSummary> = trajectories
        .par_iter()
        .map(|trajectory| {
            let lattice = trajectory.last().ok_or(EngineError::EmptyClusterSet)?;
            label_clusters(lattice, true).summarize()
        })
        .collect::<Result<_, _>>()?;

    let count = summaries.len() as f64;
    Ok(ClusterSummary {
        num_clusters: (summaries.iter().map(|s| s.num_clusters).sum::<u64>() as f64 / count)
            .round() as u64,
        mean_size: summaries.iter().map(|s| s.mean_size).sum::<f64>() / count,
        std_dev: summaries.iter().map(|s| s.std_dev).sum::<f64>() / count,
    })
}
