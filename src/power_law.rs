use crate::cluster::{label_clusters, ClusterHistogram};
use crate::error::EngineError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use vegetation_common::Trajectory;

/// Ordinary least-squares line fit over paired samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// Power-law fit of a cluster-size survival curve. The exponent is the
/// sign-corrected slope of the log-log regression: survival curves decay, so
/// beta = -slope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub exponent: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// Means-based ordinary least squares:
/// m = (E[xy] - E[x]E[y]) / (E[x^2] - E[x]^2), with R^2 = 1 - SSE/SST.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<LineFit, EngineError> {
    if x.len() != y.len() {
        return Err(EngineError::DimensionMismatch {
            expected: x.len(),
            found: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(EngineError::DegenerateFit { points: x.len() });
    }

    let n = x.len() as f64;
    let mut ex = 0.0;
    let mut ey = 0.0;
    let mut exx = 0.0;
    let mut exy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        ex += xi;
        ey += yi;
        exx += xi * xi;
        exy += xi * yi;
    }
    ex /= n;
    ey /= n;
    exx /= n;
    exy /= n;

    let denominator = exx - ex * ex;
    if denominator == 0.0 {
        return Err(EngineError::DegenerateFit { points: x.len() });
    }
    let slope = (exy - ex * ey) / denominator;
    let intercept = (exx * ey - ex * exy) / denominator;

    let mut sse = 0.0;
    let mut sst = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let predicted = slope * xi + intercept;
        sse += (yi - predicted) * (yi - predicted);
        sst += (yi - ey) * (yi - ey);
    }
    if sst == 0.0 {
        return Err(EngineError::DegenerateFit { points: x.len() });
    }

    Ok(LineFit {
        slope,
        intercept,
        r_squared: 1.0 - sse / sst,
    })
}

/// Complementary cumulative distribution of cluster sizes: element s - 1 is
/// P(size >= s) for s = 1..=K, K the largest non-empty bucket. Suffix sums of
/// bucket counts over the total cluster count; non-increasing, in (0, 1].
pub fn survival_probabilities(histogram: &ClusterHistogram) -> Result<Vec<f64>, EngineError> {
    let total = histogram.cluster_count();
    if total == 0 {
        return Err(EngineError::EmptyClusterSet);
    }

    let counts = histogram.counts();
    let largest = histogram.largest_cluster();
    let mut probabilities = vec![0.0; largest];
    let mut suffix = 0u64;
    for size in (1..=largest).rev() {
        suffix += counts[size];
        probabilities[size - 1] = suffix as f64 / total as f64;
    }
    Ok(probabilities)
}

/// Truncates the repeated tail: keeps everything through the FIRST element
/// equal to the final value, dropping the flat artificial tail that would
/// otherwise bias the fit.
fn trim_repeated_tail(values: &[f64]) -> &[f64] {
    match values.last() {
        Some(&last) => {
            let first = values
                .iter()
                .position(|&v| v == last)
                .unwrap_or(values.len() - 1);
            &values[..=first]
        }
        None => values,
    }
}

/// Log-log regression of a survival curve against sizes 1..; reports the
/// sign-corrected exponent.
pub fn fit_curve(probabilities: &[f64]) -> Result<FitResult, EngineError> {
    let log_probabilities: Vec<f64> = probabilities.iter().map(|p| p.ln()).collect();
    let trimmed = trim_repeated_tail(&log_probabilities);
    let log_sizes: Vec<f64> = (1..=trimmed.len()).map(|s| (s as f64).ln()).collect();

    let line = linear_regression(&log_sizes, trimmed)?;
    Ok(FitResult {
        exponent: -line.slope,
        intercept: line.intercept,
        r_squared: line.r_squared,
    })
}

/// Fits the survival curve of a single snapshot's histogram.
pub fn fit_histogram(histogram: &ClusterHistogram) -> Result<FitResult, EngineError> {
    fit_curve(&survival_probabilities(histogram)?)
}

/// Pads each curve with trailing zeros to the longest length (no clusters of
/// those sizes were observed in the shorter runs) and averages element-wise.
pub fn average_curves(curves: &[Vec<f64>]) -> Vec<f64> {
    let max_len = curves.iter().map(Vec::len).max().unwrap_or(0);
    let mut averaged = vec![0.0; max_len];
    for curve in curves {
        for (i, &p) in curve.iter().enumerate() {
            averaged[i] += p;
        }
    }
    for value in &mut averaged {
        *value /= curves.len() as f64;
    }
    averaged
}

/// Ensemble fit: averages the survival curves of independent runs, then fits
/// the averaged curve itself.
pub fn fit_ensemble(histograms: &[ClusterHistogram]) -> Result<FitResult, EngineError> {
    if histograms.is_empty() {
        return Err(EngineError::EmptyClusterSet);
    }
    let curves: Vec<Vec<f64>> = histograms
        .iter()
        .map(survival_probabilities)
        .collect::<Result<_, _>>()?;
    fit_curve(&average_curves(&curves))
}

/// Power-law exponent across the ensemble at each sampled time index: labels
/// that snapshot in every trajectory, averages the survival curves, and fits.
/// All trajectories must share one lattice size.
pub fn exponent_time_series(
    trajectories: &[Trajectory],
    time_indices: &[usize],
) -> Result<Vec<(usize, FitResult)>, EngineError> {
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

    time_indices
        .iter()
        .map(|&time| {
            let histograms: Vec<ClusterHistogram> = trajectories
                .par_iter()
                .map(|trajectory| {
                    trajectory
                        .get(time)
                        .map(|lattice| label_clusters(lattice, true))
                        .ok_or(EngineError::SnapshotIndex {
                            index: time,
                            steps: trajectory.len(),
                        })
                })
                .collect::<Result<_, _>>()?;
            Ok((time, fit_ensemble(&histograms)?))
        })
        .collect()
}
