//! End-to-end flow: simulate an ensemble, persist it, reload it, decompose
//! snapshots into clusters, and fit the size scaling.

use std::fs;
use std::path::PathBuf;

use vegetation_common::{
    ClimateConfig, EnsembleConfig, LatticeConfig, NeighborhoodConfig, OutputConfig,
    SimulationConfig, SteppingConfig,
};
use vegetation_engine::cluster::{ensemble_summary, label_trajectory};
use vegetation_engine::power_law::{exponent_time_series, fit_ensemble};
use vegetation_engine::simulation::run_ensemble;
use vegetation_engine::store::{SimulationStore, StorageFormat};

fn small_config() -> SimulationConfig {
    SimulationConfig {
        lattice: LatticeConfig { size: 24 },
        stepping: SteppingConfig {
            mc_steps: 8,
            update_fraction: 0.2,
        },
        neighborhood: NeighborhoodConfig {
            influence_radius: 3,
            weight_decay: 5.0,
        },
        climate: ClimateConfig { rainfall_mm: 550.0 },
        ensemble: EnsembleConfig {
            num_trials: 3,
            base_seed: 7,
        },
        output: OutputConfig {
            data_dir: "unused".to_string(),
            base_filename: "unused".to_string(),
            format: None,
            save_cover_series: false,
        },
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "vegetation-pipeline-{}-{}",
        name,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn simulate_store_label_and_fit() {
    let config = small_config();
    config.validate().expect("test config must be valid");

    let trajectories = run_ensemble(&config).unwrap();
    assert_eq!(trajectories.len(), 3);

    // Persist and reload one trial; the round trip must be lossless.
    let dir = scratch_dir("roundtrip");
    let mut store = SimulationStore::open(&dir, StorageFormat::MessagePack).unwrap();
    let id = store.store_trajectory(&trajectories[0]).unwrap();
    let reloaded = store.load_trajectory(id).unwrap();
    assert_eq!(reloaded, trajectories[0]);

    // Label every snapshot; every cell must be accounted for exactly once.
    let histograms = label_trajectory(&reloaded, true);
    assert_eq!(histograms.len(), reloaded.len());
    for histogram in &histograms {
        assert_eq!(
            histogram.vegetated_cells() + histogram.bare_cells(),
            (24 * 24) as u64
        );
    }
    store.store_histograms(&histograms, id).unwrap();
    assert_eq!(store.load_histograms(id).unwrap(), histograms);

    // Final-snapshot histograms across the ensemble feed the scaling fit.
    let final_histograms: Vec<_> = trajectories
        .iter()
        .map(|trajectory| {
            vegetation_engine::cluster::label_clusters(trajectory.last().unwrap(), true)
        })
        .collect();
    let fit = fit_ensemble(&final_histograms).unwrap();
    assert!(fit.exponent.is_finite());
    assert!(fit.r_squared.is_finite() && fit.r_squared <= 1.0);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn ensemble_statistics_and_time_series() {
    let config = small_config();
    let trajectories = run_ensemble(&config).unwrap();

    let summary = ensemble_summary(&trajectories).unwrap();
    assert!(summary.num_clusters > 0);
    assert!(summary.mean_size >= 1.0);
    assert!(summary.std_dev >= 0.0);

    let series = exponent_time_series(&trajectories, &[0, 3, 7]).unwrap();
    assert_eq!(series.len(), 3);
    for (time, fit) in &series {
        assert!([0, 3, 7].contains(time));
        assert!(fit.exponent.is_finite());
    }
}

#[test]
fn cover_stays_within_physical_bounds() {
    let config = small_config();
    let trajectories = run_ensemble(&config).unwrap();
    for trajectory in &trajectories {
        for cover in trajectory.cover_series() {
            assert!((0.0..=1.0).contains(&cover));
        }
    }
}
