use anyhow::Result;
use log::{debug, info};
use std::time::Instant;

use vegetation_common::SimulationConfig;
use vegetation_engine::simulation::run_ensemble;
use vegetation_engine::store::{SimulationStore, StorageFormat};

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    info!("Starting vegetation automaton (CPU parallel)...");

    // --- Load Configuration ---
    let config = SimulationConfig::load("config.toml")?;
    let params = config.get_sim_params();

    info!("Using {} Rayon threads.", rayon::current_num_threads());
    info!(
        "Lattice {0}x{0} | {1} sweeps | {2} update attempts per sweep | carrying capacity {3:.4}",
        params.lattice_size, params.mc_steps, params.updates_per_sweep, params.carrying_capacity
    );
    debug!("Simulation parameters: {:#?}", params);

    // --- Run Ensemble ---
    info!(
        "Running {} independent trial(s)...",
        config.ensemble.num_trials
    );
    let start_time = Instant::now();
    let trajectories = run_ensemble(&config)?;
    info!(
        "{} trial(s) finished in {:.3} seconds.",
        trajectories.len(),
        start_time.elapsed().as_secs_f64()
    );

    // --- Store Trajectories ---
    let format_name = config.output.format.as_deref().unwrap_or("messagepack");
    let format = StorageFormat::from_name(format_name)
        .ok_or_else(|| anyhow::anyhow!("Unknown storage format: {}", format_name))?;
    let mut store = SimulationStore::open(&config.output.data_dir, format)?;

    for trajectory in &trajectories {
        let id = store.store_trajectory(trajectory)?;
        info!(
            "Stored simulation {} ({} snapshots, final cover {:.4}).",
            id,
            trajectory.len(),
            trajectory
                .last()
                .map(|lattice| lattice.vegetated_fraction())
                .unwrap_or(0.0)
        );
    }

    // --- Save Forest Cover Series ---
    if config.output.save_cover_series {
        write_cover_series(&config, &trajectories)?;
    } else {
        info!("Skipping forest cover series as per config.");
    }

    info!("Simulation complete.");
    Ok(())
}

/// Writes the per-trial forest-cover curve, one row per sweep.
fn write_cover_series(
    config: &SimulationConfig,
    trajectories: &[vegetation_common::Trajectory],
) -> Result<()> {
    let filename = format!("{}_cover.csv", config.output.base_filename);
    let mut writer = csv::Writer::from_path(&filename)?;

    let mut header = vec!["step".to_string()];
    header.extend((0..trajectories.len()).map(|trial| format!("trial_{}", trial)));
    writer.write_record(&header)?;

    let series: Vec<Vec<f64>> = trajectories
        .iter()
        .map(|trajectory| trajectory.cover_series())
        .collect();
    let steps = series.iter().map(Vec::len).max().unwrap_or(0);

    for step in 0..steps {
        let mut row = vec![format!("{}", step + 1)];
        for trial in &series {
            row.push(
                trial
                    .get(step)
                    .map(|cover| format!("{:.6}", cover))
                    .unwrap_or_default(),
            );
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    info!("Forest cover series saved to {}", filename);
    Ok(())
}
