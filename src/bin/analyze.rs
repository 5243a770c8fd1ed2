//! Cluster analysis of a stored simulation: prompts for a simulation index,
//! labels every snapshot, persists the histogram series, and reports the
//! final-snapshot statistics and power-law fit.

use anyhow::{Context, Result};
use log::info;
use std::io::{self, Write};
use std::time::Instant;

use vegetation_common::SimulationConfig;
use vegetation_engine::cluster::label_trajectory;
use vegetation_engine::power_law::fit_histogram;
use vegetation_engine::store::{SimulationStore, StorageFormat};

fn main() -> Result<()> {
    env_logger::init();

    let config = SimulationConfig::load("config.toml")?;
    let format_name = config.output.format.as_deref().unwrap_or("messagepack");
    let format = StorageFormat::from_name(format_name)
        .ok_or_else(|| anyhow::anyhow!("Unknown storage format: {}", format_name))?;
    let store = SimulationStore::open(&config.output.data_dir, format)?;

    if store.is_empty() {
        anyhow::bail!(
            "No stored simulations in '{}'; run the engine first.",
            config.output.data_dir
        );
    }

    print!("Enter simulation index: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let index: u64 = line
        .trim()
        .parse()
        .context("expected an integer simulation index")?;

    let trajectory = store.load_trajectory(index)?;
    info!(
        "Loaded simulation {} ({} snapshots of a {}x{} lattice).",
        index,
        trajectory.len(),
        trajectory.size(),
        trajectory.size()
    );

    let start_time = Instant::now();
    let histograms = label_trajectory(&trajectory, true);
    info!(
        "Labeled {} snapshot(s) in {:.3} seconds.",
        histograms.len(),
        start_time.elapsed().as_secs_f64()
    );
    store.store_histograms(&histograms, index)?;
    info!("Histogram series stored for simulation {}.", index);

    let final_histogram = histograms
        .last()
        .context("simulation has no recorded snapshots")?;
    let summary = final_histogram.summarize()?;
    println!("Clusters: {}", summary.num_clusters);
    println!("Mean cluster size: {:.3}", summary.mean_size);
    println!("Cluster size SD: {:.3}", summary.std_dev);

    let fit = fit_histogram(final_histogram)?;
    println!(
        "Power-law exponent: {:.4} (intercept {:.4}, R^2 {:.4})",
        fit.exponent, fit.intercept, fit.r_squared
    );

    Ok(())
}
