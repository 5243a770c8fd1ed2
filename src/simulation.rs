use crate::error::EngineError;
use crate::neighborhood::NeighborhoodKernel;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use vegetation_common::{Lattice, SimParams, SimulationConfig, Trajectory};

/// Drives one independent automaton run: a lattice, its RNG, and the
/// precomputed neighborhood kernel.
pub struct LatticeSimulation {
    params: SimParams,
    kernel: NeighborhoodKernel,
    lattice: Lattice,
    rng: StdRng,
    current_step: u32,
    recorded: Trajectory,
}

impl LatticeSimulation {
    /// Initializes a run from the configuration. Each cell of the initial
    /// lattice is independently vegetated with probability one half.
    pub fn new(config: &SimulationConfig, seed: u64) -> Self {
        let params = config.get_sim_params();
        let kernel = NeighborhoodKernel::new(params.influence_radius, params.weight_decay);
        let mut rng = StdRng::seed_from_u64(seed);
        let lattice = initial_lattice(params.lattice_size, &mut rng);
        let recorded = Trajectory::new(params.lattice_size);

        LatticeSimulation {
            params,
            kernel,
            lattice,
            rng,
            current_step: 0,
            recorded,
        }
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Advances the run by one Monte Carlo sweep.
    pub fn step(&mut self) -> Result<(), EngineError> {
        sweep(&mut self.lattice, &self.kernel, &self.params, &mut self.rng)?;
        self.current_step += 1;
        Ok(())
    }

    /// Captures an independent deep copy of the current lattice.
    pub fn record_snapshot(&mut self) {
        self.recorded.push(self.lattice.clone());
    }

    /// Runs all configured sweeps, recording a snapshot after each. A run
    /// either completes every step or fails as a whole; there is no mid-run
    /// cancellation.
    pub fn run(mut self) -> Result<Trajectory, EngineError> {
        let total = self.params.mc_steps;
        for step in 0..total {
            self.step()?;
            self.record_snapshot();

            if (step + 1) % 25 == 0 || step + 1 == total {
                debug!(
                    "Sweep [{}/{}] | cover {:.4}",
                    step + 1,
                    total,
                    self.lattice.vegetated_fraction()
                );
            } else {
                trace!("Sweep [{}/{}] completed", step + 1, total);
            }
        }
        Ok(self.recorded)
    }
}

/// Builds the random initial lattice for a run.
fn initial_lattice(size: usize, rng: &mut StdRng) -> Lattice {
    let mut lattice = Lattice::bare(size);
    for i in 0..size {
        for j in 0..size {
            if rng.random::<f64>() < 0.5 {
                lattice.set(i, j, 1);
            }
        }
    }
    lattice
}

/// One Monte Carlo sweep of stochastic single-cell updates.
///
/// The global occupancy f is computed once, before any mutation; every
/// probability evaluation in the sweep uses this same value. Update attempts
/// sample cells uniformly with replacement, so a cell may be revisited or
/// missed within a sweep.
///
/// Transition probabilities are deliberately unclamped: a value above 1 acts
/// as certainty and a value below 0 as impossibility when compared against
/// the uniform draw. Occupancy of exactly 0 or 1 would put a zero in a
/// feedback denominator and fails the sweep instead.
pub fn sweep(
    lattice: &mut Lattice,
    kernel: &NeighborhoodKernel,
    params: &SimParams,
    rng: &mut StdRng,
) -> Result<(), EngineError> {
    let n = lattice.size();
    let f_current = lattice.vegetated_fraction();
    if f_current == 0.0 || f_current == 1.0 {
        return Err(EngineError::DegenerateOccupancy {
            fraction: f_current,
        });
    }

    let carrying = params.carrying_capacity;
    for _ in 0..params.updates_per_sweep {
        let i = rng.random_range(0..n);
        let j = rng.random_range(0..n);
        let density = kernel.density(lattice, i, j);

        if lattice.is_vegetated(i, j) {
            let prob_decay = (1.0 - density) + (f_current - carrying) / f_current;
            if rng.random::<f64>() < prob_decay {
                lattice.set(i, j, 0);
            }
        } else {
            let prob_growth = density + (carrying - f_current) / (1.0 - f_current);
            if rng.random::<f64>() < prob_growth {
                lattice.set(i, j, 1);
            }
        }
    }
    Ok(())
}

/// Runs the configured number of independent trials across the Rayon pool.
///
/// Trial i is seeded with base_seed + i and owns its lattice and RNG; trials
/// share no mutable state.
pub fn run_ensemble(config: &SimulationConfig) -> Result<Vec<Trajectory>, EngineError> {
    let base_seed = config.ensemble.base_seed;
    (0..config.ensemble.num_trials)
        .into_par_iter()
        .map(|trial| LatticeSimulation::new(config, base_seed.wrapping_add(trial as u64)).run())
        .collect()
}
