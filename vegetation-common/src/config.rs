use crate::sim_params::SimParams;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Linear model between annual rainfall (mm) and equilibrium forest cover,
/// fitted against IKONOS imaging of the Kalahari transect (R^2 ~ 0.94).
pub const RAINFALL_COVER_SLOPE: f64 = 8.587709484891744e-4;
pub const RAINFALL_COVER_INTERCEPT: f64 = -0.17015471066607185;

// Configuration for the lattice geometry
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LatticeConfig {
    pub size: usize,
}

// Configuration for the Monte Carlo stepping scheme
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SteppingConfig {
    pub mc_steps: u32,
    pub update_fraction: f64,
}

// Configuration for the distance-weighted neighborhood
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NeighborhoodConfig {
    pub influence_radius: u32,
    pub weight_decay: f64,
}

// Climate forcing; rainfall sets the carrying capacity via the fitted
// rainfall-cover line.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ClimateConfig {
    pub rainfall_mm: f64,
}

// Configuration for independent ensemble trials
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EnsembleConfig {
    #[serde(default = "default_num_trials")]
    pub num_trials: usize,
    #[serde(default = "default_base_seed")]
    pub base_seed: u64,
}

fn default_num_trials() -> usize {
    1
}

fn default_base_seed() -> u64 {
    0
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        EnsembleConfig {
            num_trials: default_num_trials(),
            base_seed: default_base_seed(),
        }
    }
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub data_dir: String,
    pub base_filename: String,
    pub format: Option<String>, // Storage format: "json", "bincode", "messagepack"
    #[serde(default = "default_save_cover_series")]
    pub save_cover_series: bool,
}

fn default_save_cover_series() -> bool {
    false
}

/// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub lattice: LatticeConfig,
    pub stepping: SteppingConfig,
    pub neighborhood: NeighborhoodConfig,
    pub climate: ClimateConfig,
    #[serde(default)]
    pub ensemble: EnsembleConfig,
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e)
        })?;
        let config: SimulationConfig = toml::from_str(&config_str).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from '{}': {}", path_ref.display(), e)
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration invariants shared by both binaries.
    pub fn validate(&self) -> Result<()> {
        if self.lattice.size < 2 {
            anyhow::bail!("lattice size must be at least 2.");
        }
        if self.stepping.mc_steps == 0 {
            anyhow::bail!("mc_steps must be greater than 0.");
        }
        if !(0.0..=1.0).contains(&self.stepping.update_fraction) {
            anyhow::bail!("update_fraction must lie in [0, 1].");
        }
        if self.neighborhood.influence_radius < 1 {
            anyhow::bail!("influence_radius must be at least 1.");
        }
        if self.neighborhood.weight_decay <= 0.0 {
            anyhow::bail!("weight_decay must be positive.");
        }
        if self.ensemble.num_trials == 0 {
            anyhow::bail!("num_trials must be greater than 0.");
        }
        let carrying = self.carrying_capacity();
        if !(0.0..=1.0).contains(&carrying) || carrying == 0.0 || carrying == 1.0 {
            anyhow::bail!(
                "rainfall of {} mm maps to carrying capacity {:.4}, outside (0, 1).",
                self.climate.rainfall_mm,
                carrying
            );
        }
        Ok(())
    }

    /// Target vegetated fraction implied by the configured rainfall.
    pub fn carrying_capacity(&self) -> f64 {
        RAINFALL_COVER_SLOPE * self.climate.rainfall_mm + RAINFALL_COVER_INTERCEPT
    }

    /// Converts the configuration into the parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        let lattice_size = self.lattice.size;
        let cell_count = lattice_size * lattice_size;
        let updates_per_sweep =
            (self.stepping.update_fraction * cell_count as f64).round() as usize;

        SimParams {
            lattice_size,
            cell_count,
            mc_steps: self.stepping.mc_steps,
            updates_per_sweep,
            influence_radius: self.neighborhood.influence_radius,
            weight_decay: self.neighborhood.weight_decay,
            carrying_capacity: self.carrying_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_toml() -> &'static str {
        r#"
            [lattice]
            size = 100

            [stepping]
            mc_steps = 200
            update_fraction = 0.2

            [neighborhood]
            influence_radius = 4
            weight_decay = 6.0

            [climate]
            rainfall_mm = 500.0

            [ensemble]
            num_trials = 10
            base_seed = 42

            [output]
            data_dir = "automaton_data"
            base_filename = "vegetation"
            format = "messagepack"
            save_cover_series = true
        "#
    }

    #[test]
    fn parses_and_derives_params() {
        let config: SimulationConfig = toml::from_str(base_toml()).unwrap();
        config.validate().unwrap();

        let params = config.get_sim_params();
        assert_eq!(params.lattice_size, 100);
        assert_eq!(params.cell_count, 10_000);
        assert_eq!(params.updates_per_sweep, 2_000);
        assert_eq!(params.mc_steps, 200);
        assert_eq!(params.influence_radius, 4);
    }

    #[test]
    fn carrying_capacity_matches_rainfall_fit() {
        let config: SimulationConfig = toml::from_str(base_toml()).unwrap();
        let expected = RAINFALL_COVER_SLOPE * 500.0 + RAINFALL_COVER_INTERCEPT;
        assert!((config.carrying_capacity() - expected).abs() < 1e-12);
        assert!((config.carrying_capacity() - 0.2592).abs() < 1e-3);
    }

    #[test]
    fn ensemble_section_is_optional() {
        let toml_str = base_toml().replace("[ensemble]", "[removed]");
        let config: SimulationConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.ensemble.num_trials, 1);
        assert_eq!(config.ensemble.base_seed, 0);
    }

    #[test]
    fn rejects_degenerate_settings() {
        let mut config: SimulationConfig = toml::from_str(base_toml()).unwrap();
        config.neighborhood.influence_radius = 0;
        assert!(config.validate().is_err());

        let mut config: SimulationConfig = toml::from_str(base_toml()).unwrap();
        config.stepping.update_fraction = 1.5;
        assert!(config.validate().is_err());

        // 100 mm of rain maps to a negative cover fraction
        let mut config: SimulationConfig = toml::from_str(base_toml()).unwrap();
        config.climate.rainfall_mm = 100.0;
        assert!(config.validate().is_err());
    }
}
