//! Stochastic vegetation automaton on a square lattice, with cluster-size
//! decomposition and power-law scaling analysis of the resulting patterns.

pub mod cluster;
pub mod error;
pub mod neighborhood;
pub mod power_law;
pub mod simulation;
pub mod store;

pub use cluster::{label_clusters, label_trajectory, ClusterHistogram, ClusterSummary};
pub use error::{EngineError, StoreError};
pub use neighborhood::NeighborhoodKernel;
pub use power_law::{fit_ensemble, fit_histogram, FitResult, LineFit};
pub use simulation::{run_ensemble, LatticeSimulation};
pub use store::{SimulationStore, StorageFormat};
