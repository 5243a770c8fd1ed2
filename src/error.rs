use thiserror::Error;

/// Failures raised by the automaton and the analysis pipeline. All are
/// terminal for the offending computation; nothing here is retried.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Global occupancy hit exactly 0 or 1, so the carrying-capacity feedback
    /// term's denominator vanishes.
    #[error("global occupancy is exactly {fraction}; feedback term undefined")]
    DegenerateOccupancy { fraction: f64 },

    /// Statistics or fitting requested on a histogram with zero clusters.
    #[error("no clusters present; statistic undefined")]
    EmptyClusterSet,

    /// Aggregation across lattices or series of incompatible sizes.
    #[error("size mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// The log-log regression has too few usable points to determine a line.
    #[error("regression is degenerate with {points} usable point(s)")]
    DegenerateFit { points: usize },

    /// A sampled time index lies beyond the trajectory's recorded steps.
    #[error("snapshot index {index} out of range for a {steps}-step trajectory")]
    SnapshotIndex { index: usize, steps: usize },
}

/// Failures raised by the simulation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Requested stored-simulation identifier does not exist.
    #[error("no stored simulation with index {requested} (store holds {available})")]
    InvalidIndex { requested: u64, available: u64 },

    #[error("store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode serialization failure: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("MessagePack encode failure: {0}")]
    MsgpackEncode(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decode failure: {0}")]
    MsgpackDecode(#[from] rmp_serde::decode::Error),
}
