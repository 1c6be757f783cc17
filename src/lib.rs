//! Queue-delayed decoherence channel
//!
//! Capacity model and Monte Carlo simulator for a channel whose symbols wait
//! in a single-server queue and pick up bit flips the longer they wait.
//! The closed-form capacities live in [`capacity`], the per-symbol noise in
//! [`noise`], wait-time sampling in [`queue`] and the transmission harness in
//! [`sim`].

pub mod capacity;
pub mod config;
pub mod noise;
pub mod output;
pub mod params;
pub mod queue;
pub mod sim;
pub mod sweep;

use thiserror::Error;

// Re-export main types
pub use capacity::{
    capacity_curve, capacity_deterministic_service, capacity_random_service, CapacityCurve,
    CapacityPoint, QueueDiscipline,
};
pub use config::ChannelConfig;
pub use noise::{binary_entropy, flip_probability};
pub use params::{ChannelParameters, SERVICE_RATE};
pub use queue::{sample_wait_time, EventChainedQueue, WaitModel};
pub use sim::{run, RunPhase, SimConfig, SimulationResult, SimulationRunner, SymbolRecord};
pub use sweep::{run_sweep, SweepPoint};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("unstable queue: arrival rate {arrival_rate} >= service rate {service_rate}")]
    UnstableQueue { arrival_rate: f64, service_rate: f64 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
