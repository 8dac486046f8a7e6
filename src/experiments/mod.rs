//! Experiment modes.
//!
//! Each mode splits into a pure training function, which tests drive
//! directly, and a `run` that writes charts and artifacts to an output
//! directory.

pub mod connection;
pub mod contra;
pub mod multiverse;
pub mod particles;
pub mod quantum;

pub use connection::ConnectConfig;
pub use contra::ContraConfig;
pub use particles::{ParticleRun, ParticlesConfig};
pub use quantum::QuantumConfig;

/// What a finished run reports back to the binary.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub name: String,
    /// Steps that actually ran.
    pub iterations: usize,
    /// Cost magnitude at the last step (`|det|` for the connection mode).
    pub final_cost: f64,
    /// The run stopped early on a non-finite value.
    pub diverged: bool,
}
