//! Training core.
//!
//! - [`optimizer`]: momentum descent with global-norm clipping, optional
//!   noise injection and weight feedback
//! - [`growth`]: chains of runs of increasing width, each seeded from the
//!   previous link's trained values
//! - [`determinant`]: cofactor determinant for degeneracy monitoring
//! - [`decoder`]: dominant-state extraction
//! - [`artifact`]: saved weights
//!
//! ## Tensor names
//!
//! Every autoencoder verse is `softmax(weight·state + bias)` trained to
//! reconstruct `state`. Particle runs call the state `particles`; each of
//! its columns is one particle.

pub mod artifact;
pub mod decoder;
pub mod determinant;
pub mod growth;
pub mod optimizer;

pub const WEIGHT: &str = "weight";
pub const BIAS: &str = "bias";
pub const STATE: &str = "state";
pub const PARTICLES: &str = "particles";

pub use artifact::{SavedRun, SavedTensor};
pub use decoder::{Dominant, dominant, dominant_per_column};
pub use determinant::{MAX_COFACTOR_DIMENSION, determinant};
pub use growth::{GrowthChain, GrowthConfig, GrowthRecord, allocate_link, inherit};
pub use optimizer::{
    Optimizer, OptimizerConfig, StepReport, clip_scaling, global_norm,
};
