//! verse - self-referential autoencoder experiments
//!
//! A small reverse-mode autodiff over real and complex tensors, a momentum
//! optimizer with global-norm clipping, and the experiments built on them:
//! noisy particle verses, complex single-matrix verses, growth chains that
//! widen a trained verse one dimension at a time, and determinant-monitored
//! contradiction runs.
//!
//! # Architecture
//!
//! ```text
//! ParameterSet → Graph (autoencoder / contradiction cost) → Optimizer loop → Decoder → Rendering
//!      ↓                        ↓                                ↓              ↓           ↓
//!   tensor                  autodiff                         training      dominant     plotters
//!  f32 / C64              mul, softmax,                  clip, noise,       state      png / gif
//!                          quadratic                       feedback
//! ```

pub mod autodiff;
pub mod config;
pub mod error;
pub mod experiments;
pub mod rendering;
pub mod tensor;
pub mod training;

pub use config::Config;
pub use error::{Result, VerseError};

// Re-export the training core
pub use autodiff::{Graph, NodeId};
pub use tensor::{ParamId, ParameterSet, Scalar, Tensor};
pub use training::{
    Dominant, GrowthChain, GrowthConfig, GrowthRecord, Optimizer, OptimizerConfig, SavedRun,
    StepReport, determinant, dominant,
};
