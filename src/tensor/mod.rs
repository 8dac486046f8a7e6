//! Tensors and parameter sets shared by every experiment.

pub mod scalar;
pub mod set;

pub use scalar::Scalar;
pub use set::{ParamId, ParameterSet, Tensor};
