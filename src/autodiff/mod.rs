//! Minimal reverse-mode autodiff for verse cost expressions.
//!
//! Supports exactly the ops the experiments compose: affine products,
//! broadcast sums, elementwise products, transposes, softmax, the quadratic
//! reconstruction cost and averaging.

mod graph;

pub use graph::{Graph, NodeId};
