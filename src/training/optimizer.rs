//! Momentum optimizer with global-norm clipping.
//!
//! One step:
//!
//! ```text
//! zero grads → graph.gradient → ‖g‖ → [noise, re-norm] → scale → v = αv − η·s·g → x += v → [feedback]
//! ```
//!
//! Clipping is global: a single scaling factor derived from the joint L2
//! norm of every gradient entry is applied to all tensors alike.
//!
//! ## Variants
//!
//! - **Noise** (`noise = Some(φ)`): each gradient entry gets Gaussian noise
//!   with standard deviation `‖g‖·φ` before clipping, and the clip factor is
//!   recomputed from the noised gradient. Particle simulations use this.
//! - **Weight feedback**: after the update one random entry of `weight` is
//!   overwritten with the pre-clip norm, feeding the training signal's
//!   magnitude back into the parameters. Quantum verses and growth chains
//!   use this.

use std::ops::ControlFlow;

use log::trace;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::WEIGHT;
use crate::autodiff::{Graph, NodeId};
use crate::error::Result;
use crate::tensor::{ParamId, ParameterSet, Scalar};

/// Run parameters for one optimizer instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OptimizerConfig {
    /// Momentum coefficient α. Zero reduces the update to plain descent.
    pub alpha: f64,
    /// Learning rate η.
    pub eta: f64,
    /// Clip threshold τ on the global gradient norm.
    pub clip: f64,
    pub iterations: usize,
    /// Noise factor φ, scaled by the pre-noise gradient norm.
    pub noise: Option<f64>,
    pub weight_feedback: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            eta: 0.3,
            clip: 1.0,
            iterations: 512,
            noise: None,
            weight_feedback: false,
        }
    }
}

/// Outcome of one optimizer step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport<S: Scalar> {
    pub iteration: usize,
    /// Cost evaluated before this step's update.
    pub cost: S,
    /// Gradient norm before any noise was added.
    pub raw_norm: f64,
    /// Norm the clip factor was derived from (post-noise when noisy).
    pub norm: f64,
    pub scaling: f64,
}

/// Joint L2 norm over every gradient entry of every tensor.
pub fn global_norm<S: Scalar>(set: &ParameterSet<S>) -> f64 {
    set.tensors()
        .iter()
        .flat_map(|t| t.grads.iter())
        .map(|d| d.magnitude_squared())
        .sum::<f64>()
        .sqrt()
}

/// `1` when `norm ≤ threshold` (including a zero norm), else `threshold / norm`.
pub fn clip_scaling(norm: f64, threshold: f64) -> f64 {
    if norm > threshold && norm > 0.0 {
        threshold / norm
    } else {
        1.0
    }
}

pub struct Optimizer<S: Scalar> {
    config: OptimizerConfig,
    velocity: Vec<Vec<S>>,
    feedback: Option<ParamId>,
    iteration: usize,
}

impl<S: Scalar> Optimizer<S> {
    /// Velocity buffers are shaped after `set`, which must keep its layout
    /// for the lifetime of the optimizer.
    pub fn new(config: OptimizerConfig, set: &ParameterSet<S>) -> Result<Self> {
        let feedback = if config.weight_feedback {
            Some(set.id(WEIGHT)?)
        } else {
            None
        };
        let velocity = set
            .tensors()
            .iter()
            .map(|t| vec![S::zero(); t.len()])
            .collect();
        Ok(Self {
            config,
            velocity,
            feedback,
            iteration: 0,
        })
    }

    pub fn velocity(&self) -> &[Vec<S>] {
        &self.velocity
    }

    pub fn step<R: Rng + ?Sized>(
        &mut self,
        set: &mut ParameterSet<S>,
        graph: &Graph,
        cost: NodeId,
        rng: &mut R,
    ) -> StepReport<S> {
        set.zero_grads();
        let total = graph.gradient(cost, set);

        let raw_norm = global_norm(set);
        let norm = match self.config.noise {
            Some(factor) => {
                let std_dev = raw_norm * factor;
                for tensor in set.tensors_mut() {
                    for d in tensor.grads.iter_mut() {
                        *d += S::gaussian(rng, std_dev);
                    }
                }
                global_norm(set)
            }
            None => raw_norm,
        };
        let scaling = clip_scaling(norm, self.config.clip);

        let alpha = S::from_f64(self.config.alpha);
        let step = S::from_f64(self.config.eta * scaling);
        for (tensor, velocity) in set.tensors_mut().iter_mut().zip(&mut self.velocity) {
            for ((x, v), &d) in tensor.values.iter_mut().zip(velocity.iter_mut()).zip(&tensor.grads) {
                *v = alpha * *v - step * d;
                *x += *v;
            }
        }

        if let Some(weight) = self.feedback {
            let values = &mut set.get_mut(weight).values;
            if !values.is_empty() {
                let idx = rng.gen_range(0..values.len());
                values[idx] = S::from_f64(norm);
            }
        }

        let report = StepReport {
            iteration: self.iteration,
            cost: total,
            raw_norm,
            norm,
            scaling,
        };
        trace!(
            "step {} cost={:.6} norm={:.6} scaling={:.6}",
            report.iteration,
            total.magnitude(),
            norm,
            scaling
        );
        self.iteration += 1;
        report
    }

    /// Run `iterations` steps, handing each report to `observe`. Returns the
    /// last report, or `None` when no step ran. `observe` may stop the loop
    /// early by returning `ControlFlow::Break`.
    pub fn run<R, F>(
        &mut self,
        set: &mut ParameterSet<S>,
        graph: &Graph,
        cost: NodeId,
        rng: &mut R,
        mut observe: F,
    ) -> Option<StepReport<S>>
    where
        R: Rng + ?Sized,
        F: FnMut(&StepReport<S>, &ParameterSet<S>) -> ControlFlow<()>,
    {
        let mut last = None;
        for _ in 0..self.config.iterations {
            let report = self.step(set, graph, cost, rng);
            last = Some(report);
            if observe(&report, set).is_break() {
                break;
            }
        }
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{BIAS, STATE};
    use num_complex::Complex64;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn autoencoder_set(width: usize, seed: u64) -> (ParameterSet<f32>, Graph, NodeId, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut set = ParameterSet::new();
        let w = set.add(WEIGHT, [width, width]);
        let b = set.add(BIAS, [width, 1]);
        let x = set.add(STATE, [width, 2]);
        set.randomize_uniform(&mut rng, -1.0, 1.0);
        let mut graph = Graph::new();
        let cost = graph.autoencoder(&set, w, b, x, true).unwrap();
        (set, graph, cost, rng)
    }

    #[test]
    fn test_clip_scaling_rules() {
        assert_eq!(clip_scaling(0.0, 1.0), 1.0);
        assert_eq!(clip_scaling(0.5, 1.0), 1.0);
        assert_eq!(clip_scaling(1.0, 1.0), 1.0);
        assert!((clip_scaling(4.0, 1.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_global_norm_is_joint() {
        let mut set = ParameterSet::<Complex64>::new();
        let a = set.add("a", [1, 1]);
        let b = set.add("b", [2, 1]);
        set.get_mut(a).grads[0] = Complex64::new(3.0, 4.0);
        set.get_mut(b).grads[1] = Complex64::new(0.0, 12.0);
        assert!((global_norm(&set) - 13.0).abs() < 1e-12);
    }

    #[test]
    fn test_clipped_update_norm_within_threshold() {
        let (mut set, graph, cost, mut rng) = autoencoder_set(4, 11);
        // Scale state up so the raw gradient exceeds the threshold.
        for v in set.get_mut(set.id(STATE).unwrap()).values.iter_mut() {
            *v *= 10.0;
        }
        let config = OptimizerConfig {
            noise: Some(1.0),
            ..Default::default()
        };
        let mut opt = Optimizer::new(config, &set).unwrap();
        for _ in 0..5 {
            let report = opt.step(&mut set, &graph, cost, &mut rng);
            let clipped = global_norm(&set) * report.scaling;
            assert!(clipped <= 1.0 + 1e-5, "clipped norm {}", clipped);
        }
    }

    #[test]
    fn test_zero_momentum_is_plain_descent() {
        let (mut set, graph, cost, mut rng) = autoencoder_set(3, 2);
        let config = OptimizerConfig {
            alpha: 0.0,
            ..Default::default()
        };
        let mut opt = Optimizer::new(config, &set).unwrap();
        opt.step(&mut set, &graph, cost, &mut rng);

        let before = set.clone();
        let report = opt.step(&mut set, &graph, cost, &mut rng);
        for (old, new) in before.tensors().iter().zip(set.tensors()) {
            for k in 0..old.len() {
                let expected = old.values[k] - (0.3 * report.scaling) as f32 * new.grads[k];
                assert!((new.values[k] - expected).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_velocity_persists_across_steps() {
        let (mut set, graph, cost, mut rng) = autoencoder_set(3, 4);
        let mut opt = Optimizer::new(OptimizerConfig::default(), &set).unwrap();
        opt.step(&mut set, &graph, cost, &mut rng);
        let v1 = opt.velocity().to_vec();

        let before = set.clone();
        let report = opt.step(&mut set, &graph, cost, &mut rng);
        for (t, (old, new)) in before.tensors().iter().zip(set.tensors()).enumerate() {
            for k in 0..old.len() {
                let v = 0.3 * v1[t][k] - (0.3 * report.scaling) as f32 * new.grads[k];
                assert!((new.values[k] - (old.values[k] + v)).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_scalar_closed_form_step() {
        // 1×1 autoencoder: softmax of one entry is always 1, so the weight
        // and bias get no gradient and cost = 0.5·(x − 1)², ∂/∂x = x − 1.
        let mut set = ParameterSet::<f32>::new();
        let w = set.add(WEIGHT, [1, 1]);
        let b = set.add(BIAS, [1, 1]);
        let x = set.add(STATE, [1, 1]);
        set.get_mut(w).values[0] = 0.4;
        set.get_mut(b).values[0] = -0.2;
        set.get_mut(x).values[0] = 0.25;
        let mut graph = Graph::new();
        let cost = graph.autoencoder(&set, w, b, x, false).unwrap();

        let config = OptimizerConfig {
            alpha: 0.0,
            eta: 1.0,
            clip: 1.0,
            iterations: 1,
            noise: Some(0.0),
            weight_feedback: false,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut opt = Optimizer::new(config, &set).unwrap();
        let report = opt
            .run(&mut set, &graph, cost, &mut rng, |_, _| ControlFlow::Continue(()))
            .unwrap();

        let gradient = 0.25f32 - 1.0;
        assert!((report.cost - 0.5 * gradient * gradient).abs() < 1e-6);
        assert!((report.raw_norm - 0.75).abs() < 1e-6);
        assert_eq!(report.scaling, 1.0);
        assert_eq!(set.get(w).values[0], 0.4);
        assert_eq!(set.get(b).values[0], -0.2);
        assert!((set.get(x).values[0] - (0.25 - gradient)).abs() < 1e-6);
    }

    #[test]
    fn test_weight_feedback_writes_norm() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut set = ParameterSet::<Complex64>::new();
        let w = set.add(WEIGHT, [3, 3]);
        let b = set.add(BIAS, [3, 1]);
        let x = set.add(STATE, [3, 1]);
        set.randomize_uniform(&mut rng, -1.0, 1.0);
        let mut graph = Graph::new();
        let cost = graph.autoencoder(&set, w, b, x, false).unwrap();
        let config = OptimizerConfig {
            alpha: 0.0,
            weight_feedback: true,
            ..Default::default()
        };
        let mut opt = Optimizer::new(config, &set).unwrap();
        let report = opt.step(&mut set, &graph, cost, &mut rng);
        let written = Complex64::new(report.norm, 0.0);
        assert!(set.get(w).values.contains(&written));
    }

    #[test]
    fn test_feedback_requires_weight_tensor() {
        let mut set = ParameterSet::<f32>::new();
        set.add("a", [2, 2]);
        let config = OptimizerConfig {
            weight_feedback: true,
            ..Default::default()
        };
        assert!(Optimizer::new(config, &set).is_err());
    }

    #[test]
    fn test_run_stops_on_break() {
        let (mut set, graph, cost, mut rng) = autoencoder_set(3, 6);
        let mut opt = Optimizer::new(OptimizerConfig::default(), &set).unwrap();
        let mut seen = 0;
        let last = opt
            .run(&mut set, &graph, cost, &mut rng, |report, _| {
                seen += 1;
                if report.iteration == 4 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(seen, 5);
        assert_eq!(last.iteration, 4);
    }

    #[test]
    fn test_runs_are_reproducible() {
        let train = || {
            let (mut set, graph, cost, mut rng) = autoencoder_set(4, 21);
            let config = OptimizerConfig {
                iterations: 30,
                noise: Some(0.1),
                ..Default::default()
            };
            let mut opt = Optimizer::new(config, &set).unwrap();
            opt.run(&mut set, &graph, cost, &mut rng, |_, _| ControlFlow::Continue(()));
            set
        };
        assert_eq!(train(), train());
    }
}
