//! Single-matrix quantum verse (`--verse`).
//!
//! One complex autoencoder of fixed width, trained with weight feedback.
//! The dominant state is decoded after every step so its drift can be
//! followed in the log.

use std::ops::ControlFlow;
use std::path::Path;

use log::{debug, info};
use num_complex::Complex64;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::RunSummary;
use crate::autodiff::Graph;
use crate::error::Result;
use crate::rendering::{RunProgress, scatter};
use crate::tensor::ParameterSet;
use crate::training::{
    BIAS, Dominant, Optimizer, OptimizerConfig, STATE, SavedRun, WEIGHT, dominant,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct QuantumConfig {
    pub seed: u64,
    pub width: usize,
    pub optimizer: OptimizerConfig,
}

impl Default for QuantumConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            width: 8,
            optimizer: OptimizerConfig {
                alpha: 0.0,
                iterations: 512,
                weight_feedback: true,
                ..Default::default()
            },
        }
    }
}

pub struct QuantumOutcome {
    pub set: ParameterSet<Complex64>,
    pub progress: RunProgress,
    /// Dominant state after each step.
    pub states: Vec<Dominant>,
    pub final_cost: Complex64,
}

pub fn train(config: &QuantumConfig) -> Result<QuantumOutcome> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut set = ParameterSet::<Complex64>::new();
    let w = set.add(WEIGHT, [config.width, config.width]);
    let b = set.add(BIAS, [config.width, 1]);
    let x = set.add(STATE, [config.width, 1]);
    set.randomize_uniform(&mut rng, -1.0, 1.0);

    let mut graph = Graph::new();
    let cost = graph.autoencoder(&set, w, b, x, false)?;
    let mut optimizer = Optimizer::new(config.optimizer.clone(), &set)?;

    let mut progress = RunProgress::new();
    let mut states = Vec::with_capacity(config.optimizer.iterations);
    let last = optimizer.run(&mut set, &graph, cost, &mut rng, |report, set| {
        let state = dominant(&set.get(x).values);
        progress.record(report.cost.norm(), report.norm);
        states.push(state);
        debug!(
            "{} {:.6} state={} max={:.4}",
            report.iteration,
            report.cost.norm(),
            state.index,
            state.magnitude
        );
        ControlFlow::Continue(())
    });

    Ok(QuantumOutcome {
        set,
        progress,
        states,
        final_cost: last.map(|r| r.cost).unwrap_or_default(),
    })
}

/// Train and write `verse.png` and `verse.json` into `output`.
pub fn run(config: &QuantumConfig, output: &Path) -> Result<RunSummary> {
    info!("quantum verse of width {}", config.width);
    let outcome = train(config)?;

    scatter(
        &outcome.progress.cost_points(),
        "epochs vs cost",
        "epochs",
        "cost",
        &output.join("verse.png"),
    )?;
    SavedRun::capture(&outcome.set, outcome.final_cost, outcome.progress.len())
        .save(&output.join("verse.json"))?;

    if let Some(state) = outcome.states.last() {
        info!(
            "final dominant state {} (|{:.4}|) over {} parameters",
            state.index,
            state.magnitude,
            outcome.set.scalar_count()
        );
    }
    outcome.progress.final_summary("verse");
    Ok(RunSummary {
        name: "verse".to_string(),
        iterations: outcome.progress.len(),
        final_cost: outcome.final_cost.norm(),
        diverged: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short() -> QuantumConfig {
        QuantumConfig {
            optimizer: OptimizerConfig {
                iterations: 30,
                ..QuantumConfig::default().optimizer
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_records_state_every_step() {
        let outcome = train(&short()).unwrap();
        assert_eq!(outcome.states.len(), 30);
        assert_eq!(outcome.progress.len(), 30);
        assert!(outcome.states.iter().all(|s| s.index < 8));
    }

    #[test]
    fn test_reproducible_from_seed() {
        let a = train(&short()).unwrap();
        let b = train(&short()).unwrap();
        assert_eq!(a.set, b.set);
        assert_eq!(a.states, b.states);
    }
}
