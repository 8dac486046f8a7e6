//! Contradiction verse (`--contra`).
//!
//! Two complex matrices `a` and `b` are pushed to make `b·aᵀ` agree with
//! `a·b` while their elementwise product shrinks. The cofactor determinant
//! of both is tracked every step; once either becomes non-finite the
//! matrices have degenerated and training stops with what it has.

use std::ops::ControlFlow;
use std::path::Path;

use log::{debug, info, warn};
use num_complex::Complex64;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::RunSummary;
use crate::autodiff::{Graph, NodeId};
use crate::error::{Result, VerseError};
use crate::rendering::{Point, RunProgress, SeriesPair, histogram, scatter, scatter_pair};
use crate::tensor::{ParamId, ParameterSet, Scalar};
use crate::training::{Optimizer, OptimizerConfig, determinant};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContraConfig {
    pub seed: u64,
    pub width: usize,
    pub histogram_bins: usize,
    pub optimizer: OptimizerConfig,
}

impl Default for ContraConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            width: 8,
            histogram_bins: 256,
            optimizer: OptimizerConfig {
                alpha: 0.0,
                iterations: 1024,
                ..Default::default()
            },
        }
    }
}

pub struct ContraOutcome {
    pub set: ParameterSet<Complex64>,
    pub progress: RunProgress,
    /// `(iteration, log10|det a|)` per completed step.
    pub det_a: Vec<Point>,
    pub det_b: Vec<Point>,
    /// True when a determinant went non-finite before the budget ran out.
    pub diverged: bool,
}

/// `avg(quadratic(b·aᵀ, a·b)) + avg(hadamard(a, b))`
pub fn contradiction_cost(
    graph: &mut Graph,
    set: &ParameterSet<Complex64>,
    a: ParamId,
    b: ParamId,
) -> Result<NodeId> {
    let an = graph.param(set, a);
    let bn = graph.param(set, b);
    let ab = graph.mul(an, bn)?;
    let at = graph.transpose(an);
    let bat = graph.mul(bn, at)?;
    let mismatch = graph.quadratic(bat, ab)?;
    let mismatch = graph.avg(mismatch);
    let overlap = graph.hadamard(an, bn)?;
    let overlap = graph.avg(overlap);
    graph.add(mismatch, overlap)
}

/// `log10|det|`, or `None` once the determinant is no longer finite.
fn monitored_magnitude(values: &[Complex64], n: usize) -> Result<Option<f64>> {
    let det = determinant(values, n)?;
    let magnitude = det.norm();
    if !Scalar::is_finite(det) || !magnitude.is_finite() {
        return Ok(None);
    }
    Ok(Some(magnitude.log10()))
}

pub fn train(config: &ContraConfig) -> Result<ContraOutcome> {
    let n = config.width;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut set = ParameterSet::<Complex64>::new();
    let a = set.add("a", [n, n]);
    let b = set.add("b", [n, n]);
    set.randomize_uniform(&mut rng, -1.0, 1.0);

    let mut graph = Graph::new();
    let cost = contradiction_cost(&mut graph, &set, a, b)?;
    let mut optimizer = Optimizer::new(config.optimizer.clone(), &set)?;

    // Fail on an oversized matrix before any training happens.
    determinant(&set.get(a).values, n)?;

    let mut progress = RunProgress::new();
    let (mut det_a, mut det_b) = (Vec::new(), Vec::new());
    let mut diverged = false;
    let mut failure: Option<VerseError> = None;
    optimizer.run(&mut set, &graph, cost, &mut rng, |report, set| {
        let monitored = monitored_magnitude(&set.get(a).values, n).and_then(|da| {
            Ok(da.zip(monitored_magnitude(&set.get(b).values, n)?))
        });
        let (da, db) = match monitored {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                warn!("determinant diverged at iteration {}", report.iteration);
                diverged = true;
                return ControlFlow::Break(());
            }
            Err(e) => {
                failure = Some(e);
                return ControlFlow::Break(());
            }
        };
        let i = report.iteration as f64;
        det_a.push((i, da));
        det_b.push((i, db));
        progress.record(report.cost.norm(), report.norm);
        debug!(
            "{} {:.6} |det a|=1e{:.2} |det b|=1e{:.2}",
            report.iteration,
            report.cost.norm(),
            da,
            db
        );
        ControlFlow::Continue(())
    });
    if let Some(e) = failure {
        return Err(e);
    }

    Ok(ContraOutcome {
        set,
        progress,
        det_a,
        det_b,
        diverged,
    })
}

/// Train and write `contraverse.png`, `det.png`, `histogram_a.png` and
/// `histogram_b.png` into `output`.
pub fn run(config: &ContraConfig, output: &Path) -> Result<RunSummary> {
    info!("contradiction verse of width {}", config.width);
    let outcome = train(config)?;

    scatter(
        &outcome.progress.cost_points(),
        "epochs vs cost",
        "epochs",
        "cost",
        &output.join("contraverse.png"),
    )?;
    scatter_pair(
        SeriesPair {
            first: &outcome.det_a,
            second: &outcome.det_b,
        },
        "epochs vs det",
        "epochs",
        "det",
        &output.join("det.png"),
    )?;
    for (tensor, file, title) in [(0, "histogram_a.png", "a matrix"), (1, "histogram_b.png", "b matrix")] {
        let magnitudes: Vec<f64> = outcome.set.tensors()[tensor]
            .values
            .iter()
            .map(|v| v.norm())
            .collect();
        histogram(&magnitudes, config.histogram_bins, title, &output.join(file))?;
    }

    outcome.progress.final_summary("contraverse");
    Ok(RunSummary {
        name: "contraverse".to_string(),
        iterations: outcome.progress.len(),
        final_cost: outcome.progress.costs().last().copied().unwrap_or(0.0),
        diverged: outcome.diverged,
    })
}
