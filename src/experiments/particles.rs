//! Particle simulations (the default mode).
//!
//! A real-valued verse of width `size²` carries `n` particles as the columns
//! of its `particles` tensor. The noisy optimizer drives them around; every
//! iteration each particle is drawn at the grid cell of its dominant state.

use std::ops::ControlFlow;
use std::path::Path;

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::RunSummary;
use crate::autodiff::Graph;
use crate::error::{Result, VerseError};
use crate::rendering::{Frame, ParticleRaster, RunProgress, scatter};
use crate::tensor::ParameterSet;
use crate::training::{
    BIAS, Optimizer, OptimizerConfig, PARTICLES, SavedRun, WEIGHT, dominant_per_column,
};

/// One simulation: `particles` columns trained with noise factor `noise`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleRun {
    pub name: String,
    pub particles: usize,
    pub noise: f64,
}

impl ParticleRun {
    fn new(name: &str, particles: usize, noise: f64) -> Self {
        Self {
            name: name.to_string(),
            particles,
            noise,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ParticlesConfig {
    pub seed: u64,
    /// Grid side; the verse width is `size²`.
    pub size: usize,
    /// Pixels per grid cell.
    pub scale: usize,
    pub frame_delay_ms: u32,
    pub optimizer: OptimizerConfig,
    pub runs: Vec<ParticleRun>,
}

impl Default for ParticlesConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            size: 32,
            scale: 25,
            frame_delay_ms: 100,
            optimizer: OptimizerConfig {
                iterations: 2048,
                ..Default::default()
            },
            runs: vec![
                ParticleRun::new("verse", 1, 1.0),
                ParticleRun::new("verse", 2, 1.0),
                ParticleRun::new("verse", 3, 1.0),
                ParticleRun::new("verse", 8, 1.0),
                ParticleRun::new("verse_blackhole", 8, 0.1),
            ],
        }
    }
}

impl ParticlesConfig {
    pub fn width(&self) -> usize {
        self.size * self.size
    }

    /// Reject grids that cannot be trained or drawn. `source` names where the
    /// values came from in the error.
    pub fn validate(&self, source: &str) -> Result<()> {
        let problem = if self.size == 0 {
            "particles.size must be at least 1"
        } else if self.scale == 0 {
            "particles.scale must be at least 1"
        } else {
            return Ok(());
        };
        Err(VerseError::Config {
            path: source.to_string(),
            message: problem.to_string(),
        })
    }
}

pub fn run_all(config: &ParticlesConfig, output: &Path) -> Result<Vec<RunSummary>> {
    config
        .runs
        .iter()
        .map(|run| simulate(config, run, output))
        .collect()
}

/// Build the particle verse. Matrices (the weight, and the particles once
/// there are several) are He-initialized from `rng`; vectors start at zero.
pub fn particle_set(width: usize, particles: usize, rng: &mut StdRng) -> ParameterSet<f32> {
    let mut set = ParameterSet::new();
    set.add(WEIGHT, [width, width]);
    set.add(BIAS, [width, 1]);
    set.add(PARTICLES, [width, particles]);
    set.randomize_he(rng);
    set
}

/// Trained particle verse and its history.
pub struct ParticleOutcome {
    pub label: String,
    pub set: ParameterSet<f32>,
    pub progress: RunProgress,
    pub final_cost: f32,
}

/// Train one particle run, handing every frame to `on_frame`. A frame error
/// stops training and is returned.
pub fn train<F>(config: &ParticlesConfig, run: &ParticleRun, mut on_frame: F) -> Result<ParticleOutcome>
where
    F: FnMut(&Frame) -> Result<()>,
{
    config.validate("[particles]")?;
    let label = format!("{}_{}", run.name, run.particles);
    info!("simulating {} ({} particles, noise {})", label, run.particles, run.noise);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let width = config.width();
    let mut set = particle_set(width, run.particles, &mut rng);
    let (w, b, p) = (set.id(WEIGHT)?, set.id(BIAS)?, set.id(PARTICLES)?);

    let mut graph = Graph::new();
    let cost = graph.autoencoder(&set, w, b, p, true)?;

    let optimizer_config = OptimizerConfig {
        noise: Some(run.noise),
        ..config.optimizer.clone()
    };
    let iterations = optimizer_config.iterations;
    let mut optimizer = Optimizer::new(optimizer_config, &set)?;
    let extent = (config.size * config.scale) as u32;

    let mut progress = RunProgress::new();
    let mut failure: Option<VerseError> = None;
    let last = optimizer.run(&mut set, &graph, cost, &mut rng, |report, set| {
        progress.record(report.cost as f64, report.norm);
        debug!("{} {} {:.6} norm={:.4}", label, report.iteration, report.cost, report.norm);

        let dominants = dominant_per_column(&set.get(p).values, width);
        let frame = Frame::layout(&dominants, config.size, report.iteration, iterations, extent);
        match on_frame(&frame) {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => {
                failure = Some(e);
                ControlFlow::Break(())
            }
        }
    });
    if let Some(e) = failure {
        return Err(e);
    }

    Ok(ParticleOutcome {
        label,
        set,
        progress,
        final_cost: last.map(|r| r.cost).unwrap_or(0.0),
    })
}

/// Train one run and write `{name}_{n}.gif`, `{name}_epochs_{n}.png` and
/// `{name}_{n}.json` into `output`.
pub fn simulate(config: &ParticlesConfig, run: &ParticleRun, output: &Path) -> Result<RunSummary> {
    let gif_path = output.join(format!("{}_{}.gif", run.name, run.particles));
    let mut raster = ParticleRaster::create(&gif_path, config.size, config.scale, config.frame_delay_ms)?;
    let outcome = train(config, run, |frame| raster.push(frame))?;
    drop(raster);

    let ParticleOutcome {
        label,
        set,
        progress,
        final_cost,
    } = outcome;

    scatter(
        &progress.cost_points(),
        "epochs vs cost",
        "epochs",
        "cost",
        &output.join(format!("{}_epochs_{}.png", run.name, run.particles)),
    )?;
    SavedRun::capture(&set, final_cost, progress.len())
        .save(&output.join(format!("{}.json", label)))?;

    progress.final_summary(&label);
    Ok(RunSummary {
        name: label,
        iterations: progress.len(),
        final_cost: final_cost as f64,
        diverged: false,
    })
}
