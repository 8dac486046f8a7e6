//! Growth chains: train a verse, widen it by one, train again.
//!
//! Every width gets its own generator seeded with the width itself, so the
//! whole chain is reproducible from its bounds alone. The chain owns exactly
//! one parameter set at a time; the previous link is moved in, read once to
//! seed the wider set, and dropped.

use std::ops::ControlFlow;

use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::decoder::{Dominant, dominant};
use super::optimizer::{Optimizer, OptimizerConfig};
use super::{BIAS, STATE, WEIGHT};
use crate::autodiff::Graph;
use crate::error::{Result, VerseError};
use crate::tensor::{ParameterSet, Scalar};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GrowthConfig {
    /// First width (inclusive).
    pub start: usize,
    /// Upper width bound (exclusive).
    pub end: usize,
    pub optimizer: OptimizerConfig,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            start: 2,
            end: 128,
            optimizer: OptimizerConfig {
                alpha: 0.0,
                iterations: 512,
                weight_feedback: true,
                ..Default::default()
            },
        }
    }
}

/// The observable of one link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthRecord {
    pub width: usize,
    pub dominant: Dominant,
    /// Cost magnitude of the last step.
    pub cost: f64,
}

/// Allocate the parameter set of a link of the given width: every tensor
/// has dimension `width + 1` and is drawn uniformly from `[-1, 1)`.
pub fn allocate_link<S: Scalar>(width: usize, rng: &mut StdRng) -> ParameterSet<S> {
    let dim = width + 1;
    let mut set = ParameterSet::new();
    set.add(WEIGHT, [dim, dim]);
    set.add(BIAS, [dim, 1]);
    set.add(STATE, [dim, 1]);
    set.randomize_uniform(rng, -1.0, 1.0);
    set
}

/// Copy the trained values of a dimension-`width` link into the top-left
/// corner of a dimension-`width + 1` link, verbatim.
pub fn inherit<S: Scalar>(
    next: &mut ParameterSet<S>,
    previous: &ParameterSet<S>,
    width: usize,
) -> Result<()> {
    let stride = width + 1;
    for name in [WEIGHT, BIAS, STATE] {
        let (old, new) = (previous.get(previous.id(name)?), next.get(next.id(name)?));
        if old.dims[0] != width || new.dims[0] != stride {
            return Err(VerseError::shape(
                "inherit",
                format!(
                    "{}: cannot grow {:?} into {:?} at width {}",
                    name, old.dims, new.dims, width
                ),
            ));
        }
    }

    let old = &previous.get(previous.id(WEIGHT)?).values;
    let new = &mut next.get_mut(next.id(WEIGHT)?).values;
    for j in 0..width {
        for i in 0..width {
            new[j * stride + i] = old[j * width + i];
        }
    }
    for name in [BIAS, STATE] {
        let old = &previous.get(previous.id(name)?).values;
        next.get_mut(next.id(name)?).values[..width].copy_from_slice(&old[..width]);
    }
    Ok(())
}

/// Iterator over trained links of strictly increasing width.
pub struct GrowthChain<S: Scalar> {
    config: GrowthConfig,
    width: usize,
    current: Option<(usize, ParameterSet<S>)>,
}

impl<S: Scalar> GrowthChain<S> {
    pub fn new(config: GrowthConfig) -> Self {
        let width = config.start;
        Self {
            config,
            width,
            current: None,
        }
    }

    /// The most recently trained link, if any.
    pub fn current(&self) -> Option<(usize, &ParameterSet<S>)> {
        self.current.as_ref().map(|(w, set)| (*w, set))
    }

    pub fn into_current(self) -> Option<(usize, ParameterSet<S>)> {
        self.current
    }

    /// Build the untrained set for `width`, seeded from the current link.
    fn seed_link(&self, width: usize, rng: &mut StdRng) -> Result<ParameterSet<S>> {
        let mut set = allocate_link(width, rng);
        if let Some((_, previous)) = &self.current {
            inherit(&mut set, previous, width)?;
        }
        Ok(set)
    }

    fn grow(&mut self, width: usize) -> Result<GrowthRecord> {
        let mut rng = StdRng::seed_from_u64(width as u64);
        let mut set = self.seed_link(width, &mut rng)?;
        // The previous link has no readers past this point.
        self.current = None;

        let (w, b, x) = (set.id(WEIGHT)?, set.id(BIAS)?, set.id(STATE)?);
        let mut graph = Graph::new();
        let cost = graph.autoencoder(&set, w, b, x, false)?;

        let mut optimizer = Optimizer::new(self.config.optimizer.clone(), &set)?;
        let last = optimizer.run(&mut set, &graph, cost, &mut rng, |_, _| {
            ControlFlow::Continue(())
        });

        let record = GrowthRecord {
            width,
            dominant: dominant(&set.get(x).values),
            cost: last.map(|r| r.cost.magnitude()).unwrap_or(0.0),
        };
        debug!(
            "grew width {} → state {} (|{:.4}|), cost {:.6}",
            width, record.dominant.index, record.dominant.magnitude, record.cost
        );
        self.current = Some((width, set));
        Ok(record)
    }
}

impl<S: Scalar> Iterator for GrowthChain<S> {
    type Item = Result<GrowthRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.width >= self.config.end {
            return None;
        }
        let width = self.width;
        self.width += 1;
        let result = self.grow(width);
        if result.is_err() {
            self.width = self.config.end;
        }
        Some(result)
    }
}
