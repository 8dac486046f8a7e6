//! Multiverse growth (`--multi`).
//!
//! Runs the complex growth chain and prints one `width state` line per link
//! on stdout, in the order the links finish.

use std::path::Path;

use log::info;
use num_complex::Complex64;

use super::RunSummary;
use crate::error::Result;
use crate::rendering::{Point, scatter};
use crate::tensor::ParameterSet;
use crate::training::{GrowthChain, GrowthConfig, GrowthRecord, SavedRun};

/// Every link's record plus the widest trained set.
pub struct MultiverseOutcome {
    pub records: Vec<GrowthRecord>,
    pub last: Option<ParameterSet<Complex64>>,
}

impl MultiverseOutcome {
    /// `(width, dominant state)` pairs.
    pub fn state_points(&self) -> Vec<Point> {
        self.records
            .iter()
            .map(|r| (r.width as f64, r.dominant.index as f64))
            .collect()
    }
}

/// Drive the chain to completion, handing every record to `on_link`.
/// Returns the records together with the widest trained link.
pub fn grow<F>(config: &GrowthConfig, mut on_link: F) -> Result<MultiverseOutcome>
where
    F: FnMut(&GrowthRecord),
{
    let mut chain = GrowthChain::<Complex64>::new(config.clone());
    let mut records = Vec::new();
    for record in chain.by_ref() {
        let record = record?;
        on_link(&record);
        records.push(record);
    }
    Ok(MultiverseOutcome {
        records,
        last: chain.into_current().map(|(_, set)| set),
    })
}

/// Grow from `config.start` up to `config.end`, printing each link and
/// writing `multiverse.png` and `multiverse.json` into `output`.
pub fn run(config: &GrowthConfig, output: &Path) -> Result<RunSummary> {
    info!("growing multiverse from width {} to {}", config.start, config.end);
    let outcome = grow(config, |record| {
        println!("{} {}", record.width, record.dominant.index);
    })?;

    scatter(
        &outcome.state_points(),
        "width vs state",
        "width",
        "state",
        &output.join("multiverse.png"),
    )?;

    let last_record = outcome.records.last();
    let final_cost = last_record.map(|r| r.cost).unwrap_or(0.0);
    if let Some(set) = &outcome.last {
        SavedRun::capture(set, Complex64::new(final_cost, 0.0), config.optimizer.iterations)
            .save(&output.join("multiverse.json"))?;
    }

    Ok(RunSummary {
        name: "multiverse".to_string(),
        iterations: outcome.records.len() * config.optimizer.iterations,
        final_cost,
        diverged: false,
    })
}
