//! Connection density (`--connect`).
//!
//! A zero matrix is filled in with ones, one random entry per step, and the
//! magnitude of its determinant is recorded as it fills. The matrices are
//! far beyond what cofactor expansion can handle, so this mode goes through
//! an LU factorization instead.

use std::path::Path;

use log::{debug, info};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::RunSummary;
use crate::error::{Result, VerseError};
use crate::rendering::{Point, scatter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConnectConfig {
    pub seed: u64,
    /// Matrix side.
    pub size: usize,
    pub steps: usize,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            size: 32,
            steps: 2048,
        }
    }
}

/// `|det|` of a row-major `n×n` buffer by LU decomposition.
pub fn lu_determinant(values: &[f64], n: usize) -> Result<f64> {
    if values.len() != n * n {
        return Err(VerseError::shape(
            "lu_determinant",
            format!("{} values for a {}x{} matrix", values.len(), n, n),
        ));
    }
    Ok(DMatrix::from_row_slice(n, n, values).determinant().abs())
}

/// `(step, |det|)` for every step of the fill.
pub fn density_series(config: &ConnectConfig) -> Result<Vec<Point>> {
    let n = config.size;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut matrix = vec![0.0f64; n * n];
    let mut points = Vec::with_capacity(config.steps);
    if matrix.is_empty() {
        return Ok(points);
    }
    for step in 0..config.steps {
        let entry = rng.gen_range(0..matrix.len());
        matrix[entry] = 1.0;
        let det = lu_determinant(&matrix, n)?;
        debug!("{} entry={} |det|={}", step, entry, det);
        points.push((step as f64, det));
    }
    Ok(points)
}

/// Fill the matrix and write `connection.png` into `output`.
pub fn run(config: &ConnectConfig, output: &Path) -> Result<RunSummary> {
    info!("connecting a {}x{} matrix over {} steps", config.size, config.size, config.steps);
    let points = density_series(config)?;
    scatter(&points, "time vs size", "time", "size", &output.join("connection.png"))?;

    let peak = points.iter().map(|p| p.1).fold(0.0, f64::max);
    info!("peak |det| {:.4e}", peak);
    Ok(RunSummary {
        name: "connection".to_string(),
        iterations: points.len(),
        final_cost: points.last().map(|p| p.1).unwrap_or(0.0),
        diverged: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::determinant;

    #[test]
    fn test_lu_matches_cofactor_expansion() {
        let m = [2.0, -1.0, 0.0, 1.0, 3.0, 4.0, 0.5, 0.0, -2.0];
        let lu = lu_determinant(&m, 3).unwrap();
        let cofactor: f64 = determinant(&m.map(|v| v as f32), 3).unwrap() as f64;
        assert!((lu - cofactor.abs()).abs() < 1e-4);
    }

    #[test]
    fn test_lu_rejects_short_buffer() {
        assert!(lu_determinant(&[1.0, 0.0, 0.0], 2).is_err());
    }

    #[test]
    fn test_series_has_one_point_per_step() {
        let config = ConnectConfig {
            size: 4,
            steps: 40,
            ..Default::default()
        };
        let points = density_series(&config).unwrap();
        assert_eq!(points.len(), 40);
        // A single one cannot give a 4x4 matrix full rank.
        assert_eq!(points[0].1, 0.0);
        assert!(points.iter().all(|p| p.1 >= 0.0 && p.1.is_finite()));
    }

    #[test]
    fn test_series_reproducible() {
        let config = ConnectConfig {
            size: 5,
            steps: 20,
            ..Default::default()
        };
        assert_eq!(density_series(&config).unwrap(), density_series(&config).unwrap());
    }
}
