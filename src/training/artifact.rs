//! Saved weights: one trained parameter set plus its final cost.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tensor::{ParameterSet, Scalar, Tensor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SavedTensor<S: Scalar> {
    pub name: String,
    pub dims: [usize; 2],
    pub values: Vec<S>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SavedRun<S: Scalar> {
    pub tensors: Vec<SavedTensor<S>>,
    pub cost: S,
    pub iterations: usize,
}

impl<S: Scalar> SavedRun<S> {
    pub fn capture(set: &ParameterSet<S>, cost: S, iterations: usize) -> Self {
        let tensors = set
            .tensors()
            .iter()
            .map(|t| SavedTensor {
                name: t.name.clone(),
                dims: t.dims,
                values: t.values.clone(),
            })
            .collect();
        Self {
            tensors,
            cost,
            iterations,
        }
    }

    /// Rebuild the parameter set; gradients start at zero.
    pub fn restore(&self) -> Result<ParameterSet<S>> {
        let mut set = ParameterSet::new();
        for saved in &self.tensors {
            set.push(Tensor::from_values(
                saved.name.clone(),
                saved.dims,
                saved.values.clone(),
            )?);
        }
        Ok(set)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{BIAS, WEIGHT};
    use num_complex::Complex64;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_complex_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("verse.json");

        let mut rng = StdRng::seed_from_u64(1);
        let mut set = ParameterSet::<Complex64>::new();
        set.add(WEIGHT, [3, 3]);
        set.add(BIAS, [3, 1]);
        set.randomize_uniform(&mut rng, -1.0, 1.0);

        let run = SavedRun::capture(&set, Complex64::new(0.25, -0.5), 512);
        run.save(&path).unwrap();
        let loaded = SavedRun::<Complex64>::load(&path).unwrap();

        assert_eq!(loaded, run);
        assert_eq!(loaded.restore().unwrap(), set);
    }

    #[test]
    fn test_restore_rejects_inconsistent_dims() {
        let run = SavedRun {
            tensors: vec![SavedTensor {
                name: WEIGHT.to_string(),
                dims: [2, 2],
                values: vec![1.0f32; 3],
            }],
            cost: 0.0,
            iterations: 1,
        };
        assert!(run.restore().is_err());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = SavedRun::<f32>::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, crate::error::VerseError::Io(_)));
    }
}
