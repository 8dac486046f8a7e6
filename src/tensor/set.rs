//! Named parameter tensors.
//!
//! Shapes follow a `[len, count]` convention: `dims[0]` is the length of
//! each contiguous vector, `dims[1]` how many vectors are stored back to
//! back. A plain vector is `[len, 1]`; a weight matrix stores its rows.

use rand::Rng;

use super::scalar::Scalar;
use crate::error::{Result, VerseError};

/// Handle to a tensor inside a [`ParameterSet`], resolved once at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId(pub(crate) usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<S: Scalar> {
    pub name: String,
    pub dims: [usize; 2],
    pub values: Vec<S>,
    /// ∂cost/∂value, zeroed at the start of every iteration.
    pub grads: Vec<S>,
}

impl<S: Scalar> Tensor<S> {
    pub fn zeros(name: impl Into<String>, dims: [usize; 2]) -> Self {
        let len = dims[0] * dims[1];
        Self {
            name: name.into(),
            dims,
            values: vec![S::zero(); len],
            grads: vec![S::zero(); len],
        }
    }

    pub fn from_values(name: impl Into<String>, dims: [usize; 2], values: Vec<S>) -> Result<Self> {
        let name = name.into();
        if values.len() != dims[0] * dims[1] {
            return Err(VerseError::shape(
                "tensor",
                format!(
                    "{} has dims {:?} but {} values",
                    name,
                    dims,
                    values.len()
                ),
            ));
        }
        let grads = vec![S::zero(); values.len()];
        Ok(Self {
            name,
            dims,
            values,
            grads,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_vector(&self) -> bool {
        self.dims[1] == 1
    }
}

/// Ordered mapping from name to tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet<S: Scalar> {
    tensors: Vec<Tensor<S>>,
}

impl<S: Scalar> Default for ParameterSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Scalar> ParameterSet<S> {
    pub fn new() -> Self {
        Self {
            tensors: Vec::new(),
        }
    }

    /// Add a zero-filled tensor and return its handle.
    pub fn add(&mut self, name: impl Into<String>, dims: [usize; 2]) -> ParamId {
        self.push(Tensor::zeros(name, dims))
    }

    pub fn push(&mut self, tensor: Tensor<S>) -> ParamId {
        self.tensors.push(tensor);
        ParamId(self.tensors.len() - 1)
    }

    pub fn id(&self, name: &str) -> Result<ParamId> {
        self.tensors
            .iter()
            .position(|t| t.name == name)
            .map(ParamId)
            .ok_or_else(|| VerseError::UnknownTensor(name.to_string()))
    }

    pub fn get(&self, id: ParamId) -> &Tensor<S> {
        &self.tensors[id.0]
    }

    pub fn get_mut(&mut self, id: ParamId) -> &mut Tensor<S> {
        &mut self.tensors[id.0]
    }

    pub fn tensors(&self) -> &[Tensor<S>] {
        &self.tensors
    }

    pub fn tensors_mut(&mut self) -> &mut [Tensor<S>] {
        &mut self.tensors
    }

    /// Total number of scalar parameters across all tensors.
    pub fn scalar_count(&self) -> usize {
        self.tensors.iter().map(Tensor::len).sum()
    }

    pub fn zero_grads(&mut self) {
        for tensor in &mut self.tensors {
            tensor.grads.fill(S::zero());
        }
    }

    /// Fill every entry uniformly from `[lo, hi)`, tensor by tensor in
    /// insertion order.
    pub fn randomize_uniform<R: Rng + ?Sized>(&mut self, rng: &mut R, lo: f64, hi: f64) {
        for tensor in &mut self.tensors {
            for value in tensor.values.iter_mut() {
                *value = S::uniform(rng, lo, hi);
            }
        }
    }

    /// He-style initialization: matrices get `N(0, 1)·sqrt(2/dims[0])`,
    /// vectors start at zero.
    pub fn randomize_he<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for tensor in &mut self.tensors {
            if tensor.is_vector() {
                tensor.values.fill(S::zero());
            } else {
                let std_dev = (2.0 / tensor.dims[0] as f64).sqrt();
                for value in tensor.values.iter_mut() {
                    *value = S::gaussian(rng, std_dev);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_add_resolves_by_name() {
        let mut set = ParameterSet::<f32>::new();
        let w = set.add("weight", [3, 3]);
        let b = set.add("bias", [3, 1]);
        assert_eq!(set.id("weight").unwrap(), w);
        assert_eq!(set.id("bias").unwrap(), b);
        assert!(matches!(set.id("missing"), Err(VerseError::UnknownTensor(_))));
        assert_eq!(set.scalar_count(), 12);
    }

    #[test]
    fn test_buffers_match_dims() {
        let mut set = ParameterSet::<Complex64>::new();
        let id = set.add("state", [4, 2]);
        let t = set.get(id);
        assert_eq!(t.values.len(), 8);
        assert_eq!(t.grads.len(), 8);
        assert!(!t.is_vector());
    }

    #[test]
    fn test_from_values_rejects_bad_length() {
        let err = Tensor::<f32>::from_values("w", [2, 2], vec![1.0; 3]);
        assert!(err.is_err());
    }

    #[test]
    fn test_zero_grads() {
        let mut set = ParameterSet::<f32>::new();
        let id = set.add("weight", [2, 2]);
        set.get_mut(id).grads.fill(3.0);
        set.zero_grads();
        assert!(set.get(id).grads.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_he_init_zeroes_vectors() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut set = ParameterSet::<f32>::new();
        let w = set.add("weight", [16, 16]);
        let b = set.add("bias", [16, 1]);
        set.get_mut(b).values.fill(1.0);
        set.randomize_he(&mut rng);
        assert!(set.get(b).values.iter().all(|&v| v == 0.0));
        assert!(set.get(w).values.iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_uniform_init_is_reproducible() {
        let build = || {
            let mut rng = StdRng::seed_from_u64(42);
            let mut set = ParameterSet::<Complex64>::new();
            set.add("weight", [3, 3]);
            set.add("bias", [3, 1]);
            set.randomize_uniform(&mut rng, -1.0, 1.0);
            set
        };
        assert_eq!(build(), build());
    }
}
