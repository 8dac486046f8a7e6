//! Dominant-state decoding.

use serde::{Deserialize, Serialize};

use crate::tensor::Scalar;

/// Index and magnitude of the largest entry of a state vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dominant {
    pub index: usize,
    pub magnitude: f64,
}

/// Single left-to-right scan with a strict comparison, so ties keep the
/// lowest index and an all-zero (or empty) vector decodes to index 0.
pub fn dominant<S: Scalar>(values: &[S]) -> Dominant {
    let mut best = Dominant {
        index: 0,
        magnitude: 0.0,
    };
    for (index, value) in values.iter().enumerate() {
        let magnitude = value.magnitude();
        if magnitude > best.magnitude {
            best = Dominant { index, magnitude };
        }
    }
    best
}

/// Decode every particle column of a `[len, count]` tensor.
pub fn dominant_per_column<S: Scalar>(values: &[S], len: usize) -> Vec<Dominant> {
    if len == 0 {
        return Vec::new();
    }
    values.chunks(len).map(dominant).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    #[test]
    fn test_picks_largest_magnitude() {
        let d = dominant(&[c(0.1), c(0.9), c(0.5)]);
        assert_eq!(d.index, 1);
        assert!((d.magnitude - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_all_zero_decodes_to_first() {
        let d = dominant(&[c(0.0), c(0.0), c(0.0)]);
        assert_eq!(d, Dominant { index: 0, magnitude: 0.0 });
    }

    #[test]
    fn test_ties_keep_lowest_index() {
        let d = dominant(&[0.2f32, -0.7, 0.7, 0.1]);
        assert_eq!(d.index, 1);
    }

    #[test]
    fn test_complex_uses_modulus() {
        let d = dominant(&[Complex64::new(0.6, 0.0), Complex64::new(0.5, 0.5)]);
        assert_eq!(d.index, 1);
    }

    #[test]
    fn test_per_column() {
        let values = [0.1f32, 0.9, 0.3, 0.8, 0.0, 0.0];
        let ds = dominant_per_column(&values, 3);
        assert_eq!(ds.iter().map(|d| d.index).collect::<Vec<_>>(), vec![1, 0]);
    }
}
