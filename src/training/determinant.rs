//! Cofactor-expansion determinant used to watch trained matrices degenerate.
//!
//! Laplace expansion along the first row is `O(n!)`, so the dimension is
//! capped. Anything bigger should go through an LU factorization instead
//! (see the connection experiment), which changes rounding but not sign
//! conventions.

use crate::error::{Result, VerseError};
use crate::tensor::Scalar;

/// Largest dimension accepted by [`determinant`].
pub const MAX_COFACTOR_DIMENSION: usize = 10;

const SCRATCH: usize = MAX_COFACTOR_DIMENSION * MAX_COFACTOR_DIMENSION;

/// Determinant of the row-major `n×n` matrix held in `matrix`.
pub fn determinant<S: Scalar>(matrix: &[S], n: usize) -> Result<S> {
    if n > MAX_COFACTOR_DIMENSION {
        return Err(VerseError::DeterminantTooLarge {
            dimension: n,
            max: MAX_COFACTOR_DIMENSION,
        });
    }
    if n == 0 || matrix.len() < n * n {
        return Err(VerseError::shape(
            "determinant",
            format!("need {}x{} entries, got {}", n, n, matrix.len()),
        ));
    }
    Ok(expand(matrix, n))
}

fn expand<S: Scalar>(matrix: &[S], n: usize) -> S {
    if n == 1 {
        return matrix[0];
    }
    let mut minor = [S::zero(); SCRATCH];
    let mut det = S::zero();
    let mut sign = S::one();
    for f in 0..n {
        minor_without(matrix, &mut minor, f, n);
        det += sign * matrix[f] * expand(&minor, n - 1);
        sign = -sign;
    }
    det
}

/// Copy `matrix` minus row 0 and column `skip` into `minor`, packed as an
/// `(n-1)×(n-1)` row-major block.
fn minor_without<S: Scalar>(matrix: &[S], minor: &mut [S], skip: usize, n: usize) {
    let mut k = 0;
    for row in 1..n {
        for col in 0..n {
            if col != skip {
                minor[k] = matrix[row * n + col];
                k += 1;
            }
        }
    }
}
