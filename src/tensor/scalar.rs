//! Scalar abstraction over the two value types a verse can hold.
//!
//! Real verses train in `f32`; quantum verses train in `Complex64`. A run
//! picks one by type parameter, so the two never mix inside a set.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Serialize, de::DeserializeOwned};

pub trait Scalar:
    Copy
    + Debug
    + PartialEq
    + Default
    + Send
    + Sync
    + Serialize
    + DeserializeOwned
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + 'static
{
    fn zero() -> Self;
    fn one() -> Self;
    fn from_f64(value: f64) -> Self;
    fn exp(self) -> Self;
    /// Real part, used to shift softmax inputs.
    fn re(self) -> f64;
    /// Magnitude: `|x|` for reals, modulus for complex values.
    fn magnitude(self) -> f64;
    fn is_finite(self) -> bool;

    /// Uniform draw in `[lo, hi)`. Complex values draw both parts.
    fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> Self;

    /// Zero-mean Gaussian draw with the given standard deviation.
    fn gaussian<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> Self;

    fn magnitude_squared(self) -> f64 {
        let m = self.magnitude();
        m * m
    }
}

impl Scalar for f32 {
    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn exp(self) -> Self {
        f32::exp(self)
    }

    fn re(self) -> f64 {
        self as f64
    }

    fn magnitude(self) -> f64 {
        self.abs() as f64
    }

    fn is_finite(self) -> bool {
        f32::is_finite(self)
    }

    fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> Self {
        ((hi - lo) * rng.r#gen::<f64>() + lo) as f32
    }

    fn gaussian<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> Self {
        let z: f64 = rng.sample(StandardNormal);
        (z * std_dev) as f32
    }

    fn magnitude_squared(self) -> f64 {
        (self * self) as f64
    }
}

impl Scalar for Complex64 {
    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }

    fn one() -> Self {
        Complex64::new(1.0, 0.0)
    }

    fn from_f64(value: f64) -> Self {
        Complex64::new(value, 0.0)
    }

    fn exp(self) -> Self {
        Complex64::exp(self)
    }

    fn re(self) -> f64 {
        self.re
    }

    fn magnitude(self) -> f64 {
        self.norm()
    }

    fn is_finite(self) -> bool {
        Complex64::is_finite(self)
    }

    fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> Self {
        let re = (hi - lo) * rng.r#gen::<f64>() + lo;
        let im = (hi - lo) * rng.r#gen::<f64>() + lo;
        Complex64::new(re, im)
    }

    fn gaussian<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> Self {
        let re: f64 = rng.sample(StandardNormal);
        let im: f64 = rng.sample(StandardNormal);
        Complex64::new(re * std_dev, im * std_dev)
    }

    fn magnitude_squared(self) -> f64 {
        self.norm_sqr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_uniform_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let x = <f32 as Scalar>::uniform(&mut rng, -1.0, 1.0);
            assert!((-1.0..1.0).contains(&x));
            let z = <Complex64 as Scalar>::uniform(&mut rng, -1.0, 1.0);
            assert!((-1.0..1.0).contains(&z.re));
            assert!((-1.0..1.0).contains(&z.im));
        }
    }

    #[test]
    fn test_complex_magnitude_is_modulus() {
        let z = Complex64::new(3.0, 4.0);
        assert!((z.magnitude() - 5.0).abs() < 1e-12);
        assert!((z.magnitude_squared() - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_detection() {
        assert!(!Scalar::is_finite(f32::NAN));
        assert!(!Scalar::is_finite(Complex64::new(f64::INFINITY, 0.0)));
        assert!(Scalar::is_finite(Complex64::new(1.0, -2.0)));
    }
}
