//! Fixed-dimension coordinate tuples.
//!
//! `Coords` is the vector type used for positions, velocities, accelerations and forces. Every
//! binary operation checks that both operands share the same dimension and fails with
//! [`Error::DimensionMismatch`] otherwise; nothing is ever truncated or padded.

use crate::error::{Error, Result};
use nalgebra::DVector;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Coords(DVector<f64>);

impl Coords {
    /// The origin in `dimensions` dimensions.
    pub fn zeros(dimensions: usize) -> Self {
        Self(DVector::zeros(dimensions))
    }

    pub fn from_slice(values: &[f64]) -> Self {
        Self(DVector::from_column_slice(values))
    }

    pub fn from_vec(values: Vec<f64>) -> Self {
        Self(DVector::from_vec(values))
    }

    /// `(1/√2, 1/√2, ...)`. Unit length only when `dimensions == 2`.
    pub fn diagonal(dimensions: usize) -> Self {
        Self(DVector::from_element(dimensions, std::f64::consts::FRAC_1_SQRT_2))
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        self.0.as_slice()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.as_slice().to_vec()
    }

    pub fn is_origin(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }

    /// Euclidean length.
    pub fn norm(&self) -> f64 {
        self.0.norm()
    }

    pub fn distance_to(&self, other: &Coords) -> Result<f64> {
        self.check_dimensions(other)?;
        Ok((&other.0 - &self.0).norm())
    }

    /// Overwrites every component with `other`'s.
    pub fn set(&mut self, other: &Coords) -> Result<()> {
        self.check_dimensions(other)?;
        self.0.copy_from(&other.0);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.0.fill(0.0);
    }

    pub fn add_scalar(&mut self, value: f64) {
        self.0.add_scalar_mut(value);
    }

    pub fn add(&mut self, other: &Coords) -> Result<()> {
        self.check_dimensions(other)?;
        self.0 += &other.0;
        Ok(())
    }

    pub fn subtract(&mut self, other: &Coords) -> Result<()> {
        self.check_dimensions(other)?;
        self.0 -= &other.0;
        Ok(())
    }

    pub fn mult(&mut self, factor: f64) {
        self.0 *= factor;
    }

    /// Element-wise product.
    pub fn mult_elementwise(&mut self, other: &Coords) -> Result<()> {
        self.check_dimensions(other)?;
        self.0.component_mul_assign(&other.0);
        Ok(())
    }

    /// Scalar product returned as a new tuple; the receiver is left untouched.
    pub fn scaled(&self, factor: f64) -> Coords {
        Coords(&self.0 * factor)
    }

    /// `other - self`.
    pub fn delta_to(&self, other: &Coords) -> Result<Coords> {
        self.check_dimensions(other)?;
        Ok(Coords(&other.0 - &self.0))
    }

    /// Cosine of the angle between the point and the first axis, `x / hypot(x, y)`.
    ///
    /// At the origin this is `0 / 0` and therefore NaN; callers that may hit the origin must
    /// check [`Coords::hypot_2d`] first.
    pub fn cos_theta_2d(&self) -> Result<f64> {
        let (x, y) = self.xy()?;
        Ok(x / x.hypot(y))
    }

    /// Sine of the angle between the point and the first axis, `y / hypot(x, y)`.
    ///
    /// NaN at the origin, see [`Coords::cos_theta_2d`].
    pub fn sin_theta_2d(&self) -> Result<f64> {
        let (x, y) = self.xy()?;
        Ok(y / x.hypot(y))
    }

    pub fn hypot_2d(&self) -> Result<f64> {
        let (x, y) = self.xy()?;
        Ok(x.hypot(y))
    }

    /// Clockwise rotation in the plane of the first two axes:
    /// `x' = cosθ·x + sinθ·y`, `y' = -sinθ·x + cosθ·y`.
    ///
    /// Components beyond the second are left as they are.
    pub fn rotate_2d(&mut self, sin_theta: f64, cos_theta: f64) -> Result<()> {
        let (x, y) = self.xy()?;
        self.0[0] = cos_theta * x + sin_theta * y;
        self.0[1] = -sin_theta * x + cos_theta * y;
        Ok(())
    }

    /// Reflects across the first axis by negating the second coordinate.
    pub fn reflect_x_axis(&mut self) -> Result<()> {
        self.xy()?;
        self.0[1] = -self.0[1];
        Ok(())
    }

    fn xy(&self) -> Result<(f64, f64)> {
        if self.0.len() < 2 {
            return Err(Error::DimensionMismatch {
                expected: 2,
                found: self.0.len(),
            });
        }
        Ok((self.0[0], self.0[1]))
    }

    fn check_dimensions(&self, other: &Coords) -> Result<()> {
        if self.0.len() != other.0.len() {
            return Err(Error::DimensionMismatch {
                expected: self.0.len(),
                found: other.0.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}
