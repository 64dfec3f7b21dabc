//! # Linear interpolation
//!
//! One-dimensional piecewise-linear interpolant over a sorted grid. Queries
//! outside the grid are extrapolated from the first/last segment, matching
//! the "safe ends" convention used by heat flux and section lookups: flux
//! arrays are extended with ghost values before being turned into
//! interpolants, so extrapolation only ever sees the boundary plateau.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterpolationError {
    #[error("x and y must have the same length ({0} != {1})")]
    LengthMismatch(usize, usize),
    #[error("at least two points are required, got {0}")]
    TooFewPoints(usize),
    #[error("x values must be strictly increasing")]
    NotSorted,
}

/// Piecewise-linear interpolant with linear extrapolation at both ends.
#[derive(Debug, Clone)]
pub struct Interp1d {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Interp1d {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, InterpolationError> {
        if x.len() != y.len() {
            return Err(InterpolationError::LengthMismatch(x.len(), y.len()));
        }
        if x.len() < 2 {
            return Err(InterpolationError::TooFewPoints(x.len()));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(InterpolationError::NotSorted);
        }
        Ok(Self { x, y })
    }

    /// Constant-valued interpolant, handy for uniform property profiles.
    pub fn constant(x0: f64, x1: f64, value: f64) -> Result<Self, InterpolationError> {
        Self::new(vec![x0, x1], vec![value, value])
    }

    /// Evaluate the interpolant at a single query point.
    pub fn eval(&self, xq: f64) -> f64 {
        let n = self.x.len();
        // Segment index: clamp to end segments so queries outside the grid
        // extrapolate linearly from the nearest one.
        let i = match self.x.partition_point(|&xi| xi <= xq) {
            0 => 0,
            k if k >= n => n - 2,
            k => k - 1,
        };
        let t = (xq - self.x[i]) / (self.x[i + 1] - self.x[i]);
        self.y[i] + t * (self.y[i + 1] - self.y[i])
    }

    /// Evaluate the interpolant on a set of query points.
    pub fn eval_many(&self, xq: &[f64]) -> Vec<f64> {
        xq.iter().map(|&x| self.eval(x)).collect()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interpolation_inside_grid() {
        let f = Interp1d::new(vec![0.0, 1.0, 2.0], vec![0.0, 2.0, 0.0]).unwrap();
        assert_relative_eq!(f.eval(0.5), 1.0, epsilon = 1e-14);
        assert_relative_eq!(f.eval(1.5), 1.0, epsilon = 1e-14);
        assert_relative_eq!(f.eval(1.0), 2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_extrapolation_from_end_segments() {
        let f = Interp1d::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 1.0]).unwrap();
        assert_relative_eq!(f.eval(-1.0), -1.0, epsilon = 1e-14);
        // Last segment is flat, so right extrapolation stays on the plateau.
        assert_relative_eq!(f.eval(5.0), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Interp1d::new(vec![0.0, 1.0], vec![0.0]).is_err());
        assert!(Interp1d::new(vec![0.0], vec![0.0]).is_err());
        assert!(Interp1d::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
    }
}
