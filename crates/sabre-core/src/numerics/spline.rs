//! Natural cubic spline over an ordered set of knots.
//!
//! The knot slopes `k_i` solve a tridiagonal system built from first- and
//! second-derivative continuity at interior knots, with the natural end
//! condition on the first and last rows. Segments are evaluated in the
//! symmetric form
//!
//! `y(t) = (1-t) y1 + t y2 + t (1-t) [(1-t) a + t b]`
//!
//! with `a = k1 h - Δy`, `b = -k2 h + Δy`, `h = x2 - x1`.

use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SplineError {
    #[error("spline input length mismatch: x={x_len}, y={y_len}")]
    LengthMismatch { x_len: usize, y_len: usize },
    #[error("spline requires at least 2 knots, got {actual}")]
    TooFewKnots { actual: usize },
    #[error(
        "spline knots must be strictly increasing, index {index} has {current} after {previous}"
    )]
    NonIncreasingKnots {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("spline knot {index} is not finite: ({x}, {y})")]
    NonFiniteKnot { index: usize, x: f64, y: f64 },
    #[error("spline has not been fitted")]
    NotFitted,
    #[error("x={x} is outside the spline domain [{min}, {max}]")]
    OutOfDomain { x: f64, min: f64, max: f64 },
    #[error("failed to read spline data '{path}': {reason}")]
    Read { path: String, reason: String },
}

/// One fitted interval between two neighbouring knots.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SplineSegment {
    pub x1: f64,
    pub x2: f64,
    pub y1: f64,
    pub y2: f64,
    pub k1: f64,
    pub k2: f64,
}

impl SplineSegment {
    pub fn contains(&self, x: f64) -> bool {
        x >= self.x1 && x <= self.x2
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let h = self.x2 - self.x1;
        let dy = self.y2 - self.y1;
        let t = (x - self.x1) / h;
        let a = self.k1 * h - dy;
        let b = -self.k2 * h + dy;
        (1.0 - t) * self.y1 + t * self.y2 + t * (1.0 - t) * ((1.0 - t) * a + t * b)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CubicSpline {
    segments: Vec<SplineSegment>,
}

impl CubicSpline {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, SplineError> {
        validate_knots(x, y)?;
        let slopes = solve_knot_slopes(x, y);

        let segments = x
            .windows(2)
            .zip(y.windows(2))
            .zip(slopes.windows(2))
            .map(|((xs, ys), ks)| SplineSegment {
                x1: xs[0],
                x2: xs[1],
                y1: ys[0],
                y2: ys[1],
                k1: ks[0],
                k2: ks[1],
            })
            .collect();

        Ok(Self { segments })
    }

    /// Placeholder for a dataset with no samples. Every evaluation fails with
    /// [`SplineError::NotFitted`].
    pub fn unfitted() -> Self {
        Self::default()
    }

    /// Reads a headerless whitespace-separated `x y` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SplineError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| SplineError::Read {
            path: path.display().to_string(),
            reason: source.to_string(),
        })?;

        let values = source
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| SplineError::Read {
                    path: path.display().to_string(),
                    reason: format!("invalid number '{token}'"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let x: Vec<f64> = values.iter().step_by(2).copied().collect();
        let y: Vec<f64> = values.iter().skip(1).step_by(2).copied().collect();
        Self::new(&x, &y)
    }

    pub fn is_fitted(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn knot_count(&self) -> usize {
        if self.segments.is_empty() {
            0
        } else {
            self.segments.len() + 1
        }
    }

    pub fn segments(&self) -> &[SplineSegment] {
        &self.segments
    }

    pub fn domain(&self) -> Option<(f64, f64)> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        Some((first.x1, last.x2))
    }

    pub fn evaluate(&self, x: f64) -> Result<f64, SplineError> {
        let (min, max) = self.domain().ok_or(SplineError::NotFitted)?;
        // Linear scan: tables hold tens of knots per bin.
        self.segments
            .iter()
            .find(|segment| segment.contains(x))
            .map(|segment| segment.evaluate(x))
            .ok_or(SplineError::OutOfDomain { x, min, max })
    }

    /// Returns 0.0 outside the fitted domain; still fails on an unfitted spline.
    pub fn evaluate_or_zero(&self, x: f64) -> Result<f64, SplineError> {
        match self.evaluate(x) {
            Err(SplineError::OutOfDomain { .. }) => Ok(0.0),
            other => other,
        }
    }
}

fn validate_knots(x: &[f64], y: &[f64]) -> Result<(), SplineError> {
    if x.len() != y.len() {
        return Err(SplineError::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(SplineError::TooFewKnots { actual: x.len() });
    }

    for (index, (&xi, &yi)) in x.iter().zip(y).enumerate() {
        if !xi.is_finite() || !yi.is_finite() {
            return Err(SplineError::NonFiniteKnot {
                index,
                x: xi,
                y: yi,
            });
        }
        if index > 0 && xi <= x[index - 1] {
            return Err(SplineError::NonIncreasingKnots {
                index,
                previous: x[index - 1],
                current: xi,
            });
        }
    }

    Ok(())
}

/// Thomas sweep over the sub-, main and super-diagonals of the knot system.
fn solve_knot_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut lower = vec![0.0; n];
    let mut diag = vec![0.0; n];
    let mut upper = vec![0.0; n];
    let mut rhs = vec![0.0; n];

    for i in 0..n {
        if i > 0 {
            let h = x[i] - x[i - 1];
            let dy = y[i] - y[i - 1];
            lower[i] = 1.0 / h;
            diag[i] += 2.0 / h;
            rhs[i] += 3.0 * dy / (h * h);
        }
        if i + 1 < n {
            let h = x[i + 1] - x[i];
            let dy = y[i + 1] - y[i];
            upper[i] = 1.0 / h;
            diag[i] += 2.0 / h;
            rhs[i] += 3.0 * dy / (h * h);
        }
    }

    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];
    c_prime[0] = upper[0] / diag[0];
    d_prime[0] = rhs[0] / diag[0];
    for i in 1..n {
        let pivot = diag[i] - lower[i] * c_prime[i - 1];
        c_prime[i] = upper[i] / pivot;
        d_prime[i] = (rhs[i] - lower[i] * d_prime[i - 1]) / pivot;
    }

    let mut slopes = vec![0.0; n];
    slopes[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        slopes[i] = d_prime[i] - c_prime[i] * slopes[i + 1];
    }
    slopes
}

#[cfg(test)]
mod tests {
    use super::{CubicSpline, SplineError};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn spline_reproduces_every_knot() {
        let x = [0.5, 1.0, 2.5, 3.0, 4.75, 6.0];
        let y = [2.0, -1.0, 0.25, 3.5, 3.0, -2.0];
        let spline = CubicSpline::new(&x, &y).expect("spline should fit");

        for (&xi, &yi) in x.iter().zip(&y) {
            let value = spline.evaluate(xi).expect("knot is in domain");
            assert!((value - yi).abs() < 1.0e-12, "at x={xi}: got {value}, expected {yi}");
        }
    }

    #[test]
    fn two_knot_spline_is_linear() {
        let spline = CubicSpline::new(&[0.0, 2.0], &[1.0, 5.0]).expect("spline should fit");
        assert_eq!(spline.knot_count(), 2);
        let mid = spline.evaluate(1.0).expect("in domain");
        assert!((mid - 3.0).abs() < 1.0e-12);
        let quarter = spline.evaluate(0.5).expect("in domain");
        assert!((quarter - 2.0).abs() < 1.0e-12);
    }

    #[test]
    fn straight_line_data_is_reproduced_between_knots() {
        let x = [0.0, 1.0, 3.0, 4.0, 7.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v - 1.0).collect();
        let spline = CubicSpline::new(&x, &y).expect("spline should fit");

        for point in [0.3, 1.7, 2.9, 5.5, 6.99] {
            let value = spline.evaluate(point).expect("in domain");
            assert!((value - (2.0 * point - 1.0)).abs() < 1.0e-10);
        }
    }

    #[test]
    fn first_derivative_is_continuous_at_interior_knots() {
        let x = [0.0, 1.0, 2.0, 4.0];
        let y = [0.0, 1.0, 0.0, 2.0];
        let spline = CubicSpline::new(&x, &y).expect("spline should fit");
        let segments = spline.segments();
        for pair in segments.windows(2) {
            assert_eq!(pair[0].k2, pair[1].k1);
            assert_eq!(pair[0].x2, pair[1].x1);
        }

        let step = 1.0e-6;
        let left = (spline.evaluate(1.0).unwrap() - spline.evaluate(1.0 - step).unwrap()) / step;
        let right = (spline.evaluate(1.0 + step).unwrap() - spline.evaluate(1.0).unwrap()) / step;
        assert!((left - right).abs() < 1.0e-4);
    }

    #[test]
    fn out_of_domain_is_distinct_from_unfitted() {
        let spline = CubicSpline::new(&[1.0, 2.0, 3.0], &[1.0, 4.0, 9.0]).expect("fit");
        assert!(matches!(
            spline.evaluate(3.5),
            Err(SplineError::OutOfDomain { min, max, .. }) if min == 1.0 && max == 3.0
        ));
        assert_eq!(spline.evaluate_or_zero(0.0), Ok(0.0));

        let empty = CubicSpline::unfitted();
        assert!(!empty.is_fitted());
        assert_eq!(empty.evaluate(1.5), Err(SplineError::NotFitted));
        assert_eq!(empty.evaluate_or_zero(1.5), Err(SplineError::NotFitted));
        assert_eq!(empty.domain(), None);
    }

    #[test]
    fn invalid_knot_sets_are_rejected() {
        assert_eq!(
            CubicSpline::new(&[1.0, 2.0], &[1.0]),
            Err(SplineError::LengthMismatch { x_len: 2, y_len: 1 })
        );
        assert_eq!(
            CubicSpline::new(&[1.0], &[1.0]),
            Err(SplineError::TooFewKnots { actual: 1 })
        );
        assert!(matches!(
            CubicSpline::new(&[1.0, 1.0, 2.0], &[0.0, 1.0, 2.0]),
            Err(SplineError::NonIncreasingKnots { index: 1, .. })
        ));
        assert!(matches!(
            CubicSpline::new(&[1.0, f64::NAN], &[0.0, 1.0]),
            Err(SplineError::NonFiniteKnot { index: 1, .. })
        ));
    }

    #[test]
    fn spline_reads_two_column_file() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("curve.dat");
        fs::write(&path, "0.0 0.0\n1.0 1.0\n2.0 4.0\n3.0 9.0\n").expect("write");

        let spline = CubicSpline::from_file(&path).expect("file should parse");
        assert_eq!(spline.knot_count(), 4);
        assert!((spline.evaluate(2.0).unwrap() - 4.0).abs() < 1.0e-12);

        let missing = CubicSpline::from_file(temp.path().join("missing.dat"));
        assert!(matches!(missing, Err(SplineError::Read { .. })));
    }
}
