pub mod kinematics;
pub mod spline;

pub use kinematics::{FourVector, azimuth, polar_angle, unit_from_angles};
pub use spline::{CubicSpline, SplineError, SplineSegment};

use crate::common::constants::{GRAZING_ANGLE_EPSILON, PI};

/// `c0 + c1 x + c2 x² + ...` by Horner's rule.
pub fn evaluate_polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, &coefficient| acc * x + coefficient)
}

/// Folds an incidence angle measured from a surface normal into `[0, π/2]`.
pub fn fold_incidence_angle(theta: f64) -> f64 {
    let theta = theta.abs() % (2.0 * PI);
    let theta = if theta > PI { 2.0 * PI - theta } else { theta };
    if theta > PI / 2.0 { PI - theta } else { theta }
}

pub fn is_grazing(theta: f64) -> bool {
    (fold_incidence_angle(theta) - PI / 2.0).abs() <= GRAZING_ANGLE_EPSILON
}
