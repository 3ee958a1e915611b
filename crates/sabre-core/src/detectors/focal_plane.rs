use crate::common::config::FocalPlaneConfig;
use crate::common::constants::{DEG2RAD, QBRHO_TO_P};
use crate::numerics::evaluate_polynomial;

/// Magnetic spectrograph focal plane: a calibrated position maps to a radius
/// of curvature and so to a momentum, at a fixed spectrograph angle.
#[derive(Debug, Clone, PartialEq)]
pub struct FocalPlaneDetector {
    pub field_kg: f64,
    pub angle_deg: f64,
    /// Ascending polynomial coefficients, xavg to rho in cm.
    pub calibration: Vec<f64>,
}

impl FocalPlaneDetector {
    pub fn new(field_kg: f64, angle_deg: f64, calibration: Vec<f64>) -> Self {
        Self {
            field_kg,
            angle_deg,
            calibration,
        }
    }

    /// Radius of curvature in cm.
    pub fn rho(&self, xavg: f64) -> f64 {
        evaluate_polynomial(&self.calibration, xavg)
    }

    /// Momentum in MeV/c of a fully stripped ion of charge `z`.
    pub fn momentum(&self, xavg: f64, z: i32) -> f64 {
        f64::from(z) * self.rho(xavg) * self.field_kg * QBRHO_TO_P
    }

    pub fn angle_rad(&self) -> f64 {
        self.angle_deg * DEG2RAD
    }
}

impl From<&FocalPlaneConfig> for FocalPlaneDetector {
    fn from(config: &FocalPlaneConfig) -> Self {
        Self::new(config.field_kg, config.angle_deg, config.calibration.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::FocalPlaneDetector;

    #[test]
    fn momentum_follows_brho() {
        let detector = FocalPlaneDetector::new(8.0, 15.0, vec![75.0, 0.02]);
        assert!((detector.rho(100.0) - 77.0).abs() < 1.0e-12);
        // p = Z rho B 0.2998: 2 * 77 * 8 * 0.29979 = 369.35 MeV/c
        let p = detector.momentum(100.0, 2);
        assert!((p - 2.0 * 77.0 * 8.0 * 0.299_792_458).abs() < 1.0e-9);
        assert!((detector.angle_rad() - 15.0_f64.to_radians()).abs() < 1.0e-12);
    }

    #[test]
    fn empty_calibration_gives_zero_rho() {
        let detector = FocalPlaneDetector::new(8.0, 0.0, Vec::new());
        assert_eq!(detector.rho(12.0), 0.0);
        assert_eq!(detector.momentum(12.0, 1), 0.0);
    }
}
