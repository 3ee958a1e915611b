//! Annular ring/wedge silicon modules and the five-module array built from
//! them.
//!
//! Each module is a sector of a flat annulus centred on the beam axis. In
//! its local frame the sector lies in the xy plane, bisected by +x. The
//! module is tilted about y, shifted along the beam axis and finally rotated
//! to its azimuth. Both rotations are `nalgebra::Rotation3`.

use super::DetectorGeometry;
use crate::common::constants::DEG2RAD;
use crate::domain::SabreHit;
use nalgebra::{Rotation3, Vector3};

pub const RING_COUNT: usize = 16;
pub const WEDGE_COUNT: usize = 8;

const INNER_RADIUS_M: f64 = 0.0326;
const OUTER_RADIUS_M: f64 = 0.1351;
const SECTOR_SPAN_DEG: f64 = 54.4;

const STANDARD_PHI_DEG: [f64; 5] = [306.0, 18.0, 234.0, 162.0, 90.0];
const STANDARD_TILT_DEG: f64 = 40.0;
const STANDARD_Z_OFFSET_M: f64 = -0.1245;
const FLIPPED_MODULE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SabreDetector {
    pub phi_deg: f64,
    pub tilt_deg: f64,
    pub z_offset_m: f64,
    /// Module is mounted with ring 0 at the outer edge.
    pub flip_rings: bool,
}

impl SabreDetector {
    pub const fn new(phi_deg: f64, tilt_deg: f64, z_offset_m: f64, flip_rings: bool) -> Self {
        Self {
            phi_deg,
            tilt_deg,
            z_offset_m,
            flip_rings,
        }
    }

    fn tilt(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector3::y_axis(), -self.tilt_deg * DEG2RAD)
    }

    fn azimuth_rotation(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector3::z_axis(), self.phi_deg * DEG2RAD)
    }

    fn place(&self, local: Vector3<f64>) -> Vector3<f64> {
        let offset = Vector3::new(0.0, 0.0, self.z_offset_m);
        self.azimuth_rotation() * (self.tilt() * local + offset)
    }

    /// Laboratory position (m) of the centre of pixel `(ring, wedge)`.
    pub fn hit_position(&self, ring: usize, wedge: usize) -> Option<Vector3<f64>> {
        if ring >= RING_COUNT || wedge >= WEDGE_COUNT {
            return None;
        }
        let ring = if self.flip_rings {
            RING_COUNT - 1 - ring
        } else {
            ring
        };

        let ring_pitch = (OUTER_RADIUS_M - INNER_RADIUS_M) / RING_COUNT as f64;
        let wedge_pitch = SECTOR_SPAN_DEG * DEG2RAD / WEDGE_COUNT as f64;
        let radius = INNER_RADIUS_M + (ring as f64 + 0.5) * ring_pitch;
        let phi = -0.5 * SECTOR_SPAN_DEG * DEG2RAD + (wedge as f64 + 0.5) * wedge_pitch;

        Some(self.place(Vector3::new(radius * phi.cos(), radius * phi.sin(), 0.0)))
    }
}

impl DetectorGeometry for SabreDetector {
    fn hit_direction(&self, ring: usize, wedge: usize) -> Option<Vector3<f64>> {
        self.hit_position(ring, wedge)?.try_normalize(0.0)
    }

    fn outward_normal(&self) -> Vector3<f64> {
        // Local -z faces away from the target once the module sits upstream.
        self.azimuth_rotation() * (self.tilt() * -Vector3::z())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SabreArray {
    detectors: Vec<SabreDetector>,
}

impl SabreArray {
    pub fn new(detectors: Vec<SabreDetector>) -> Self {
        Self { detectors }
    }

    /// The five-module backward array.
    pub fn standard() -> Self {
        let detectors = STANDARD_PHI_DEG
            .iter()
            .enumerate()
            .map(|(index, &phi)| {
                SabreDetector::new(
                    phi,
                    STANDARD_TILT_DEG,
                    STANDARD_Z_OFFSET_M,
                    index == FLIPPED_MODULE,
                )
            })
            .collect();
        Self { detectors }
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn detector(&self, index: usize) -> Option<&SabreDetector> {
        self.detectors.get(index)
    }

    pub fn hit_direction(&self, hit: &SabreHit) -> Option<Vector3<f64>> {
        self.detectors
            .get(hit.detector_id)?
            .hit_direction(hit.local_ring, hit.local_wedge)
    }

    pub fn detector_normal(&self, index: usize) -> Option<Vector3<f64>> {
        self.detectors.get(index).map(DetectorGeometry::outward_normal)
    }
}

#[cfg(test)]
mod tests {
    use super::{RING_COUNT, SabreArray, SabreDetector, WEDGE_COUNT};
    use crate::detectors::DetectorGeometry;
    use crate::domain::SabreHit;
    use crate::numerics::azimuth;

    #[test]
    fn standard_array_sits_upstream_of_target() {
        let array = SabreArray::standard();
        assert_eq!(array.len(), 5);
        for index in 0..array.len() {
            let detector = array.detector(index).expect("detector exists");
            for ring in 0..RING_COUNT {
                for wedge in 0..WEDGE_COUNT {
                    let direction = detector.hit_direction(ring, wedge).expect("valid pixel");
                    assert!((direction.norm() - 1.0).abs() < 1.0e-12);
                    assert!(direction.z < 0.0);
                }
            }
            let normal = array.detector_normal(index).expect("normal");
            assert!((normal.norm() - 1.0).abs() < 1.0e-12);
            assert!(normal.z < 0.0);
        }
        assert!(array.detector_normal(5).is_none());
    }

    #[test]
    fn out_of_range_channels_have_no_direction() {
        let detector = SabreDetector::new(0.0, 40.0, -0.1245, false);
        assert!(detector.hit_direction(RING_COUNT, 0).is_none());
        assert!(detector.hit_direction(0, WEDGE_COUNT).is_none());
    }

    #[test]
    fn flipped_module_reverses_ring_order() {
        let plain = SabreDetector::new(90.0, 40.0, -0.1245, false);
        let flipped = SabreDetector::new(90.0, 40.0, -0.1245, true);
        for ring in 0..RING_COUNT {
            let a = flipped.hit_direction(ring, 3).unwrap();
            let b = plain.hit_direction(RING_COUNT - 1 - ring, 3).unwrap();
            assert!((a - b).norm() < 1.0e-12);
        }
    }

    #[test]
    fn array_lookup_uses_hit_indices() {
        let array = SabreArray::standard();
        let hit = SabreHit {
            detector_id: 2,
            local_ring: 5,
            local_wedge: 1,
            ..SabreHit::default()
        };
        let direct = array.detector(2).unwrap().hit_direction(5, 1).unwrap();
        assert_eq!(array.hit_direction(&hit), Some(direct));

        let missing = SabreHit {
            detector_id: 9,
            ..hit
        };
        assert!(array.hit_direction(&missing).is_none());
    }

    #[test]
    fn modules_are_centred_on_their_azimuth() {
        let array = SabreArray::standard();
        let detector = array.detector(4).unwrap();
        // Wedges 3 and 4 straddle the sector bisector.
        let left = detector.hit_position(8, 3).unwrap();
        let right = detector.hit_position(8, 4).unwrap();
        let middle = (left + right) * 0.5;
        assert!((azimuth(&middle).to_degrees() - 90.0).abs() < 1.0e-9);
    }

    #[test]
    fn untilted_module_is_rotated_then_shifted() {
        let detector = SabreDetector::new(90.0, 0.0, -0.1, false);
        let position = detector.hit_position(0, 3).unwrap();
        // The sector bisector (+x locally) ends up along +y.
        assert!(position.x.abs() < position.y);
        assert!((position.z + 0.1).abs() < 1.0e-12);
        let normal = detector.outward_normal();
        assert!((normal.z + 1.0).abs() < 1.0e-12);
    }
}
