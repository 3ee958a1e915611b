//! Detector models: the magnetic focal plane and the silicon array.

pub mod focal_plane;
pub mod sabre;

pub use focal_plane::FocalPlaneDetector;
pub use sabre::{SabreArray, SabreDetector};

use nalgebra::Vector3;

/// Geometry of one position-sensitive silicon module, seen from the target.
pub trait DetectorGeometry {
    /// Unit vector from the target to the centre of pixel `(ring, wedge)`;
    /// `None` for channels the module does not have.
    fn hit_direction(&self, ring: usize, wedge: usize) -> Option<Vector3<f64>>;

    /// Unit normal of the module face.
    fn outward_normal(&self) -> Vector3<f64>;
}
