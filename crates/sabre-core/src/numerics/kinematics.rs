//! Energy-momentum four-vectors over `nalgebra` three-vectors, with the
//! handful of operations reconstruction needs: sums, invariant mass,
//! polar/azimuthal angles and pure Lorentz boosts.

use nalgebra::Vector3;
use std::ops::{Add, Sub};

/// Unit vector from spherical angles.
pub fn unit_from_angles(theta: f64, phi: f64) -> Vector3<f64> {
    Vector3::new(
        theta.sin() * phi.cos(),
        theta.sin() * phi.sin(),
        theta.cos(),
    )
}

/// Polar angle from +z in `[0, π]`; zero for the null vector.
pub fn polar_angle(v: &Vector3<f64>) -> f64 {
    if v.x == 0.0 && v.y == 0.0 && v.z == 0.0 {
        0.0
    } else {
        v.x.hypot(v.y).atan2(v.z)
    }
}

/// Azimuth in `(-π, π]`; zero on the z axis.
pub fn azimuth(v: &Vector3<f64>) -> f64 {
    if v.x == 0.0 && v.y == 0.0 {
        0.0
    } else {
        v.y.atan2(v.x)
    }
}

/// Energy-momentum four-vector `(p, E)` in MeV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FourVector {
    pub p: Vector3<f64>,
    pub e: f64,
}

impl Default for FourVector {
    fn default() -> Self {
        Self::at_rest(0.0)
    }
}

impl FourVector {
    pub fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self {
            p: Vector3::new(px, py, pz),
            e,
        }
    }

    pub fn at_rest(mass: f64) -> Self {
        Self {
            p: Vector3::zeros(),
            e: mass,
        }
    }

    /// On-shell four-vector of a particle with kinetic energy `kinetic` and
    /// rest mass `mass` moving along `direction`.
    pub fn from_kinetic(kinetic: f64, mass: f64, direction: &Vector3<f64>) -> Self {
        let momentum = (kinetic * (kinetic + 2.0 * mass)).sqrt();
        let unit = direction.try_normalize(0.0).unwrap_or_else(Vector3::z);
        Self {
            p: unit * momentum,
            e: kinetic + mass,
        }
    }

    pub fn mag2(&self) -> f64 {
        self.e * self.e - self.p.norm_squared()
    }

    /// Invariant mass; negative when the four-vector is space-like.
    pub fn mass(&self) -> f64 {
        let m2 = self.mag2();
        if m2 < 0.0 { -(-m2).sqrt() } else { m2.sqrt() }
    }

    pub fn kinetic(&self) -> f64 {
        self.e - self.mass()
    }

    pub fn theta(&self) -> f64 {
        polar_angle(&self.p)
    }

    pub fn phi(&self) -> f64 {
        azimuth(&self.p)
    }

    /// Velocity (in units of c) of the frame in which this four-vector is at rest.
    pub fn boost_vector(&self) -> Vector3<f64> {
        self.p / self.e
    }

    /// Applies a pure Lorentz boost with velocity `beta`. `None` unless
    /// `|beta| < 1`.
    pub fn boost(&self, beta: &Vector3<f64>) -> Option<FourVector> {
        let b2 = beta.norm_squared();
        if b2.is_nan() || b2 >= 1.0 {
            return None;
        }
        if b2 == 0.0 {
            return Some(*self);
        }
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let bp = beta.dot(&self.p);
        let gamma2 = (gamma - 1.0) / b2;

        Some(FourVector {
            p: self.p + beta * (gamma2 * bp + gamma * self.e),
            e: gamma * (self.e + bp),
        })
    }

    /// This four-vector seen from the rest frame of `parent`. `None` when
    /// `parent` is not time-like, since no such frame exists.
    pub fn in_rest_frame_of(&self, parent: &FourVector) -> Option<FourVector> {
        if parent.mag2() <= 0.0 || parent.e <= 0.0 {
            return None;
        }
        self.boost(&-parent.boost_vector())
    }
}

impl Add for FourVector {
    type Output = FourVector;

    fn add(self, rhs: FourVector) -> FourVector {
        FourVector {
            p: self.p + rhs.p,
            e: self.e + rhs.e,
        }
    }
}

impl Sub for FourVector {
    type Output = FourVector;

    fn sub(self, rhs: FourVector) -> FourVector {
        FourVector {
            p: self.p - rhs.p,
            e: self.e - rhs.e,
        }
    }
}
