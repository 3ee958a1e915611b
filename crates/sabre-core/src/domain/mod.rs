pub mod errors;

pub use errors::{ComputeResult, ReconError, ReconErrorCategory};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Value every `ReconResult` field holds until it has been computed.
pub const INVALID_RESULT: f64 = -100.0;

/// Nuclide identifier by atomic and mass number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NucId {
    pub z: i32,
    pub a: i32,
}

impl NucId {
    pub const fn new(z: i32, a: i32) -> Self {
        Self { z, a }
    }

    /// A nuclide is physical when it has at least one nucleon and no more
    /// protons than nucleons.
    pub const fn is_physical(self) -> bool {
        self.a > 0 && self.z >= 0 && self.z <= self.a
    }

    pub fn sum(ids: &[NucId]) -> NucId {
        ids.iter().fold(NucId::default(), |acc, id| NucId {
            z: acc.z + id.z,
            a: acc.a + id.a,
        })
    }

    pub const fn minus(self, other: NucId) -> NucId {
        NucId {
            z: self.z - other.z,
            a: self.a - other.a,
        }
    }

    pub const fn plus(self, other: NucId) -> NucId {
        NucId {
            z: self.z + other.z,
            a: self.a + other.a,
        }
    }
}

impl Display for NucId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "(Z={}, A={})", self.z, self.a)
    }
}

/// One correlated ring/wedge hit in the silicon array.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SabreHit {
    pub ring_channel: i32,
    pub wedge_channel: i32,
    pub detector_id: usize,
    pub local_ring: usize,
    pub local_wedge: usize,
    pub ring_energy: f64,
    pub wedge_energy: f64,
    pub ring_time: f64,
    pub wedge_time: f64,
}

/// Which correction chain applies to the silicon leg of a reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SabreCorrection {
    /// Dead layer then target.
    #[default]
    Direct,
    /// Dead layer, punch-through table, then target.
    PunchThrough,
    /// Dead layer, punch-through table, degrader energy-loss table, then target.
    Degraded,
}

impl SabreCorrection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::PunchThrough => "punch-through",
            Self::Degraded => "degraded",
        }
    }
}

impl Display for SabreCorrection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconResult {
    pub excitation: f64,
    /// Kinetic energy of the first measured leg before the target correction.
    pub recovered_ke: f64,
    pub eject_theta_cm: f64,
    pub eject_phi_cm: f64,
    pub resid_theta_lab: f64,
    pub resid_phi_lab: f64,
}

impl ReconResult {
    pub const fn invalid() -> Self {
        Self {
            excitation: INVALID_RESULT,
            recovered_ke: INVALID_RESULT,
            eject_theta_cm: INVALID_RESULT,
            eject_phi_cm: INVALID_RESULT,
            resid_theta_lab: INVALID_RESULT,
            resid_phi_lab: INVALID_RESULT,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.excitation != INVALID_RESULT
    }
}

impl Default for ReconResult {
    fn default() -> Self {
        Self::invalid()
    }
}
