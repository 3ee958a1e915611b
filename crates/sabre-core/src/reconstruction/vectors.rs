//! Corrected four-vectors for the three kinds of measured leg: a silicon
//! hit, a focal-plane position and the beam.

use super::Reconstructor;
use crate::domain::{ComputeResult, NucId, ReconError, SabreCorrection, SabreHit};
use crate::numerics::{FourVector, fold_incidence_angle, polar_angle, unit_from_angles};
use nalgebra::Vector3;

/// Reaction vertex sits at mid-target.
const VERTEX_DEPTH: f64 = 0.5;

/// A silicon leg after reconstruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct SabreLeg {
    pub(super) vector: FourVector,
    /// Kinetic energy after the detector-side corrections, before the target.
    pub(super) recovered_ke: f64,
}

fn check_finite(value: f64, what: &str) -> ComputeResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ReconError::input_validation(
            "INPUT.NON_FINITE",
            format!("{what} must be finite, got {value}"),
        ))
    }
}

impl Reconstructor {
    /// Four-vector at the reaction vertex of a particle of type `id` that
    /// produced `hit`, using the correction chain `correction`.
    pub fn sabre_four_vector(
        &self,
        hit: &SabreHit,
        id: NucId,
        correction: SabreCorrection,
    ) -> ComputeResult<FourVector> {
        Ok(self.sabre_leg(hit, id, correction)?.vector)
    }

    /// Kinetic energy entering the silicon module, before the target correction.
    pub fn recover_sabre_energy(
        &self,
        hit: &SabreHit,
        id: NucId,
        correction: SabreCorrection,
    ) -> ComputeResult<f64> {
        let direction = self.require_hit_direction(hit)?;
        self.detector_side_energy(hit, id, correction, direction)
    }

    pub(super) fn sabre_leg(
        &self,
        hit: &SabreHit,
        id: NucId,
        correction: SabreCorrection,
    ) -> ComputeResult<SabreLeg> {
        let mass = self.nuclear_mass(id)?;
        let direction = self.require_hit_direction(hit)?;
        let recovered_ke = self.detector_side_energy(hit, id, correction, direction)?;
        let vertex_ke = self
            .target
            .energy_before(id, recovered_ke, polar_angle(&direction), VERTEX_DEPTH)?;

        let vector = FourVector::from_kinetic(vertex_ke, mass, &direction);
        tracing::trace!(
            detector = hit.detector_id,
            ring = hit.local_ring,
            wedge = hit.local_wedge,
            %correction,
            deposited = hit.ring_energy,
            recovered_ke,
            vertex_ke,
            "built silicon four-vector"
        );
        Ok(SabreLeg {
            vector,
            recovered_ke,
        })
    }

    fn require_hit_direction(&self, hit: &SabreHit) -> ComputeResult<Vector3<f64>> {
        self.hit_direction(hit).ok_or_else(|| {
            ReconError::input_validation(
                "INPUT.HIT_CHANNEL",
                format!(
                    "no pixel for detector {} ring {} wedge {}",
                    hit.detector_id, hit.local_ring, hit.local_wedge
                ),
            )
        })
    }

    /// Dead layer, then the table corrections selected by `correction`.
    fn detector_side_energy(
        &self,
        hit: &SabreHit,
        id: NucId,
        correction: SabreCorrection,
        direction: Vector3<f64>,
    ) -> ComputeResult<f64> {
        check_finite(hit.ring_energy, "ring energy")?;
        let normal = self.detector_normal(hit.detector_id).ok_or_else(|| {
            ReconError::input_validation(
                "INPUT.HIT_CHANNEL",
                format!("no detector with index {}", hit.detector_id),
            )
        })?;
        let incidence = fold_incidence_angle(direction.angle(&normal));

        let mut energy = hit.ring_energy;
        if let Some(dead_layer) = &self.dead_layer {
            energy = dead_layer.energy_before(id, energy, incidence, 1.0)?;
        }

        match correction {
            SabreCorrection::Direct => Ok(energy),
            SabreCorrection::PunchThrough => Ok(self
                .punch_table(id)?
                .initial_kinetic_energy(incidence, energy)?),
            SabreCorrection::Degraded => {
                // Stopped particles come back from the punch table unchanged.
                let entering_silicon = self
                    .punch_table(id)?
                    .initial_kinetic_energy(incidence, energy)?;
                let degrader_loss = self
                    .eloss_table(id)?
                    .energy_loss(incidence, entering_silicon)?;
                Ok(entering_silicon + degrader_loss)
            }
        }
    }

    /// Four-vector at the reaction vertex of an ejectile `id` measured at
    /// focal-plane position `xavg`.
    pub fn focal_plane_four_vector(&self, xavg: f64, id: NucId) -> ComputeResult<FourVector> {
        Ok(self.focal_plane_leg(xavg, id)?.0)
    }

    /// Returns the vertex four-vector and the kinetic energy inferred from
    /// the magnetic rigidity alone.
    pub(super) fn focal_plane_leg(
        &self,
        xavg: f64,
        id: NucId,
    ) -> ComputeResult<(FourVector, f64)> {
        check_finite(xavg, "focal-plane position")?;
        let mass = self.nuclear_mass(id)?;
        let momentum = self.focal_plane.momentum(xavg, id.z);
        let theta = self.focal_plane.angle_rad();

        let kinetic = momentum.hypot(mass) - mass;
        let vertex_ke = self.target.energy_before(id, kinetic, theta, VERTEX_DEPTH)?;
        tracing::trace!(xavg, momentum, kinetic, vertex_ke, "built focal-plane four-vector");
        Ok((
            FourVector::from_kinetic(vertex_ke, mass, &unit_from_angles(theta, 0.0)),
            kinetic,
        ))
    }

    /// Beam four-vector at the reaction vertex, along +z. The beam energy is
    /// corrected with the reverse loss through half the target at normal
    /// incidence.
    pub fn beam_four_vector(&self, beam_ke: f64, id: NucId) -> ComputeResult<FourVector> {
        check_finite(beam_ke, "beam energy")?;
        let mass = self.nuclear_mass(id)?;
        let vertex_ke = self.target.energy_before(id, beam_ke, 0.0, VERTEX_DEPTH)?;
        Ok(FourVector::from_kinetic(vertex_ke, mass, &Vector3::z()))
    }
}
