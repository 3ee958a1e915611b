//! Reaction and decay topologies.
//!
//! Each topology takes an ordered nucleus list. The order is part of the
//! contract:
//!
//! | topology | nuclei |
//! |---|---|
//! | two/three-particle | detected particles |
//! | focal-plane residual, silicon residual | target, projectile, ejectile |
//! | sequential decay | target, projectile, focal-plane leg, silicon leg |

use super::Reconstructor;
use crate::domain::{
    ComputeResult, INVALID_RESULT, NucId, ReconError, ReconResult, SabreCorrection, SabreHit,
};
use crate::numerics::FourVector;

fn expect_nuclei<const N: usize>(nuclei: &[NucId], topology: &str) -> ComputeResult<[NucId; N]> {
    <[NucId; N]>::try_from(nuclei).map_err(|_| {
        ReconError::input_validation(
            "INPUT.NUCLEI_COUNT",
            format!("{topology} takes {N} nuclei, got {}", nuclei.len()),
        )
    })
}

fn derived_nucleus(id: NucId, role: &str) -> ComputeResult<NucId> {
    if id.is_physical() {
        Ok(id)
    } else {
        Err(ReconError::input_validation(
            "INPUT.UNPHYSICAL_NUCLEUS",
            format!("{role} nucleus {id} violates 0 <= Z <= A, A > 0"),
        ))
    }
}

struct BinaryReaction {
    target_mass: f64,
    projectile: NucId,
    ejectile: NucId,
    residual_mass: f64,
}

/// `daughter` in the rest frame of `parent`, which must be time-like.
fn in_rest_frame(daughter: &FourVector, parent: &FourVector) -> ComputeResult<FourVector> {
    daughter.in_rest_frame_of(parent).ok_or_else(|| {
        ReconError::computation(
            "RUN.SPACELIKE_FRAME",
            format!(
                "parent four-vector (E = {:.4} MeV, m^2 = {:.4} MeV^2) has no rest frame",
                parent.e,
                parent.mag2()
            ),
        )
    })
}

fn sentinel_on_error(topology: &'static str, outcome: ComputeResult<ReconResult>) -> ReconResult {
    outcome.unwrap_or_else(|error| {
        tracing::warn!(
            topology,
            placeholder = error.placeholder(),
            message = error.message(),
            "reconstruction failed"
        );
        ReconResult::invalid()
    })
}

impl Reconstructor {
    /// Invariant mass of two silicon-detected particles minus the mass of
    /// the nucleus they add up to.
    pub fn run_two_particle_excitation(
        &self,
        p1: &SabreHit,
        p2: &SabreHit,
        nuclei: &[NucId],
        correction: SabreCorrection,
    ) -> ReconResult {
        sentinel_on_error(
            "two-particle",
            self.try_two_particle_excitation(p1, p2, nuclei, correction),
        )
    }

    pub fn try_two_particle_excitation(
        &self,
        p1: &SabreHit,
        p2: &SabreHit,
        nuclei: &[NucId],
        correction: SabreCorrection,
    ) -> ComputeResult<ReconResult> {
        let ids = expect_nuclei::<2>(nuclei, "two-particle excitation")?;
        self.invariant_mass_excitation(&[p1, p2], &ids, correction)
    }

    pub fn run_three_particle_excitation(
        &self,
        p1: &SabreHit,
        p2: &SabreHit,
        p3: &SabreHit,
        nuclei: &[NucId],
        correction: SabreCorrection,
    ) -> ReconResult {
        sentinel_on_error(
            "three-particle",
            self.try_three_particle_excitation(p1, p2, p3, nuclei, correction),
        )
    }

    pub fn try_three_particle_excitation(
        &self,
        p1: &SabreHit,
        p2: &SabreHit,
        p3: &SabreHit,
        nuclei: &[NucId],
        correction: SabreCorrection,
    ) -> ComputeResult<ReconResult> {
        let ids = expect_nuclei::<3>(nuclei, "three-particle excitation")?;
        self.invariant_mass_excitation(&[p1, p2, p3], &ids, correction)
    }

    fn invariant_mass_excitation(
        &self,
        hits: &[&SabreHit],
        ids: &[NucId],
        correction: SabreCorrection,
    ) -> ComputeResult<ReconResult> {
        let parent = derived_nucleus(NucId::sum(ids), "parent")?;
        let parent_mass = self.nuclear_mass(parent)?;

        let mut total = FourVector::default();
        let mut recovered_ke = None;
        for (hit, &id) in hits.iter().zip(ids) {
            let leg = self.sabre_leg(hit, id, correction)?;
            recovered_ke.get_or_insert(leg.recovered_ke);
            total = total + leg.vector;
        }

        Ok(ReconResult {
            excitation: total.mass() - parent_mass,
            recovered_ke: recovered_ke.unwrap_or(INVALID_RESULT),
            resid_theta_lab: total.theta(),
            resid_phi_lab: total.phi(),
            ..ReconResult::invalid()
        })
    }

    /// Binary reaction with the ejectile in the focal plane.
    pub fn run_fp_resid_excitation(
        &self,
        xavg: f64,
        beam_ke: f64,
        nuclei: &[NucId],
    ) -> ReconResult {
        sentinel_on_error(
            "focal-plane residual",
            self.try_fp_resid_excitation(xavg, beam_ke, nuclei),
        )
    }

    pub fn try_fp_resid_excitation(
        &self,
        xavg: f64,
        beam_ke: f64,
        nuclei: &[NucId],
    ) -> ComputeResult<ReconResult> {
        let reaction = self.binary_reaction(nuclei, "focal-plane residual excitation")?;
        let (eject, kinetic) = self.focal_plane_leg(xavg, reaction.ejectile)?;
        self.binary_residual(&reaction, beam_ke, eject, kinetic)
    }

    /// Binary reaction with the ejectile in the silicon array.
    pub fn run_sabre_resid_excitation_det_eject(
        &self,
        beam_ke: f64,
        hit: &SabreHit,
        nuclei: &[NucId],
        correction: SabreCorrection,
    ) -> ReconResult {
        sentinel_on_error(
            "silicon residual",
            self.try_sabre_resid_excitation_det_eject(beam_ke, hit, nuclei, correction),
        )
    }

    pub fn try_sabre_resid_excitation_det_eject(
        &self,
        beam_ke: f64,
        hit: &SabreHit,
        nuclei: &[NucId],
        correction: SabreCorrection,
    ) -> ComputeResult<ReconResult> {
        let reaction = self.binary_reaction(nuclei, "silicon residual excitation")?;
        let leg = self.sabre_leg(hit, reaction.ejectile, correction)?;
        self.binary_residual(&reaction, beam_ke, leg.vector, leg.recovered_ke)
    }

    fn binary_reaction(&self, nuclei: &[NucId], topology: &str) -> ComputeResult<BinaryReaction> {
        let [target, projectile, ejectile] = expect_nuclei::<3>(nuclei, topology)?;
        let residual = derived_nucleus(target.plus(projectile).minus(ejectile), "residual")?;
        Ok(BinaryReaction {
            target_mass: self.nuclear_mass(target)?,
            projectile,
            ejectile,
            residual_mass: self.nuclear_mass(residual)?,
        })
    }

    fn binary_residual(
        &self,
        reaction: &BinaryReaction,
        beam_ke: f64,
        eject: FourVector,
        recovered_ke: f64,
    ) -> ComputeResult<ReconResult> {
        let target_vec = FourVector::at_rest(reaction.target_mass);
        let projectile_vec = self.beam_four_vector(beam_ke, reaction.projectile)?;

        let parent = target_vec + projectile_vec;
        let residual_vec = parent - eject;
        let eject_cm = in_rest_frame(&eject, &parent)?;

        Ok(ReconResult {
            excitation: residual_vec.mass() - reaction.residual_mass,
            recovered_ke,
            eject_theta_cm: eject_cm.theta(),
            eject_phi_cm: eject_cm.phi(),
            resid_theta_lab: residual_vec.theta(),
            resid_phi_lab: residual_vec.phi(),
        })
    }

    /// Sequential decay: the ejectile is in the focal plane and the decay
    /// breakup particle in the silicon array. The excitation belongs to the
    /// final fragment; centre-of-mass angles are those of the breakup
    /// particle in the intermediate residual's rest frame.
    pub fn run_sabre_excitation(
        &self,
        xavg: f64,
        beam_ke: f64,
        hit: &SabreHit,
        nuclei: &[NucId],
        correction: SabreCorrection,
    ) -> ReconResult {
        sentinel_on_error(
            "sequential decay",
            self.try_sabre_excitation(xavg, beam_ke, hit, nuclei, correction),
        )
    }

    pub fn try_sabre_excitation(
        &self,
        xavg: f64,
        beam_ke: f64,
        hit: &SabreHit,
        nuclei: &[NucId],
        correction: SabreCorrection,
    ) -> ComputeResult<ReconResult> {
        let [target, projectile, fp_id, sabre_id] =
            expect_nuclei::<4>(nuclei, "sequential decay excitation")?;
        let fragment = self.sequential_fragment(target, projectile, fp_id, sabre_id)?;

        let (eject, _) = self.focal_plane_leg(xavg, fp_id)?;
        let breakup = self.sabre_leg(hit, sabre_id, correction)?;
        self.sequential_decay(
            target,
            projectile,
            beam_ke,
            fragment,
            eject,
            breakup.vector,
            breakup.recovered_ke,
        )
    }

    /// Sequential decay with the legs swapped: the ejectile is in the
    /// silicon array and the breakup particle in the focal plane.
    pub fn run_sabre_excitation_det_eject(
        &self,
        xavg: f64,
        beam_ke: f64,
        hit: &SabreHit,
        nuclei: &[NucId],
        correction: SabreCorrection,
    ) -> ReconResult {
        sentinel_on_error(
            "sequential decay, silicon ejectile",
            self.try_sabre_excitation_det_eject(xavg, beam_ke, hit, nuclei, correction),
        )
    }

    pub fn try_sabre_excitation_det_eject(
        &self,
        xavg: f64,
        beam_ke: f64,
        hit: &SabreHit,
        nuclei: &[NucId],
        correction: SabreCorrection,
    ) -> ComputeResult<ReconResult> {
        let [target, projectile, fp_id, sabre_id] =
            expect_nuclei::<4>(nuclei, "sequential decay excitation")?;
        let fragment = self.sequential_fragment(target, projectile, fp_id, sabre_id)?;

        let (breakup, _) = self.focal_plane_leg(xavg, fp_id)?;
        let eject = self.sabre_leg(hit, sabre_id, correction)?;
        self.sequential_decay(
            target,
            projectile,
            beam_ke,
            fragment,
            eject.vector,
            breakup,
            eject.recovered_ke,
        )
    }

    fn sequential_fragment(
        &self,
        target: NucId,
        projectile: NucId,
        first: NucId,
        second: NucId,
    ) -> ComputeResult<NucId> {
        let fragment = derived_nucleus(
            target.plus(projectile).minus(first).minus(second),
            "decay fragment",
        )?;
        for id in [target, projectile, first, second, fragment] {
            self.nuclear_mass(id)?;
        }
        Ok(fragment)
    }

    #[allow(clippy::too_many_arguments)]
    fn sequential_decay(
        &self,
        target: NucId,
        projectile: NucId,
        beam_ke: f64,
        fragment: NucId,
        eject: FourVector,
        breakup: FourVector,
        recovered_ke: f64,
    ) -> ComputeResult<ReconResult> {
        let target_vec = FourVector::at_rest(self.nuclear_mass(target)?);
        let projectile_vec = self.beam_four_vector(beam_ke, projectile)?;

        let residual_vec = target_vec + projectile_vec - eject;
        let fragment_vec = residual_vec - breakup;
        let breakup_cm = in_rest_frame(&breakup, &residual_vec)?;

        Ok(ReconResult {
            excitation: fragment_vec.mass() - self.nuclear_mass(fragment)?,
            recovered_ke,
            eject_theta_cm: breakup_cm.theta(),
            eject_phi_cm: breakup_cm.phi(),
            resid_theta_lab: residual_vec.theta(),
            resid_phi_lab: residual_vec.phi(),
        })
    }
}
