//! Material/target energy-loss model.
//!
//! A [`Target`] owns a normalized elemental composition and an areal density
//! and turns `(projectile, energy, incidence angle, depth fraction)` into a
//! single call on the injected [`StoppingPowerIntegrator`]. Angles are
//! measured from the surface normal.

use crate::common::constants::UG_CM2_TO_G_CM2;
use crate::common::masses::MassLookup;
use crate::domain::{ComputeResult, NucId, ReconError};
use crate::energy_loss::integrator::{Layer, LayerElement, Projectile, StoppingPowerIntegrator};
use crate::numerics::{fold_incidence_angle, is_grazing};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetElement {
    pub z: i32,
    pub a: i32,
    /// Relative number of atoms; normalized on configuration.
    pub stoich: f64,
}

impl TargetElement {
    pub const fn new(z: i32, a: i32, stoich: f64) -> Self {
        Self { z, a, stoich }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Composition {
    elements: Vec<TargetElement>,
    layer: Vec<LayerElement>,
    thickness_ug_cm2: f64,
    areal_density: f64,
}

#[derive(Clone)]
pub struct Target {
    masses: Arc<dyn MassLookup>,
    integrator: Arc<dyn StoppingPowerIntegrator>,
    composition: Option<Composition>,
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("composition", &self.composition)
            .finish_non_exhaustive()
    }
}

impl Target {
    /// An unconfigured target. Loss queries fail until
    /// [`Target::set_composition`] succeeds.
    pub fn new(masses: Arc<dyn MassLookup>, integrator: Arc<dyn StoppingPowerIntegrator>) -> Self {
        Self {
            masses,
            integrator,
            composition: None,
        }
    }

    pub fn with_composition(
        masses: Arc<dyn MassLookup>,
        integrator: Arc<dyn StoppingPowerIntegrator>,
        elements: &[TargetElement],
        thickness_ug_cm2: f64,
    ) -> ComputeResult<Self> {
        let mut target = Self::new(masses, integrator);
        target.set_composition(elements, thickness_ug_cm2)?;
        Ok(target)
    }

    pub fn set_composition(
        &mut self,
        elements: &[TargetElement],
        thickness_ug_cm2: f64,
    ) -> ComputeResult<()> {
        if elements.is_empty() {
            return Err(ReconError::input_validation(
                "INPUT.TARGET_COMPOSITION",
                "target composition has no elements",
            ));
        }
        if !(thickness_ug_cm2.is_finite() && thickness_ug_cm2 >= 0.0) {
            return Err(ReconError::input_validation(
                "INPUT.TARGET_THICKNESS",
                format!("target thickness must be finite and non-negative, got {thickness_ug_cm2}"),
            ));
        }

        let total: f64 = elements.iter().map(|element| element.stoich).sum();
        if elements
            .iter()
            .any(|element| !(element.stoich.is_finite() && element.stoich >= 0.0))
            || total <= 0.0
        {
            return Err(ReconError::input_validation(
                "INPUT.TARGET_COMPOSITION",
                "target stoichiometry must be non-negative with a positive sum",
            ));
        }

        let mut layer = Vec::with_capacity(elements.len());
        for element in elements {
            let id = NucId::new(element.z, element.a);
            let mass_u = self
                .masses
                .atomic_mass_u(id)
                .filter(|_| id.is_physical())
                .ok_or_else(|| {
                    ReconError::input_validation(
                        "INPUT.UNKNOWN_ISOTOPE",
                        format!("target element {id} is not in the mass table"),
                    )
                })?;
            layer.push(LayerElement {
                z: element.z,
                mass_u,
                fraction: element.stoich / total,
            });
        }

        let areal_density = thickness_ug_cm2 * UG_CM2_TO_G_CM2;
        tracing::debug!(
            elements = elements.len(),
            thickness_ug_cm2,
            areal_density,
            "configured target composition"
        );
        self.composition = Some(Composition {
            elements: elements.to_vec(),
            layer,
            thickness_ug_cm2,
            areal_density,
        });
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.composition.is_some()
    }

    pub fn elements(&self) -> &[TargetElement] {
        self.composition
            .as_ref()
            .map_or(&[], |composition| composition.elements.as_slice())
    }

    pub fn thickness_ug_cm2(&self) -> Option<f64> {
        self.composition
            .as_ref()
            .map(|composition| composition.thickness_ug_cm2)
    }

    /// Energy lost by a projectile entering with `start_energy` and crossing
    /// `depth_fraction` of the target at incidence `theta`.
    pub fn energy_loss(
        &self,
        projectile: NucId,
        start_energy: f64,
        theta: f64,
        depth_fraction: f64,
    ) -> ComputeResult<f64> {
        let Some((projectile, layer_elements, path)) =
            self.prepare(projectile, start_energy, theta, depth_fraction)?
        else {
            return Ok(0.0);
        };
        let layer = Layer {
            elements: layer_elements,
            areal_density: path,
        };
        self.integrator
            .energy_loss(&projectile, &layer)
            .map_err(|error| ReconError::computation("RUN.ELOSS_INTEGRATION", error.to_string()))
    }

    /// Energy the projectile must have lost to be observed with
    /// `final_energy` after crossing `depth_fraction` of the target.
    pub fn reverse_energy_loss(
        &self,
        projectile: NucId,
        final_energy: f64,
        theta: f64,
        depth_fraction: f64,
    ) -> ComputeResult<f64> {
        let Some((projectile, layer_elements, path)) =
            self.prepare(projectile, final_energy, theta, depth_fraction)?
        else {
            return Ok(0.0);
        };
        let layer = Layer {
            elements: layer_elements,
            areal_density: path,
        };
        self.integrator
            .reverse_energy_loss(&projectile, &layer)
            .map_err(|error| ReconError::computation("RUN.ELOSS_INTEGRATION", error.to_string()))
    }

    pub fn energy_loss_total(
        &self,
        projectile: NucId,
        start_energy: f64,
        theta: f64,
    ) -> ComputeResult<f64> {
        self.energy_loss(projectile, start_energy, theta, 1.0)
    }

    pub fn reverse_energy_loss_total(
        &self,
        projectile: NucId,
        final_energy: f64,
        theta: f64,
    ) -> ComputeResult<f64> {
        self.reverse_energy_loss(projectile, final_energy, theta, 1.0)
    }

    /// `start_energy` minus the forward loss.
    pub fn energy_after(
        &self,
        projectile: NucId,
        start_energy: f64,
        theta: f64,
        depth_fraction: f64,
    ) -> ComputeResult<f64> {
        let loss = self.energy_loss(projectile, start_energy, theta, depth_fraction)?;
        Ok(start_energy - loss)
    }

    /// `final_energy` plus the reverse loss.
    pub fn energy_before(
        &self,
        projectile: NucId,
        final_energy: f64,
        theta: f64,
        depth_fraction: f64,
    ) -> ComputeResult<f64> {
        let loss = self.reverse_energy_loss(projectile, final_energy, theta, depth_fraction)?;
        Ok(final_energy + loss)
    }

    /// Validates a query and returns the integrator inputs, or `None` when the
    /// path length is zero (grazing incidence or zero depth).
    fn prepare(
        &self,
        projectile: NucId,
        energy: f64,
        theta: f64,
        depth_fraction: f64,
    ) -> ComputeResult<Option<(Projectile, &[LayerElement], f64)>> {
        let composition = self.composition.as_ref().ok_or_else(|| {
            ReconError::computation(
                "RUN.TARGET_UNCONFIGURED",
                "target composition was queried before it was configured",
            )
        })?;
        if !(0.0..=1.0).contains(&depth_fraction) {
            return Err(ReconError::input_validation(
                "INPUT.DEPTH_FRACTION",
                format!("depth fraction must lie in [0, 1], got {depth_fraction}"),
            ));
        }
        if !(energy.is_finite() && energy >= 0.0) {
            return Err(ReconError::input_validation(
                "INPUT.ENERGY",
                format!("energy must be finite and non-negative, got {energy}"),
            ));
        }
        if !theta.is_finite() {
            return Err(ReconError::input_validation(
                "INPUT.ANGLE",
                format!("incidence angle must be finite, got {theta}"),
            ));
        }
        // Unknown projectiles fail even when no material is crossed.
        let mass_u = self
            .masses
            .atomic_mass_u(projectile)
            .filter(|_| projectile.is_physical() && projectile.z > 0)
            .ok_or_else(|| {
                ReconError::input_validation(
                    "INPUT.UNKNOWN_ISOTOPE",
                    format!("projectile {projectile} is not a charged isotope in the mass table"),
                )
            })?;
        if is_grazing(theta) || depth_fraction == 0.0 || energy == 0.0 {
            return Ok(None);
        }

        let path =
            composition.areal_density * depth_fraction / fold_incidence_angle(theta).cos().abs();
        let projectile = Projectile {
            z: projectile.z,
            charge: projectile.z,
            mass_u,
            energy_per_u: energy / mass_u,
        };
        Ok(Some((projectile, composition.layer.as_slice(), path)))
    }
}
