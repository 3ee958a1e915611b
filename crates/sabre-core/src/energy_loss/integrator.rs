//! Stopping-power integration seam.
//!
//! The target model only sets up geometry and normalisation; the physical
//! integral over the traversed layer is delegated to a
//! [`StoppingPowerIntegrator`]. Two implementations ship with the crate: a
//! linear model for deterministic tests and a fixed-step Bethe integrator.

use crate::common::constants::{BETHE_K, ELECTRON_MASS_MEV, U_TO_MEV};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub z: i32,
    pub charge: i32,
    pub mass_u: f64,
    /// Kinetic energy per atomic mass unit, MeV/u.
    pub energy_per_u: f64,
}

impl Projectile {
    pub fn kinetic_energy(&self) -> f64 {
        self.energy_per_u * self.mass_u
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerElement {
    pub z: i32,
    pub mass_u: f64,
    /// Atom fraction; fractions in a layer sum to 1.
    pub fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer<'a> {
    pub elements: &'a [LayerElement],
    /// Path-length scaled areal density, g/cm².
    pub areal_density: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrationError {
    #[error("projectile is invalid: {reason}")]
    InvalidProjectile { reason: String },
    #[error("layer is invalid: {reason}")]
    InvalidLayer { reason: String },
    #[error("energy-loss integration produced a non-finite result")]
    NonFiniteResult,
}

pub trait StoppingPowerIntegrator: Send + Sync {
    /// Energy (MeV) lost by `projectile` crossing `layer`, starting from the
    /// projectile's kinetic energy.
    fn energy_loss(&self, projectile: &Projectile, layer: &Layer<'_>)
    -> Result<f64, IntegrationError>;

    /// Energy (MeV) the projectile must have lost in `layer` to leave it with
    /// its current kinetic energy.
    fn reverse_energy_loss(
        &self,
        projectile: &Projectile,
        layer: &Layer<'_>,
    ) -> Result<f64, IntegrationError>;
}

fn validate(projectile: &Projectile, layer: &Layer<'_>) -> Result<(), IntegrationError> {
    if projectile.z <= 0 || !(projectile.mass_u.is_finite() && projectile.mass_u > 0.0) {
        return Err(IntegrationError::InvalidProjectile {
            reason: format!("Z={} mass={} u", projectile.z, projectile.mass_u),
        });
    }
    if !(projectile.energy_per_u.is_finite() && projectile.energy_per_u >= 0.0) {
        return Err(IntegrationError::InvalidProjectile {
            reason: format!("energy {} MeV/u", projectile.energy_per_u),
        });
    }
    if layer.elements.is_empty() {
        return Err(IntegrationError::InvalidLayer {
            reason: "no elements".to_string(),
        });
    }
    if !(layer.areal_density.is_finite() && layer.areal_density >= 0.0) {
        return Err(IntegrationError::InvalidLayer {
            reason: format!("areal density {} g/cm²", layer.areal_density),
        });
    }
    Ok(())
}

/// Linear loss model: a constant stopping power independent of energy and
/// projectile. Forward loss saturates at the projectile's energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantStoppingIntegrator {
    /// MeV per g/cm².
    pub stopping_power: f64,
}

impl ConstantStoppingIntegrator {
    pub const fn new(stopping_power: f64) -> Self {
        Self { stopping_power }
    }
}

impl StoppingPowerIntegrator for ConstantStoppingIntegrator {
    fn energy_loss(
        &self,
        projectile: &Projectile,
        layer: &Layer<'_>,
    ) -> Result<f64, IntegrationError> {
        validate(projectile, layer)?;
        Ok((self.stopping_power * layer.areal_density).min(projectile.kinetic_energy()))
    }

    fn reverse_energy_loss(
        &self,
        projectile: &Projectile,
        layer: &Layer<'_>,
    ) -> Result<f64, IntegrationError> {
        validate(projectile, layer)?;
        Ok(self.stopping_power * layer.areal_density)
    }
}

/// Fixed-step midpoint integration of the relativistic Bethe formula with an
/// effective projectile charge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetheBlochIntegrator {
    pub steps: usize,
    /// Below this energy (MeV/u) a forward-integrated projectile is stopped.
    pub cutoff_energy_per_u: f64,
}

impl Default for BetheBlochIntegrator {
    fn default() -> Self {
        Self {
            steps: 200,
            cutoff_energy_per_u: 1.0e-3,
        }
    }
}

const MIN_STOPPING_LOG: f64 = 0.05;

impl BetheBlochIntegrator {
    /// Electronic stopping power in MeV cm²/g at the given kinetic energy (MeV).
    pub fn stopping_power(&self, projectile: &Projectile, layer: &Layer<'_>, kinetic: f64) -> f64 {
        let energy_per_u = (kinetic / projectile.mass_u).max(self.cutoff_energy_per_u);
        let gamma = 1.0 + energy_per_u / U_TO_MEV;
        let beta2 = 1.0 - 1.0 / (gamma * gamma);
        let beta = beta2.sqrt();

        let z = f64::from(projectile.z);
        let z_eff = z * (1.0 - (-125.0 * beta * z.powf(-2.0 / 3.0)).exp());

        let mut z_over_a_num = 0.0;
        let mut mass_den = 0.0;
        let mut log_i_num = 0.0;
        let mut electrons = 0.0;
        for element in layer.elements {
            let zt = f64::from(element.z);
            z_over_a_num += element.fraction * zt;
            mass_den += element.fraction * element.mass_u;
            log_i_num += element.fraction * zt * mean_excitation_mev(element.z).ln();
            electrons += element.fraction * zt;
        }
        if mass_den <= 0.0 || electrons <= 0.0 {
            return 0.0;
        }
        let z_over_a = z_over_a_num / mass_den;
        let mean_excitation = (log_i_num / electrons).exp();

        let argument = 2.0 * ELECTRON_MASS_MEV * beta2 * gamma * gamma / mean_excitation;
        let log_term = (argument.ln() - beta2).max(MIN_STOPPING_LOG);
        BETHE_K * z_eff * z_eff * z_over_a / beta2 * log_term
    }
}

impl StoppingPowerIntegrator for BetheBlochIntegrator {
    fn energy_loss(
        &self,
        projectile: &Projectile,
        layer: &Layer<'_>,
    ) -> Result<f64, IntegrationError> {
        validate(projectile, layer)?;
        let initial = projectile.kinetic_energy();
        let cutoff = self.cutoff_energy_per_u * projectile.mass_u;
        if layer.areal_density == 0.0 || initial <= cutoff {
            return Ok(0.0);
        }

        let step = layer.areal_density / self.steps.max(1) as f64;
        let mut energy = initial;
        for _ in 0..self.steps.max(1) {
            let half = energy - 0.5 * step * self.stopping_power(projectile, layer, energy);
            if half <= cutoff {
                return Ok(initial);
            }
            energy -= step * self.stopping_power(projectile, layer, half);
            if energy <= cutoff {
                return Ok(initial);
            }
        }

        let loss = initial - energy;
        if loss.is_finite() {
            Ok(loss)
        } else {
            Err(IntegrationError::NonFiniteResult)
        }
    }

    fn reverse_energy_loss(
        &self,
        projectile: &Projectile,
        layer: &Layer<'_>,
    ) -> Result<f64, IntegrationError> {
        validate(projectile, layer)?;
        let final_energy = projectile.kinetic_energy();
        if layer.areal_density == 0.0 {
            return Ok(0.0);
        }

        let step = layer.areal_density / self.steps.max(1) as f64;
        let mut energy = final_energy;
        for _ in 0..self.steps.max(1) {
            let half = energy + 0.5 * step * self.stopping_power(projectile, layer, energy);
            energy += step * self.stopping_power(projectile, layer, half);
        }

        let loss = energy - final_energy;
        if loss.is_finite() {
            Ok(loss)
        } else {
            Err(IntegrationError::NonFiniteResult)
        }
    }
}

/// Mean excitation energy in MeV (Bloch-type estimate).
fn mean_excitation_mev(z: i32) -> f64 {
    let zf = f64::from(z.max(1));
    let ev = match z {
        1 => 19.2,
        2 => 41.8,
        3..=12 => 12.0 * zf + 7.0,
        _ => 9.76 * zf + 58.8 * zf.powf(-0.19),
    };
    ev * 1.0e-6
}
