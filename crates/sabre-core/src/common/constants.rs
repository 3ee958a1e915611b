//! Physical and unit-conversion constants shared by the energy-loss and
//! kinematics code.
//!
//! Energies are in MeV, masses in MeV/c² unless a name says otherwise, areal
//! densities in g/cm², and angles in radians.

pub const PI: f64 = std::f64::consts::PI;
pub const DEG2RAD: f64 = PI / 180.0;
pub const RAD2DEG: f64 = 180.0 / PI;

/// Atomic mass unit in MeV/c² (AME2020).
pub const U_TO_MEV: f64 = 931.494_102_42;
pub const MEV_TO_U: f64 = 1.0 / U_TO_MEV;
pub const ELECTRON_MASS_MEV: f64 = 0.510_998_950_00;

pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
/// Momentum per unit charge, field and radius: MeV/c per (kG · cm).
pub const QBRHO_TO_P: f64 = 1.0e-9 * SPEED_OF_LIGHT;

/// Target thicknesses are configured in µg/cm²; the integrator works in g/cm².
pub const UG_CM2_TO_G_CM2: f64 = 1.0e-6;

/// Bethe formula prefactor K = 4π N_A r_e² m_e c² in MeV cm²/mol.
pub const BETHE_K: f64 = 0.307_075;

/// Tolerance used to recognise grazing (π/2) incidence.
pub const GRAZING_ANGLE_EPSILON: f64 = 1.0e-9;
