pub mod integrator;
pub mod tables;
pub mod target;

pub use integrator::{
    BetheBlochIntegrator, ConstantStoppingIntegrator, IntegrationError, Layer, LayerElement,
    Projectile, StoppingPowerIntegrator,
};
pub use tables::{ElossTable, PunchTable, TableError, TableKey};
pub use target::{Target, TargetElement};
