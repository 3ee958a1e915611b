pub mod common;
pub mod detectors;
pub mod domain;
pub mod energy_loss;
pub mod numerics;
pub mod reconstruction;
