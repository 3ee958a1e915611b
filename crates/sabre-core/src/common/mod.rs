pub mod config;
pub mod constants;
pub mod masses;
