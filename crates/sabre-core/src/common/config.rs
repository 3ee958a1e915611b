//! JSON run configuration for a reconstruction session.

use crate::common::masses::{MassTable, MassTableError};
use crate::domain::ReconError;
use crate::energy_loss::target::TargetElement;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    pub thickness_ug_cm2: f64,
    pub elements: Vec<TargetElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocalPlaneConfig {
    pub field_kg: f64,
    pub angle_deg: f64,
    /// Ascending polynomial coefficients mapping xavg to rho (cm).
    pub calibration: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconConfig {
    pub target: TargetConfig,
    #[serde(default)]
    pub dead_layer: Option<TargetConfig>,
    pub focal_plane: FocalPlaneConfig,
    #[serde(default)]
    pub sabre_material: Option<String>,
    #[serde(default)]
    pub degrader_material: Option<String>,
    #[serde(default)]
    pub eloss_tables: Vec<PathBuf>,
    #[serde(default)]
    pub punch_tables: Vec<PathBuf>,
    #[serde(default)]
    pub mass_table: Option<PathBuf>,
}

impl ReconConfig {
    /// Rewrites every relative file path as a path under `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        self.eloss_tables.iter_mut().for_each(resolve);
        self.punch_tables.iter_mut().for_each(resolve);
        if let Some(path) = self.mass_table.as_mut() {
            resolve(path);
        }
    }

    /// Built-in isotopes, extended by `massTable` when one is configured.
    pub fn mass_table(&self) -> Result<MassTable, MassTableError> {
        let mut masses = MassTable::builtin();
        if let Some(path) = &self.mass_table {
            masses.merge(MassTable::read_file(path)?);
        }
        Ok(masses)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<ConfigError> for ReconError {
    fn from(error: ConfigError) -> Self {
        let message = error.to_string();
        match error {
            ConfigError::Read { .. } => ReconError::io_system("IO.CONFIG_READ", message),
            ConfigError::Parse { .. } => {
                ReconError::input_validation("INPUT.CONFIG_PARSE", message)
            }
        }
    }
}

pub fn load_recon_config(path: impl AsRef<Path>) -> Result<ReconConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config =
        serde_json::from_str::<ReconConfig>(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    tracing::debug!(
        path = %path.display(),
        eloss_tables = config.eloss_tables.len(),
        punch_tables = config.punch_tables.len(),
        "loaded reconstruction config"
    );
    Ok(config)
}
