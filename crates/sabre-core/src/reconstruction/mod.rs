//! Event reconstruction: corrected four-vectors per detected particle and
//! the reaction topologies that combine them.
//!
//! A [`Reconstructor`] is configured once and then only read, so it can be
//! shared across worker threads. Topology entry points never fail: domain
//! problems are logged and reported through [`ReconResult::invalid`]. The
//! `try_*` variants return the underlying [`ReconError`] instead.

mod topology;
mod vectors;

use crate::common::config::ReconConfig;
use crate::common::masses::MassLookup;
use crate::detectors::{FocalPlaneDetector, SabreArray};
use crate::domain::{ComputeResult, NucId, ReconError, SabreHit};
use crate::energy_loss::integrator::StoppingPowerIntegrator;
use crate::energy_loss::tables::{ElossTable, PunchTable, TableKey};
use crate::energy_loss::target::Target;
use nalgebra::Vector3;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_SABRE_MATERIAL: &str = "28Si";
pub const DEFAULT_DEGRADER_MATERIAL: &str = "27Al";

pub struct Reconstructor {
    masses: Arc<dyn MassLookup>,
    target: Target,
    dead_layer: Option<Target>,
    focal_plane: FocalPlaneDetector,
    array: SabreArray,
    sabre_material: String,
    degrader_material: String,
    eloss_tables: HashMap<TableKey, ElossTable>,
    punch_tables: HashMap<TableKey, PunchTable>,
}

impl fmt::Debug for Reconstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconstructor")
            .field("target", &self.target)
            .field("dead_layer", &self.dead_layer)
            .field("focal_plane", &self.focal_plane)
            .field("sabre_material", &self.sabre_material)
            .field("degrader_material", &self.degrader_material)
            .field("eloss_tables", &self.eloss_tables.keys().collect::<Vec<_>>())
            .field("punch_tables", &self.punch_tables.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn require_configured(target: &Target, what: &str) -> ComputeResult<()> {
    if target.is_configured() {
        Ok(())
    } else {
        Err(ReconError::input_validation(
            "INPUT.TARGET_UNCONFIGURED",
            format!("{what} has no composition"),
        ))
    }
}

impl Reconstructor {
    pub fn new(
        masses: Arc<dyn MassLookup>,
        target: Target,
        focal_plane: FocalPlaneDetector,
        array: SabreArray,
    ) -> ComputeResult<Self> {
        require_configured(&target, "reaction target")?;
        Ok(Self {
            masses,
            target,
            dead_layer: None,
            focal_plane,
            array,
            sabre_material: DEFAULT_SABRE_MATERIAL.to_string(),
            degrader_material: DEFAULT_DEGRADER_MATERIAL.to_string(),
            eloss_tables: HashMap::new(),
            punch_tables: HashMap::new(),
        })
    }

    /// Builds the engine described by a run configuration: target, optional
    /// dead layer, focal plane, the standard silicon array and every listed
    /// table.
    pub fn from_config(
        config: &ReconConfig,
        masses: Arc<dyn MassLookup>,
        integrator: Arc<dyn StoppingPowerIntegrator>,
    ) -> ComputeResult<Self> {
        let target = Target::with_composition(
            masses.clone(),
            integrator.clone(),
            &config.target.elements,
            config.target.thickness_ug_cm2,
        )?;
        let mut reconstructor = Self::new(
            masses.clone(),
            target,
            FocalPlaneDetector::from(&config.focal_plane),
            SabreArray::standard(),
        )?;

        if let Some(layer) = &config.dead_layer {
            let dead_layer = Target::with_composition(
                masses,
                integrator,
                &layer.elements,
                layer.thickness_ug_cm2,
            )?;
            reconstructor = reconstructor.with_dead_layer(dead_layer)?;
        }
        reconstructor = reconstructor.with_materials(
            config
                .sabre_material
                .as_deref()
                .unwrap_or(DEFAULT_SABRE_MATERIAL),
            config
                .degrader_material
                .as_deref()
                .unwrap_or(DEFAULT_DEGRADER_MATERIAL),
        );

        for path in &config.eloss_tables {
            reconstructor.add_energy_loss_table(path)?;
        }
        for path in &config.punch_tables {
            reconstructor.add_punch_thru_table(path)?;
        }
        Ok(reconstructor)
    }

    /// Adds the detector dead layer crossed by every silicon hit before it
    /// deposits energy.
    pub fn with_dead_layer(mut self, dead_layer: Target) -> ComputeResult<Self> {
        require_configured(&dead_layer, "dead layer")?;
        self.dead_layer = Some(dead_layer);
        Ok(self)
    }

    /// Material labels used to select punch-through (`sabre`) and degrader
    /// energy-loss (`degrader`) tables.
    pub fn with_materials(mut self, sabre: impl Into<String>, degrader: impl Into<String>) -> Self {
        self.sabre_material = sabre.into();
        self.degrader_material = degrader.into();
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn focal_plane(&self) -> &FocalPlaneDetector {
        &self.focal_plane
    }

    pub fn add_energy_loss_table(&mut self, path: impl AsRef<Path>) -> ComputeResult<TableKey> {
        let table = ElossTable::read_file(path)?;
        Ok(self.insert_energy_loss_table(table))
    }

    pub fn add_punch_thru_table(&mut self, path: impl AsRef<Path>) -> ComputeResult<TableKey> {
        let table = PunchTable::read_file(path)?;
        Ok(self.insert_punch_thru_table(table))
    }

    /// Registers a table under its own key, replacing any table already
    /// registered for the same projectile and material.
    pub fn insert_energy_loss_table(&mut self, table: ElossTable) -> TableKey {
        let key = table.key().clone();
        if self.eloss_tables.insert(key.clone(), table).is_some() {
            tracing::warn!(%key, "replaced energy-loss table");
        }
        key
    }

    pub fn insert_punch_thru_table(&mut self, table: PunchTable) -> TableKey {
        let key = table.key().clone();
        if self.punch_tables.insert(key.clone(), table).is_some() {
            tracing::warn!(%key, "replaced punch-through table");
        }
        key
    }

    pub fn energy_loss_table_keys(&self) -> impl Iterator<Item = &TableKey> {
        self.eloss_tables.keys()
    }

    pub fn punch_thru_table_keys(&self) -> impl Iterator<Item = &TableKey> {
        self.punch_tables.keys()
    }

    pub fn hit_direction(&self, hit: &SabreHit) -> Option<Vector3<f64>> {
        self.array.hit_direction(hit)
    }

    pub fn detector_normal(&self, index: usize) -> Option<Vector3<f64>> {
        self.array.detector_normal(index)
    }

    fn nuclear_mass(&self, id: NucId) -> ComputeResult<f64> {
        if !id.is_physical() {
            return Err(ReconError::input_validation(
                "INPUT.UNPHYSICAL_NUCLEUS",
                format!("nucleus {id} violates 0 <= Z <= A, A > 0"),
            ));
        }
        self.masses
            .nuclear_mass_mev(id)
            .filter(|mass| *mass > 0.0)
            .ok_or_else(|| {
                ReconError::input_validation(
                    "INPUT.UNKNOWN_ISOTOPE",
                    format!("nucleus {id} is not in the mass table"),
                )
            })
    }

    fn table_key(&self, id: NucId, material: &str) -> ComputeResult<TableKey> {
        let projectile = self.masses.isotope_label(id).ok_or_else(|| {
            ReconError::input_validation(
                "INPUT.UNKNOWN_ISOTOPE",
                format!("nucleus {id} is not in the mass table"),
            )
        })?;
        Ok(TableKey::new(projectile, material))
    }

    fn punch_table(&self, id: NucId) -> ComputeResult<&PunchTable> {
        let key = self.table_key(id, &self.sabre_material)?;
        self.punch_tables.get(&key).ok_or_else(|| {
            ReconError::computation(
                "RUN.MISSING_TABLE",
                format!("no punch-through table registered for {key}"),
            )
        })
    }

    fn eloss_table(&self, id: NucId) -> ComputeResult<&ElossTable> {
        let key = self.table_key(id, &self.degrader_material)?;
        self.eloss_tables.get(&key).ok_or_else(|| {
            ReconError::computation(
                "RUN.MISSING_TABLE",
                format!("no energy-loss table registered for {key}"),
            )
        })
    }
}
