//! Isotope mass service.
//!
//! Reconstruction needs nuclear masses in MeV and the target model needs
//! atomic masses in u. Both come from the same table, injected into the
//! components that need it through the [`MassLookup`] trait.

use crate::common::constants::{ELECTRON_MASS_MEV, U_TO_MEV};
use crate::domain::{NucId, ReconError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct IsotopeEntry {
    pub id: NucId,
    pub symbol: String,
    pub atomic_mass_u: f64,
}

impl IsotopeEntry {
    /// Atomic mass with the electron masses removed, in MeV.
    pub fn nuclear_mass_mev(&self) -> f64 {
        self.atomic_mass_u * U_TO_MEV - f64::from(self.id.z) * ELECTRON_MASS_MEV
    }

    /// Label used to key lookup tables, e.g. `4He`.
    pub fn label(&self) -> String {
        format!("{}{}", self.id.a, self.symbol)
    }
}

pub trait MassLookup: Send + Sync {
    fn lookup(&self, id: NucId) -> Option<IsotopeEntry>;

    fn nuclear_mass_mev(&self, id: NucId) -> Option<f64> {
        self.lookup(id).map(|entry| entry.nuclear_mass_mev())
    }

    fn atomic_mass_u(&self, id: NucId) -> Option<f64> {
        self.lookup(id).map(|entry| entry.atomic_mass_u)
    }

    fn symbol(&self, id: NucId) -> Option<String> {
        self.lookup(id).map(|entry| entry.symbol)
    }

    fn isotope_label(&self, id: NucId) -> Option<String> {
        self.lookup(id).map(|entry| entry.label())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MassTableError {
    #[error("failed to read mass table '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("mass table line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

impl From<MassTableError> for ReconError {
    fn from(error: MassTableError) -> Self {
        let message = error.to_string();
        match error {
            MassTableError::Read { .. } => ReconError::io_system("IO.MASS_TABLE_READ", message),
            MassTableError::Parse { .. } => {
                ReconError::input_validation("INPUT.MASS_TABLE", message)
            }
        }
    }
}

// Z, A, symbol, atomic mass (u). AME2020.
const BUILTIN_ISOTOPES: &[(i32, i32, &str, f64)] = &[
    (0, 1, "n", 1.008_664_915_95),
    (1, 1, "H", 1.007_825_032_23),
    (1, 2, "H", 2.014_101_778_12),
    (1, 3, "H", 3.016_049_277_9),
    (2, 3, "He", 3.016_029_320_1),
    (2, 4, "He", 4.002_603_254_13),
    (3, 6, "Li", 6.015_122_887_4),
    (3, 7, "Li", 7.016_003_434),
    (4, 7, "Be", 7.016_928_71),
    (4, 8, "Be", 8.005_305_10),
    (4, 9, "Be", 9.012_183_065),
    (5, 10, "B", 10.012_936_95),
    (5, 11, "B", 11.009_305_36),
    (6, 12, "C", 12.0),
    (6, 13, "C", 13.003_354_835_07),
    (7, 14, "N", 14.003_074_004_43),
    (7, 15, "N", 15.000_108_898_88),
    (8, 16, "O", 15.994_914_619_57),
    (8, 17, "O", 16.999_131_756_50),
    (8, 18, "O", 17.999_159_612_86),
    (9, 19, "F", 18.998_403_162_73),
    (10, 20, "Ne", 19.992_440_176_2),
    (13, 27, "Al", 26.981_538_53),
    (14, 28, "Si", 27.976_926_534_65),
];

/// In-memory isotope table keyed by (Z, A).
#[derive(Debug, Clone, Default)]
pub struct MassTable {
    entries: HashMap<NucId, IsotopeEntry>,
}

impl MassTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Light isotopes commonly met as beams, targets, ejectiles and detector
    /// materials.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for &(z, a, symbol, mass_u) in BUILTIN_ISOTOPES {
            table.insert(NucId::new(z, a), symbol, mass_u);
        }
        table
    }

    pub fn insert(&mut self, id: NucId, symbol: impl Into<String>, atomic_mass_u: f64) {
        self.entries.insert(
            id,
            IsotopeEntry {
                id,
                symbol: symbol.into(),
                atomic_mass_u,
            },
        );
    }

    /// Adds every entry of `other`, replacing isotopes already present.
    pub fn merge(&mut self, other: MassTable) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses `Z A Symbol AtomicMass_u` rows. Blank lines and lines starting
    /// with `#` are skipped.
    pub fn from_source(source: &str) -> Result<Self, MassTableError> {
        let mut table = Self::empty();
        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let tokens: Vec<&str> = trimmed.split_whitespace().collect();
            if tokens.len() < 4 {
                return Err(MassTableError::Parse {
                    line,
                    reason: format!("expected 4 columns, found {}", tokens.len()),
                });
            }

            let z = parse_token::<i32>(tokens[0], line, "Z")?;
            let a = parse_token::<i32>(tokens[1], line, "A")?;
            let mass_u = parse_token::<f64>(tokens[3], line, "atomic mass")?;
            if !NucId::new(z, a).is_physical() || !(mass_u.is_finite() && mass_u > 0.0) {
                return Err(MassTableError::Parse {
                    line,
                    reason: format!("unphysical entry Z={z} A={a} mass={mass_u}"),
                });
            }
            table.insert(NucId::new(z, a), tokens[2], mass_u);
        }
        Ok(table)
    }

    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, MassTableError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| MassTableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_source(&source)?;
        tracing::debug!(path = %path.display(), isotopes = table.len(), "loaded mass table");
        Ok(table)
    }
}

impl MassLookup for MassTable {
    fn lookup(&self, id: NucId) -> Option<IsotopeEntry> {
        self.entries.get(&id).cloned()
    }
}

fn parse_token<T: std::str::FromStr>(
    token: &str,
    line: usize,
    field: &str,
) -> Result<T, MassTableError> {
    token.parse::<T>().map_err(|_| MassTableError::Parse {
        line,
        reason: format!("invalid {field} '{token}'"),
    })
}
