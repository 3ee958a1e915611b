//! Angle-binned lookup tables built from pre-computed energy-loss data.
//!
//! Both table flavours share one file layout and one in-memory shape: one
//! cubic spline per incidence-angle bin. They differ in what the spline
//! returns and in how a miss is reported.
//!
//! * [`ElossTable`] maps `(angle, final energy)` to the energy lost before
//!   observation. Queries outside the tabulated range mean "no correction"
//!   and return `0.0`.
//! * [`PunchTable`] maps `(angle, deposited energy)` to the kinetic energy
//!   the particle had on entry. A miss means the particle stopped and the
//!   deposited energy is returned unchanged.

pub mod parser;

pub use parser::{AngleBlock, AngleTableData, parse_angle_table};

use crate::common::constants::RAD2DEG;
use crate::domain::ReconError;
use crate::numerics::{CubicSpline, SplineError, is_grazing};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to read table '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("table header line {line}: {reason}")]
    Header { line: usize, reason: String },
    #[error("table angle parameters: {reason}")]
    Parameters { reason: String },
    #[error("unexpected token '{token}' in table body")]
    UnexpectedToken { token: String },
    #[error("block at theta {theta} is missing end_theta")]
    UnterminatedBlock { theta: f64 },
    #[error("block at theta {theta}: {reason}")]
    MalformedSample { theta: f64, reason: String },
    #[error("table declares {expected} angle bins but contains {found}")]
    BinCount { expected: usize, found: usize },
    #[error("block at theta {theta} does not form a spline: {source}")]
    Spline { theta: f64, source: SplineError },
    #[error("angle bin at theta {theta} has no tabulated data")]
    EmptyBin { theta: f64 },
}

impl From<TableError> for ReconError {
    fn from(error: TableError) -> Self {
        let message = error.to_string();
        match error {
            TableError::Read { .. } => ReconError::io_system("IO.TABLE_READ", message),
            TableError::Header { .. } => {
                ReconError::input_validation("INPUT.TABLE_HEADER", message)
            }
            TableError::Parameters { .. } => {
                ReconError::input_validation("INPUT.TABLE_PARAMETERS", message)
            }
            TableError::UnexpectedToken { .. }
            | TableError::UnterminatedBlock { .. }
            | TableError::MalformedSample { .. } => {
                ReconError::input_validation("INPUT.TABLE_BODY", message)
            }
            TableError::BinCount { .. } => {
                ReconError::input_validation("INPUT.TABLE_BIN_COUNT", message)
            }
            TableError::Spline { .. } => {
                ReconError::input_validation("INPUT.TABLE_SPLINE", message)
            }
            TableError::EmptyBin { .. } => ReconError::computation("RUN.TABLE_EMPTY_BIN", message),
        }
    }
}

/// Identity a table is registered under: projectile label and material label,
/// e.g. `4He` in `27Al`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub projectile: String,
    pub material: String,
}

impl TableKey {
    pub fn new(projectile: impl Into<String>, material: impl Into<String>) -> Self {
        Self {
            projectile: projectile.into(),
            material: material.into(),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.projectile, self.material)
    }
}

#[derive(Debug, Clone)]
struct AngleBinnedSplines {
    key: TableKey,
    theta_min: f64,
    theta_max: f64,
    theta_step: f64,
    bins: Vec<(f64, CubicSpline)>,
}

enum BinLookup<'a> {
    OutOfRange,
    Empty(f64),
    Fitted(&'a CubicSpline),
}

impl AngleBinnedSplines {
    fn build(data: AngleTableData) -> Result<Self, TableError> {
        let mut bins = Vec::with_capacity(data.blocks.len());
        for block in data.blocks {
            // Fewer than two samples cannot define a segment; keep the bin empty.
            let spline = if block.samples.len() < 2 {
                CubicSpline::unfitted()
            } else {
                let (x, y): (Vec<f64>, Vec<f64>) = block.samples.iter().copied().unzip();
                CubicSpline::new(&x, &y).map_err(|source| TableError::Spline {
                    theta: block.theta,
                    source,
                })?
            };
            bins.push((block.theta, spline));
        }

        Ok(Self {
            key: TableKey::new(data.projectile, data.material),
            theta_min: data.theta_min,
            theta_max: data.theta_max,
            theta_step: data.theta_step,
            bins,
        })
    }

    fn read(path: &Path) -> Result<Self, TableError> {
        let source = fs::read_to_string(path).map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::build(parse_angle_table(&source)?)?;
        tracing::debug!(
            path = %path.display(),
            key = %table.key,
            bins = table.bins.len(),
            "loaded angle-binned table"
        );
        Ok(table)
    }

    fn lookup(&self, theta_rad: f64) -> BinLookup<'_> {
        let degrees = theta_rad * RAD2DEG;
        if !(self.theta_min..=self.theta_max).contains(&degrees) {
            return BinLookup::OutOfRange;
        }
        let index = ((degrees - self.theta_min) / self.theta_step) as usize;
        match self.bins.get(index) {
            None => BinLookup::OutOfRange,
            Some((theta, spline)) if !spline.is_fitted() => BinLookup::Empty(*theta),
            Some((_, spline)) => BinLookup::Fitted(spline),
        }
    }
}

macro_rules! table_metadata {
    ($table:ty) => {
        impl $table {
            pub fn projectile(&self) -> &str {
                &self.inner.key.projectile
            }

            pub fn material(&self) -> &str {
                &self.inner.key.material
            }

            pub fn key(&self) -> &TableKey {
                &self.inner.key
            }

            /// `(theta_min, theta_max)` in degrees.
            pub fn theta_range(&self) -> (f64, f64) {
                (self.inner.theta_min, self.inner.theta_max)
            }

            pub fn theta_step(&self) -> f64 {
                self.inner.theta_step
            }

            pub fn bin_count(&self) -> usize {
                self.inner.bins.len()
            }

            /// Number of bins that carry a fitted spline.
            pub fn fitted_bin_count(&self) -> usize {
                self.inner
                    .bins
                    .iter()
                    .filter(|(_, spline)| spline.is_fitted())
                    .count()
            }
        }
    };
}

/// Reverse energy-loss table.
#[derive(Debug, Clone)]
pub struct ElossTable {
    inner: AngleBinnedSplines,
}

table_metadata!(ElossTable);

impl ElossTable {
    pub fn from_source(source: &str) -> Result<Self, TableError> {
        Ok(Self {
            inner: AngleBinnedSplines::build(parse_angle_table(source)?)?,
        })
    }

    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, TableError> {
        Ok(Self {
            inner: AngleBinnedSplines::read(path.as_ref())?,
        })
    }

    /// Energy (MeV) lost before the particle was observed with
    /// `final_energy` at incidence `theta_rad`. Angles or energies outside
    /// the tabulated range give `0.0`; an empty bin is an error.
    pub fn energy_loss(&self, theta_rad: f64, final_energy: f64) -> Result<f64, TableError> {
        if is_grazing(theta_rad) {
            return Ok(0.0);
        }
        match self.inner.lookup(theta_rad) {
            BinLookup::OutOfRange => Ok(0.0),
            BinLookup::Empty(theta) => Err(TableError::EmptyBin { theta }),
            BinLookup::Fitted(spline) => spline
                .evaluate_or_zero(final_energy)
                .map_err(|source| TableError::Spline {
                    theta: theta_rad * RAD2DEG,
                    source,
                }),
        }
    }
}

/// Punch-through table: deposited energy to initial kinetic energy.
#[derive(Debug, Clone)]
pub struct PunchTable {
    inner: AngleBinnedSplines,
}

table_metadata!(PunchTable);

impl PunchTable {
    pub fn from_source(source: &str) -> Result<Self, TableError> {
        Ok(Self {
            inner: AngleBinnedSplines::build(parse_angle_table(source)?)?,
        })
    }

    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, TableError> {
        Ok(Self {
            inner: AngleBinnedSplines::read(path.as_ref())?,
        })
    }

    /// Kinetic energy (MeV) on entry for a particle that deposited
    /// `deposited` at incidence `theta_rad`. Returns `deposited` unchanged
    /// whenever the table has no punch-through solution, which callers read
    /// as "stopped in the detector".
    pub fn initial_kinetic_energy(
        &self,
        theta_rad: f64,
        deposited: f64,
    ) -> Result<f64, TableError> {
        if is_grazing(theta_rad) {
            return Ok(deposited);
        }
        match self.inner.lookup(theta_rad) {
            BinLookup::OutOfRange | BinLookup::Empty(_) => Ok(deposited),
            BinLookup::Fitted(spline) => {
                let initial = spline
                    .evaluate_or_zero(deposited)
                    .map_err(|source| TableError::Spline {
                        theta: theta_rad * RAD2DEG,
                        source,
                    })?;
                Ok(if initial == 0.0 { deposited } else { initial })
            }
        }
    }

    pub fn is_stopped(&self, theta_rad: f64, deposited: f64) -> Result<bool, TableError> {
        Ok(self.initial_kinetic_energy(theta_rad, deposited)? == deposited)
    }
}

#[cfg(test)]
mod tests {
    use super::{ElossTable, PunchTable, TableError, TableKey};
    use crate::domain::{ReconError, ReconErrorCategory};
    use std::f64::consts::FRAC_PI_2;

    const DEG: f64 = std::f64::consts::PI / 180.0;

    fn source(body: &str) -> String {
        format!(
            "Incident projectile: 4He\n\
             Material composition:\n\
             13 27Al 1\n\
             ---------------------------------\n\
             theta_min: 0 theta_max: 60 theta_step: 30\n\
             E(MeV) value(MeV)\n\
             {body}"
        )
    }

    fn linear_eloss() -> ElossTable {
        // Loss = 0.1 * E + 1 in the 0° and 30° bins; the 60° bin is empty.
        ElossTable::from_source(&source(
            "begin_theta 0\n1 1.1\n2 1.2\n3 1.3\n4 1.4\nend_theta\n\
             begin_theta 30\n1 2.1\n2 2.2\n3 2.3\n4 2.4\nend_theta\n\
             begin_theta 60\nend_theta\n",
        ))
        .expect("table should build")
    }

    #[test]
    fn eloss_lookup_selects_bin_by_angle() {
        let table = linear_eloss();
        assert_eq!(table.key(), &TableKey::new("4He", "27Al"));
        assert_eq!(table.bin_count(), 3);
        assert_eq!(table.fitted_bin_count(), 2);
        assert_eq!(table.theta_range(), (0.0, 60.0));

        let low = table.energy_loss(10.0 * DEG, 2.5).unwrap();
        let high = table.energy_loss(40.0 * DEG, 2.5).unwrap();
        assert!((low - 1.25).abs() < 1.0e-9, "low bin gave {low}");
        assert!((high - 2.25).abs() < 1.0e-9, "high bin gave {high}");
        assert_eq!(low, table.energy_loss(10.0 * DEG, 2.5).unwrap());
    }

    #[test]
    fn eloss_misses_are_zero_and_empty_bins_are_errors() {
        let table = linear_eloss();
        assert_eq!(table.energy_loss(-5.0 * DEG, 2.0).unwrap(), 0.0);
        assert_eq!(table.energy_loss(75.0 * DEG, 2.0).unwrap(), 0.0);
        assert_eq!(table.energy_loss(10.0 * DEG, 9.0).unwrap(), 0.0);
        assert_eq!(table.energy_loss(FRAC_PI_2, 2.0).unwrap(), 0.0);

        let error = table.energy_loss(60.0 * DEG, 2.0).expect_err("empty bin");
        assert!(matches!(error, TableError::EmptyBin { .. }));
        let error = ReconError::from(error);
        assert_eq!(error.placeholder(), "RUN.TABLE_EMPTY_BIN");
    }

    #[test]
    fn punch_lookup_returns_deposit_when_stopped() {
        let table = PunchTable::from_source(&source(
            "begin_theta 0\n1 5\n2 6\n3 7\nend_theta\n\
             begin_theta 30\nend_theta\n\
             begin_theta 60\n1 8\n2 9\nend_theta\n",
        ))
        .expect("table should build");

        let initial = table.initial_kinetic_energy(5.0 * DEG, 1.5).unwrap();
        assert!((initial - 5.5).abs() < 1.0e-9);
        assert!(!table.is_stopped(5.0 * DEG, 1.5).unwrap());

        // Above the tabulated deposits, in an empty bin, outside the angle range.
        assert_eq!(table.initial_kinetic_energy(5.0 * DEG, 4.0).unwrap(), 4.0);
        assert_eq!(table.initial_kinetic_energy(35.0 * DEG, 1.5).unwrap(), 1.5);
        assert_eq!(table.initial_kinetic_energy(80.0 * DEG, 1.5).unwrap(), 1.5);
        assert_eq!(table.initial_kinetic_energy(FRAC_PI_2, 1.5).unwrap(), 1.5);
        assert!(table.is_stopped(5.0 * DEG, 4.0).unwrap());
    }

    #[test]
    fn non_increasing_block_is_a_build_error() {
        let error = ElossTable::from_source(&source(
            "begin_theta 0\n2 1\n1 1\nend_theta\n\
             begin_theta 30\nend_theta\nbegin_theta 60\nend_theta\n",
        ))
        .expect_err("bad knots");
        assert!(matches!(error, TableError::Spline { theta, .. } if theta == 0.0));
        assert_eq!(
            ReconError::from(error).category(),
            ReconErrorCategory::InputValidationError
        );
    }

    #[test]
    fn missing_file_maps_to_io_error() {
        let error = PunchTable::read_file("/nonexistent/punch.txt").expect_err("missing");
        let error = ReconError::from(error);
        assert_eq!(error.placeholder(), "IO.TABLE_READ");
        assert_eq!(error.exit_code(), 3);
    }
}
