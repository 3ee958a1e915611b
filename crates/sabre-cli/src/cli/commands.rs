use super::CliError;
use super::helpers::{load_session, parse_nuclide, print_json};
use sabre_core::domain::{NucId, ReconError, ReconResult};
use sabre_core::energy_loss::{BetheBlochIntegrator, ElossTable, PunchTable, Target};
use sabre_core::reconstruction::Reconstructor;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(clap::Args)]
pub(super) struct TableInfoArgs {
    /// Table file
    path: PathBuf,

    /// Read the file as a punch-through table (deposited -> initial energy)
    #[arg(long)]
    punch: bool,
}

#[derive(clap::Args)]
pub(super) struct TargetLossArgs {
    /// JSON run configuration
    #[arg(long)]
    config: PathBuf,

    /// Projectile proton number
    #[arg(long)]
    z: i32,

    /// Projectile mass number
    #[arg(long)]
    a: i32,

    /// Kinetic energy in MeV: entering energy, or exit energy with --reverse
    #[arg(long)]
    energy: f64,

    /// Angle to the beam axis in degrees
    #[arg(long, allow_hyphen_values = true)]
    angle: f64,

    /// Fraction of the target thickness crossed
    #[arg(long, default_value_t = 1.0)]
    depth: f64,

    /// Compute the loss implied by an observed exit energy
    #[arg(long)]
    reverse: bool,
}

#[derive(clap::Args)]
pub(super) struct FpExcitationArgs {
    /// JSON run configuration
    #[arg(long)]
    config: PathBuf,

    /// Focal-plane position
    #[arg(long, allow_hyphen_values = true)]
    xavg: f64,

    /// Beam kinetic energy in MeV
    #[arg(long)]
    beam_ke: f64,

    /// Target nucleus as Z,A
    #[arg(long, value_parser = parse_nuclide)]
    target: NucId,

    /// Beam nucleus as Z,A
    #[arg(long, value_parser = parse_nuclide)]
    projectile: NucId,

    /// Focal-plane ejectile as Z,A
    #[arg(long, value_parser = parse_nuclide)]
    ejectile: NucId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TableSummary {
    kind: &'static str,
    projectile: String,
    material: String,
    theta_min_deg: f64,
    theta_max_deg: f64,
    theta_step_deg: f64,
    bins: usize,
    fitted_bins: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TargetLossReport {
    projectile: NucId,
    energy_mev: f64,
    angle_deg: f64,
    depth_fraction: f64,
    reverse: bool,
    loss_mev: f64,
    /// Exit energy for a forward query, entering energy for a reverse one.
    other_energy_mev: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExcitationReport {
    target: NucId,
    projectile: NucId,
    ejectile: NucId,
    residual: NucId,
    xavg: f64,
    beam_ke: f64,
    result: ReconResult,
}

macro_rules! summarize_table {
    ($kind:expr, $table:expr) => {{
        let table = $table;
        let (theta_min_deg, theta_max_deg) = table.theta_range();
        TableSummary {
            kind: $kind,
            projectile: table.projectile().to_string(),
            material: table.material().to_string(),
            theta_min_deg,
            theta_max_deg,
            theta_step_deg: table.theta_step(),
            bins: table.bin_count(),
            fitted_bins: table.fitted_bin_count(),
        }
    }};
}

pub(super) fn run_table_info_command(args: TableInfoArgs) -> Result<i32, CliError> {
    let summary = if args.punch {
        let table = PunchTable::read_file(&args.path).map_err(ReconError::from)?;
        summarize_table!("punch-through", table)
    } else {
        let table = ElossTable::read_file(&args.path).map_err(ReconError::from)?;
        summarize_table!("energy-loss", table)
    };
    print_json(&summary)
}

pub(super) fn run_target_loss_command(args: TargetLossArgs) -> Result<i32, CliError> {
    let (config, masses) = load_session(&args.config)?;
    let target = Target::with_composition(
        masses,
        Arc::new(BetheBlochIntegrator::default()),
        &config.target.elements,
        config.target.thickness_ug_cm2,
    )?;

    let projectile = NucId::new(args.z, args.a);
    let theta = args.angle.to_radians();
    let (loss_mev, other_energy_mev) = if args.reverse {
        let loss = target.reverse_energy_loss(projectile, args.energy, theta, args.depth)?;
        (loss, args.energy + loss)
    } else {
        let loss = target.energy_loss(projectile, args.energy, theta, args.depth)?;
        (loss, args.energy - loss)
    };

    print_json(&TargetLossReport {
        projectile,
        energy_mev: args.energy,
        angle_deg: args.angle,
        depth_fraction: args.depth,
        reverse: args.reverse,
        loss_mev,
        other_energy_mev,
    })
}

pub(super) fn run_fp_excitation_command(args: FpExcitationArgs) -> Result<i32, CliError> {
    let (config, masses) = load_session(&args.config)?;
    let reconstructor =
        Reconstructor::from_config(&config, masses, Arc::new(BetheBlochIntegrator::default()))?;

    let nuclei = [args.target, args.projectile, args.ejectile];
    let result = reconstructor.try_fp_resid_excitation(args.xavg, args.beam_ke, &nuclei)?;
    tracing::debug!(excitation = result.excitation, "reconstructed focal-plane event");

    print_json(&ExcitationReport {
        target: args.target,
        projectile: args.projectile,
        ejectile: args.ejectile,
        residual: args.target.plus(args.projectile).minus(args.ejectile),
        xavg: args.xavg,
        beam_ke: args.beam_ke,
        result,
    })
}
