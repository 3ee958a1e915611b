use super::CliError;
use anyhow::Context;
use sabre_core::common::config::{ReconConfig, load_recon_config};
use sabre_core::common::masses::MassTable;
use sabre_core::domain::{NucId, ReconError};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber. `RUST_LOG` applies unless
/// `--verbose` forces `debug`.
pub(super) fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A subscriber may already be installed when the CLI is driven in-process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Parses a `Z,A` pair such as `6,12`.
pub(super) fn parse_nuclide(value: &str) -> Result<NucId, String> {
    let (z, a) = value
        .split_once(',')
        .ok_or_else(|| format!("expected Z,A but got '{value}'"))?;
    let z = z
        .trim()
        .parse::<i32>()
        .map_err(|error| format!("invalid Z in '{value}': {error}"))?;
    let a = a
        .trim()
        .parse::<i32>()
        .map_err(|error| format!("invalid A in '{value}': {error}"))?;
    let id = NucId::new(z, a);
    if id.is_physical() {
        Ok(id)
    } else {
        Err(format!("{id} violates 0 <= Z <= A, A > 0"))
    }
}

pub(super) fn load_session(path: &Path) -> Result<(ReconConfig, Arc<MassTable>), CliError> {
    let config = load_recon_config(path).map_err(ReconError::from)?;
    let masses = config.mass_table().map_err(ReconError::from)?;
    Ok((config, Arc::new(masses)))
}

pub(super) fn print_json<T: Serialize>(value: &T) -> Result<i32, CliError> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON output")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}").context("failed to write to stdout")?;
    Ok(0)
}
