mod commands;
mod helpers;

use clap::Parser;
use sabre_core::domain::ReconError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();

    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let recon_error = error.as_recon_error();
            eprintln!("{}", recon_error.diagnostic_line());
            eprintln!("{}", recon_error.fatal_exit_line());
            recon_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            helpers::init_logging(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "sabre-recon",
    version,
    about = "SABRE and focal-plane reaction reconstruction"
)]
struct Cli {
    /// Log at debug level (RUST_LOG is ignored)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Print the metadata of an angle-binned energy-loss or punch-through table
    TableInfo(commands::TableInfoArgs),
    /// Energy lost by a nucleus crossing the configured reaction target
    TargetLoss(commands::TargetLossArgs),
    /// Reconstruct the residual excitation from a focal-plane position
    FpExcitation(commands::FpExcitationArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::TableInfo(args) => commands::run_table_info_command(args),
        CliCommand::TargetLoss(args) => commands::run_target_loss_command(args),
        CliCommand::FpExcitation(args) => commands::run_fp_excitation_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(ReconError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_recon_error(&self) -> ReconError {
        match self {
            Self::Usage(message) => {
                ReconError::input_validation("INPUT.CLI_USAGE", message.trim_end().to_string())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => ReconError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}

impl From<ReconError> for CliError {
    fn from(error: ReconError) -> Self {
        Self::Compute(error)
    }
}
