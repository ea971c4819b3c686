mod commands;
mod config;
mod helpers;

use clap::Parser;
use epma_core::domain::EpmaError;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let error = error.as_epma_error();
            eprintln!("{}", error.diagnostic_line());
            if let Some(summary_line) = error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("epma-rs".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_logging(cli.verbose);
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

/// `RUST_LOG` wins over `-v`; logs go to stderr so reports on stdout stay clean.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "epma-rs",
    version,
    about = "Mineral formula normalization and quality control for electron microprobe analyses"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Run ingestion, cation quality check, and area and sample averaging
    Process(commands::ProcessArgs),
    /// Write the per-spot mineral formula table without quality checking
    Compose(commands::ComposeArgs),
    /// List supported mineral classes
    Minerals,
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Process(args) => commands::run_process_command(args),
        CliCommand::Compose(args) => commands::run_compose_command(args),
        CliCommand::Minerals => commands::run_minerals_command(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(EpmaError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<EpmaError> for CliError {
    fn from(error: EpmaError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_epma_error(&self) -> EpmaError {
        match self {
            Self::Usage(message) => EpmaError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => EpmaError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
