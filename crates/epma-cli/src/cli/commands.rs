use super::CliError;
use super::helpers::{
    ensure_directory, load_config, load_measurements, parse_mineral, quality_options,
};
use epma_core::domain::{EpmaError, MineralClass};
use epma_core::modules::DecisionSource;
use epma_core::modules::composition::compose;
use epma_core::modules::decision::{AcceptingDecisionSource, TerminalDecisionSource};
use epma_core::modules::pipeline::{PipelineOptions, PipelineOutcome, run_pipeline};
use epma_core::modules::report::composition_report;
use epma_core::modules::serialization::write_json_artifact;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum OutputFormat {
    Csv,
    Json,
}

#[derive(clap::Args)]
pub(super) struct ProcessArgs {
    /// Microprobe export (CSV, or tab-separated for .tsv/.txt)
    #[arg(long)]
    input: PathBuf,

    /// Mineral class: olivine, orthopyroxene, clinopyroxene or spinel
    #[arg(long)]
    mineral: String,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Starting cation-sum tolerance
    #[arg(long)]
    tolerance: Option<f64>,

    /// Accept the starting tolerance without prompting
    #[arg(long)]
    accept: bool,

    /// Give up after this many operator prompts
    #[arg(long)]
    max_prompts: Option<usize>,

    /// Directory the reports are written into
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
}

#[derive(clap::Args)]
pub(super) struct ComposeArgs {
    /// Microprobe export (CSV, or tab-separated for .tsv/.txt)
    #[arg(long)]
    input: PathBuf,

    /// Mineral class: olivine, orthopyroxene, clinopyroxene or spinel
    #[arg(long)]
    mineral: String,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the table here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(super) fn run_process_command(args: ProcessArgs) -> Result<i32, CliError> {
    let mineral = parse_mineral(&args.mineral)?;
    let config = load_config(args.config.as_deref())?;
    let options = PipelineOptions {
        quality: quality_options(&config, args.tolerance, args.max_prompts)?,
    };
    let measurements = load_measurements(&args.input, &config)?;

    let outcome = if args.accept {
        run_pipeline(&measurements, mineral, &mut AcceptingDecisionSource, &options)?
    } else {
        let mut terminal = TerminalDecisionSource::new(io::stdin().lock(), io::stdout());
        let source: &mut dyn DecisionSource = &mut terminal;
        run_pipeline(&measurements, mineral, source, &options)?
    };

    ensure_directory(&args.output_dir)?;
    let written = match args.format {
        OutputFormat::Csv => write_csv_reports(&outcome, &args.output_dir)?,
        OutputFormat::Json => vec![write_json_outcome(&outcome, &args.output_dir)?],
    };

    println!(
        "Kept {} of {} spot analyses for {} at cation tolerance {}",
        outcome.quality.measurements.len(),
        outcome.raw.len(),
        mineral,
        outcome.quality.tolerance
    );
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(0)
}

fn write_csv_reports(
    outcome: &PipelineOutcome,
    directory: &Path,
) -> Result<Vec<PathBuf>, CliError> {
    outcome
        .reports()
        .iter()
        .map(|report| report.write_csv(directory).map_err(CliError::from))
        .collect()
}

fn write_json_outcome(outcome: &PipelineOutcome, directory: &Path) -> Result<PathBuf, CliError> {
    let path = directory.join(format!(
        "{}_pipeline.json",
        outcome.mineral.sheet_name().to_ascii_lowercase().replace(' ', "_")
    ));
    write_json_artifact(&path, outcome).map_err(|source| {
        CliError::Compute(EpmaError::io_system(
            "IO.REPORT_WRITE",
            format!("failed to write '{}': {}", path.display(), source),
        ))
    })?;
    Ok(path)
}

pub(super) fn run_compose_command(args: ComposeArgs) -> Result<i32, CliError> {
    let mineral = parse_mineral(&args.mineral)?;
    let config = load_config(args.config.as_deref())?;
    let measurements = load_measurements(&args.input, &config)?;
    let report = composition_report(&compose(&measurements, mineral));

    let written = match &args.output {
        Some(path) => std::fs::File::create(path)
            .map_err(|source| source.to_string())
            .and_then(|file| report.write_csv_to(file).map_err(|source| source.to_string())),
        None => report
            .write_csv_to(io::stdout().lock())
            .map_err(|source| source.to_string()),
    };
    written.map_err(|message| {
        CliError::Compute(EpmaError::io_system(
            "IO.REPORT_WRITE",
            format!("failed to write composition table: {message}"),
        ))
    })?;
    Ok(0)
}

pub(super) fn run_minerals_command() -> Result<i32, CliError> {
    println!("{:<15} {:>7} {:>7}  sheet", "mineral", "oxygens", "cations");
    for mineral in MineralClass::ALL {
        println!(
            "{:<15} {:>7} {:>7}  {}",
            mineral.as_str(),
            mineral.ideal_oxygen_count(),
            mineral.ideal_cation_sum(),
            mineral.sheet_name()
        );
    }
    Ok(0)
}
