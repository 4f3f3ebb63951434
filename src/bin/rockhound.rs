use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use rockhound::catalog::{self, BEDMAP2_ARCHIVE};
use rockhound::config::ConfigLoader;
use rockhound::domain::DatasetSelection;
use rockhound::error::RockhoundError;
use rockhound::fetcher::{DatasetFetcher, FetchOutcome};
use rockhound::fs_util;
use rockhound::output::{ArchiveResult, JsonOutput, OutputMode, TextOutput};
use rockhound::registry::ArchiveFetcher;

#[derive(Parser)]
#[command(name = "rockhound")]
#[command(about = "Fetch, verify and load the Bedmap2 Antarctic rasters")]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Print machine readable JSON")]
    json: bool,

    #[arg(long, global = true, help = "Path to a rockhound.json config file")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List the datasets in the Bedmap2 archive")]
    List,
    #[command(about = "Download, verify and load datasets")]
    Fetch(FetchArgs),
    #[command(about = "Download and verify the archive, print its path")]
    Path(PathArgs),
}

#[derive(Args)]
struct PathArgs {
    #[arg(long, help = "Also list the files inside the archive")]
    members: bool,
}

#[derive(Args)]
struct FetchArgs {
    #[arg(help = "Dataset names; all datasets when omitted")]
    datasets: Vec<String>,

    #[arg(long, conflicts_with = "datasets")]
    all: bool,

    #[arg(long, help = "Only download and verify the archive")]
    no_load: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<RockhoundError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &RockhoundError) -> u8 {
    match error {
        RockhoundError::InvalidDataset { .. } | RockhoundError::UnknownArchive(_) => 2,
        RockhoundError::Http(_)
        | RockhoundError::HttpStatus { .. }
        | RockhoundError::ChecksumMismatch { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Commands::List => {
            let printed = match output_mode {
                OutputMode::Json => JsonOutput::print_catalog(catalog::entries()),
                OutputMode::Human => TextOutput::print_catalog(catalog::entries()),
            };
            printed.into_diagnostic()
        }
        Commands::Path(args) => run_path(args, cli.config.as_deref(), output_mode),
        Commands::Fetch(args) => run_fetch(args, cli.config.as_deref(), output_mode),
    }
}

fn run_path(args: PathArgs, config: Option<&str>, output_mode: OutputMode) -> miette::Result<()> {
    let config = ConfigLoader::resolve(config)?;
    let fetcher = DatasetFetcher::from_config(&config)?;
    let path = fetcher.archives().fetch(BEDMAP2_ARCHIVE)?;
    let members = if args.members {
        Some(fs_util::list_members(path.as_std_path())?)
    } else {
        None
    };
    let result = ArchiveResult {
        archive: BEDMAP2_ARCHIVE.to_string(),
        path: path.to_string(),
        members,
    };
    let printed = match output_mode {
        OutputMode::Json => JsonOutput::print_archive(&result),
        OutputMode::Human => TextOutput::print_archive(&result),
    };
    printed.into_diagnostic()
}

fn run_fetch(args: FetchArgs, config: Option<&str>, output_mode: OutputMode) -> miette::Result<()> {
    // Names are validated before the config is read or anything is downloaded.
    let selection = if args.all || args.datasets.is_empty() {
        DatasetSelection::All
    } else {
        DatasetSelection::from_names(&args.datasets)?
    };

    let config = ConfigLoader::resolve(config)?;
    let fetcher = DatasetFetcher::from_config(&config)?;

    match fetcher.fetch(&selection, !args.no_load)? {
        FetchOutcome::Archive(path) => {
            let result = ArchiveResult {
                archive: BEDMAP2_ARCHIVE.to_string(),
                path: path.to_string(),
                members: None,
            };
            let printed = match output_mode {
                OutputMode::Json => JsonOutput::print_archive(&result),
                OutputMode::Human => TextOutput::print_archive(&result),
            };
            printed.into_diagnostic()?;
        }
        FetchOutcome::Loaded(dataset) => {
            let summary = dataset.summary();
            let printed = match output_mode {
                OutputMode::Json => JsonOutput::print_summary(&summary),
                OutputMode::Human => TextOutput::print_summary(&summary),
            };
            printed.into_diagnostic()?;
        }
    }
    Ok(())
}
