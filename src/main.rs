use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lca_sheets::pipeline::{self, DEFAULT_CUSTOM_DB, DEFAULT_METADATA_SHEET, ProcessOptions, RunConfig};
use lca_sheets::{IngestError, Result};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(cli.verbose).and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| IngestError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => execute_run(args),
    }
}

fn execute_run(args: RunArgs) -> Result<()> {
    let config = RunConfig::from(args);
    let (_, output) = pipeline::run(&config)?;

    let report = &output.report;
    println!(
        "processed {} sheet(s): {} parameter(s) registered, {} row(s) skipped, {} sheet(s) failed",
        report.sheets.len(),
        output.context.registry.len(),
        report.skipped_row_count(),
        report.failed_sheet_count(),
    );
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Register spreadsheet-defined LCA parameters and activities."
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a workbook against a background database.
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Workbook holding the process sheets and the metadata sheet.
    #[arg(long)]
    workbook: PathBuf,

    /// Background database as JSON.
    #[arg(long)]
    background: PathBuf,

    /// Database receiving custom, modified and foreground activities.
    #[arg(long, default_value = DEFAULT_CUSTOM_DB)]
    custom_db: String,

    /// Name of the sheet listing custom and modified sheets.
    #[arg(long, default_value = DEFAULT_METADATA_SHEET)]
    metadata_sheet: String,

    /// Foreground sheet to build; may be repeated.
    #[arg(long = "foreground")]
    foreground_sheets: Vec<String>,

    /// Write the created databases as JSON.
    #[arg(long)]
    export_json: Option<PathBuf>,

    /// Write an Excel report of activities, parameters and skipped rows.
    #[arg(long)]
    report: Option<PathBuf>,
}

impl From<RunArgs> for RunConfig {
    fn from(args: RunArgs) -> Self {
        RunConfig {
            workbook: args.workbook,
            background: args.background,
            export_json: args.export_json,
            report_xlsx: args.report,
            options: ProcessOptions {
                custom_db: args.custom_db,
                metadata_sheet: args.metadata_sheet,
                foreground_sheets: args.foreground_sheets,
            },
        }
    }
}
