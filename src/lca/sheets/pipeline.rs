use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::lca::sheets::activities::create_custom_activities;
use crate::lca::sheets::error::{IngestError, Result};
use crate::lca::sheets::foreground::create_foreground;
use crate::lca::sheets::framework::{LcaFramework, MemoryFramework};
use crate::lca::sheets::io::{database, excel_read, excel_write};
use crate::lca::sheets::model::{SheetMeta, Workbook, sort_by_priority};
use crate::lca::sheets::outcome::{Phase, RunReport, SheetReport, SkipReason};
use crate::lca::sheets::params::process_parameters;
use crate::lca::sheets::registry::RunContext;

pub const DEFAULT_CUSTOM_DB: &str = "foreground";
pub const DEFAULT_METADATA_SHEET: &str = "Custom metadata";

/// How a loaded workbook is turned into parameters and activities.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOptions {
    pub custom_db: String,
    pub metadata_sheet: String,
    /// Foreground sheets to build, in order.
    pub foreground_sheets: Vec<String>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            custom_db: DEFAULT_CUSTOM_DB.to_string(),
            metadata_sheet: DEFAULT_METADATA_SHEET.to_string(),
            foreground_sheets: Vec::new(),
        }
    }
}

/// Everything a command-line run needs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunConfig {
    pub workbook: PathBuf,
    pub background: PathBuf,
    pub export_json: Option<PathBuf>,
    pub report_xlsx: Option<PathBuf>,
    pub options: ProcessOptions,
}

/// Result of a processing run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub context: RunContext,
    pub report: RunReport,
}

/// Reads the metadata table, creates the parameters of every process sheet,
/// then builds the custom, modified and foreground activities.
#[instrument(level = "info", skip_all, fields(custom_db = %options.custom_db))]
pub fn process_workbook(
    framework: &mut impl LcaFramework,
    workbook: &Workbook,
    options: &ProcessOptions,
) -> Result<RunOutput> {
    let metadata: Vec<SheetMeta> = match workbook.sheet(&options.metadata_sheet) {
        Some(table) => excel_read::parse_metadata(table)?,
        None => {
            warn!(sheet = %options.metadata_sheet, "no metadata sheet, only foreground sheets will be built");
            Vec::new()
        }
    };
    info!(sheet_count = metadata.len(), "read sheet metadata");

    let mut context = RunContext::new(&options.custom_db);
    let mut report = RunReport::default();

    let mut parameter_sheets: Vec<&str> = sort_by_priority(&metadata)
        .into_iter()
        .map(|meta| meta.sheet.as_str())
        .collect();
    for sheet in &options.foreground_sheets {
        parameter_sheets.push(sheet);
    }
    let mut seen = std::collections::BTreeSet::new();
    for name in parameter_sheets {
        if !seen.insert(name) {
            continue;
        }
        match workbook.sheet(name) {
            Some(sheet) => report
                .sheets
                .push(process_parameters(&mut *framework, &mut context, sheet)),
            None => report.sheets.push(SheetReport::failed(
                name,
                Phase::Parameters,
                SkipReason::MissingSheet(name.to_string()),
            )),
        }
    }
    info!(parameter_count = context.registry.len(), "parameters registered");

    report.sheets.extend(create_custom_activities(
        &mut *framework,
        &context,
        &metadata,
        workbook,
    ));

    for name in &options.foreground_sheets {
        match workbook.sheet(name) {
            Some(sheet) => report
                .sheets
                .push(create_foreground(&mut *framework, &context, sheet)),
            None => {
                warn!(sheet = %name, "foreground sheet not found");
                report.sheets.push(SheetReport::failed(
                    name,
                    Phase::Foreground,
                    SkipReason::MissingSheet(name.clone()),
                ));
            }
        }
    }

    info!(
        skipped_rows = report.skipped_row_count(),
        failed_sheets = report.failed_sheet_count(),
        "finished processing workbook"
    );
    Ok(RunOutput { context, report })
}

/// Loads the background database and the workbook, processes the workbook and
/// writes the requested exports.
#[instrument(
    level = "info",
    skip_all,
    fields(workbook = %config.workbook.display(), background = %config.background.display())
)]
pub fn run(config: &RunConfig) -> Result<(MemoryFramework, RunOutput)> {
    for path in [&config.workbook, &config.background] {
        if !path.exists() {
            return Err(IngestError::MissingInput(path.clone()));
        }
    }

    let mut framework = database::load_background(&config.background)?;
    let workbook = excel_read::read_workbook(&config.workbook)?;
    info!(sheet_count = workbook.sheets.len(), "read workbook");

    let output = process_workbook(&mut framework, &workbook, &config.options)?;

    if let Some(path) = &config.export_json {
        export_json(&framework, path)?;
    }
    if let Some(path) = &config.report_xlsx {
        export_report(&framework, &output.report, path)?;
    }
    Ok((framework, output))
}

/// Writes the databases created during the run as JSON.
#[instrument(level = "info", skip_all, fields(output = %output.display()))]
pub fn export_json(framework: &MemoryFramework, output: &Path) -> Result<()> {
    let export = database::export_databases(framework);
    info!(database_count = export.databases.len(), "exporting databases");
    database::write_export(output, &export)
}

/// Writes the activities, parameters and run log as an Excel report.
#[instrument(level = "info", skip_all, fields(output = %output.display()))]
pub fn export_report(framework: &MemoryFramework, report: &RunReport, output: &Path) -> Result<()> {
    let export = database::export_databases(framework);
    let tables = excel_write::build_report(&export, report);
    excel_write::write_report(output, &tables)
}
