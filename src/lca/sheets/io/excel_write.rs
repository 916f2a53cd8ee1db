use std::path::Path;

use rust_xlsxwriter::Workbook;

use crate::lca::sheets::error::Result;
use crate::lca::sheets::io::database::DatabaseExport;
use crate::lca::sheets::model::{ParamKind, Parameter, format_number};
use crate::lca::sheets::outcome::RunReport;

/// A table that will be materialised as an Excel sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    fn new(sheet_name: &str, columns: &[&str]) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            columns: columns.iter().map(|column| column.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

/// Lays out the export and the run log as report tables.
pub fn build_report(export: &DatabaseExport, run: &RunReport) -> Vec<ReportTable> {
    let mut activities = ReportTable::new(
        "Activities",
        &["database", "code", "name", "location", "unit", "exchanges"],
    );
    let mut exchanges = ReportTable::new(
        "Exchanges",
        &["database", "activity", "input", "input database", "formula", "amount"],
    );

    for database in &export.databases {
        for activity in &database.activities {
            activities.rows.push(vec![
                database.name.clone(),
                activity.code.clone(),
                activity.name.clone(),
                activity.location.clone().unwrap_or_default(),
                activity.unit.clone(),
                activity.exchanges.len().to_string(),
            ]);
            for exchange in &activity.exchanges {
                exchanges.rows.push(vec![
                    database.name.clone(),
                    activity.name.clone(),
                    exchange
                        .input_name
                        .clone()
                        .unwrap_or_else(|| exchange.input.code.clone()),
                    exchange.input.database.clone(),
                    exchange.formula.clone(),
                    exchange.amount.map(format_number).unwrap_or_default(),
                ]);
            }
        }
    }

    let mut parameters = ReportTable::new(
        "Parameters",
        &[
            "name",
            "type",
            "default",
            "min",
            "max",
            "std",
            "distribution",
            "values",
            "description",
            "label",
        ],
    );
    for parameter in &export.parameters {
        parameters.rows.push(parameter_row(parameter));
    }

    let mut log = ReportTable::new("Run log", &["phase", "sheet", "row", "outcome"]);
    for sheet in &run.sheets {
        for outcome in &sheet.rows {
            log.rows.push(vec![
                sheet.phase.to_string(),
                sheet.sheet.clone(),
                outcome.row().to_string(),
                outcome.to_string(),
            ]);
        }
        if let Some(index) = sheet.terminated_at {
            log.rows.push(vec![
                sheet.phase.to_string(),
                sheet.sheet.clone(),
                index.to_string(),
                "end of sheet".to_string(),
            ]);
        }
        log.rows.push(vec![
            sheet.phase.to_string(),
            sheet.sheet.clone(),
            String::new(),
            sheet.outcome.to_string(),
        ]);
    }

    vec![activities, exchanges, parameters, log]
}

fn parameter_row(parameter: &Parameter) -> Vec<String> {
    let optional = |value: &Option<f64>| value.map(format_number).unwrap_or_default();
    let (default, min, max, std, distribution, values) = match &parameter.kind {
        ParamKind::Float {
            default, min, max, std, ..
        } => (
            format_number(*default),
            optional(min),
            optional(max),
            optional(std),
            parameter
                .effective_distribution()
                .map(|distribution| distribution.to_string())
                .unwrap_or_default(),
            String::new(),
        ),
        ParamKind::Bool { default } => (
            default.to_string(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ),
        ParamKind::Enum { values, default } => {
            let listed: Vec<String> = values
                .iter()
                .map(|candidate| match candidate.weight {
                    Some(weight) => format!("{} ({})", candidate.value, format_number(weight)),
                    None => candidate.value.clone(),
                })
                .collect();
            (
                default.clone(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                listed.join(", "),
            )
        }
    };
    vec![
        parameter.name.clone(),
        parameter.kind.type_name().to_string(),
        default,
        min,
        max,
        std,
        distribution,
        values,
        parameter.description.clone().unwrap_or_default(),
        parameter.label.clone().unwrap_or_default(),
    ]
}

/// Writes the provided tables to the given path.
pub fn write_report(path: &Path, tables: &[ReportTable]) -> Result<()> {
    let mut workbook_writer = Workbook::new();

    for table in tables {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&table.sheet_name)?;

        for (col_idx, header) in table.columns.iter().enumerate() {
            worksheet.write_string(0, col_idx as u16, header)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                worksheet.write_string((row_idx + 1) as u32, col_idx as u16, cell)?;
            }
        }

        if !table.rows.is_empty() {
            let mut excel_table = rust_xlsxwriter::Table::new();
            excel_table.set_autofilter(true);
            let col_end = (table.columns.len() as u16).saturating_sub(1);
            worksheet.add_table(0, 0, table.rows.len() as u32, col_end, &excel_table)?;
        }
    }

    workbook_writer.save(path)?;
    Ok(())
}
