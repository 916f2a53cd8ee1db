use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};

use crate::lca::sheets::error::{IngestError, Result};
use crate::lca::sheets::model::{
    Cell, META_LOCATION, META_ORIGINAL_LOCATION, META_ORIGINAL_NAME, META_PRIORITY, META_SHEET,
    META_SOURCE, META_TYPE, META_UNIT, Row, SheetKind, SheetMeta, SheetTable, Workbook,
};

/// Reads every worksheet of an Excel workbook. The first row of each sheet
/// holds the column headers.
pub fn read_workbook(path: &Path) -> Result<Workbook> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let mut sheets = Workbook::new();

    for name in workbook.sheet_names().to_vec() {
        let range = read_required_sheet(&mut workbook, &name)?;
        sheets.insert(range_to_table(&name, &range));
    }

    Ok(sheets)
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| IngestError::MissingSheet(name.to_string()))?;
    let range = range_result.map_err(IngestError::from)?;
    Ok(range)
}

fn range_to_table(name: &str, range: &calamine::Range<DataType>) -> SheetTable {
    let headers: Vec<String> = match range.rows().next() {
        Some(first_row) => first_row
            .iter()
            .map(|cell| convert_cell(cell).as_text().unwrap_or_default())
            .collect(),
        None => Vec::new(),
    };

    let rows = range
        .rows()
        .skip(1)
        .map(|cells| {
            let mut row = Row::new();
            for (header, cell) in headers.iter().zip(cells) {
                if header.is_empty() {
                    continue;
                }
                row.insert(header.clone(), convert_cell(cell));
            }
            row
        })
        .collect();

    SheetTable {
        name: name.to_string(),
        headers: headers.into_iter().filter(|header| !header.is_empty()).collect(),
        rows,
    }
}

fn convert_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::String(value) => Cell::Text(value.clone()),
        DataType::Float(value) | DataType::DateTime(value) => Cell::Number(*value),
        DataType::Int(value) => Cell::Number(*value as f64),
        DataType::Bool(value) => Cell::Bool(*value),
        DataType::Empty | DataType::Error(_) => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}

/// Reads the sheet-metadata table. Rows without a sheet name are ignored.
pub fn parse_metadata(table: &SheetTable) -> Result<Vec<SheetMeta>> {
    for column in [META_SHEET, META_PRIORITY, META_TYPE] {
        if !table.has_column(column) {
            return Err(IngestError::InvalidWorkbook(format!(
                "metadata sheet '{}' has no '{column}' column",
                table.name
            )));
        }
    }

    let mut metadata = Vec::new();
    for row in &table.rows {
        let Some(sheet) = row.text(META_SHEET) else {
            continue;
        };
        let priority = match row.get(META_PRIORITY) {
            Some(cell) if !cell.is_missing() => Some(cell.as_number().ok_or_else(|| {
                IngestError::InvalidWorkbook(format!(
                    "invalid priority '{cell}' for sheet '{sheet}'"
                ))
            })?),
            _ => None,
        };
        metadata.push(SheetMeta {
            kind: SheetKind::parse(&row.text(META_TYPE).unwrap_or_default()),
            priority,
            location: row.text(META_LOCATION),
            unit: row.text(META_UNIT),
            original_name: row.text(META_ORIGINAL_NAME),
            original_location: row.text(META_ORIGINAL_LOCATION),
            source: row.text(META_SOURCE),
            sheet,
        });
    }

    Ok(metadata)
}
