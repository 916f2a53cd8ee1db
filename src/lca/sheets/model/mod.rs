use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod parameter;

pub use parameter::{Distribution, EnumValue, ParamKind, Parameter, ParameterLookup};

/// Column holding the canonical process name. A missing value terminates a sheet.
pub const COL_ACTIVITY_NAME: &str = "EI activity name";
pub const COL_LOCATION: &str = "loc";
pub const COL_PARAMETER_NUMBER: &str = "parameter number";
pub const COL_TYPE: &str = "Type";
pub const COL_DEFAULT: &str = "Default";
pub const COL_MIN: &str = "Min";
pub const COL_MAX: &str = "Max";
pub const COL_STD: &str = "Std";
pub const COL_DISTRIB: &str = "Distrib";
pub const COL_VALUES: &str = "Values";
pub const COL_WEIGHTS: &str = "Weights";
pub const COL_DESCRIPTION: &str = "Description";
pub const COL_LABEL: &str = "Label";
pub const COL_NEW_ACTIVITY_NAME: &str = "LCA algebraic name";
pub const COL_CUSTOM_PROCESS: &str = "Custom process name";
pub const COL_MODIFIED_PROCESS: &str = "Modified process name";
pub const COL_AMOUNT_FORMULA: &str = "Amount formula";

pub const META_SHEET: &str = "sheet";
pub const META_PRIORITY: &str = "priority";
pub const META_TYPE: &str = "type";
pub const META_LOCATION: &str = "location";
pub const META_UNIT: &str = "unit";
pub const META_ORIGINAL_NAME: &str = "original EI activity name";
pub const META_ORIGINAL_LOCATION: &str = "original EI activity location";
pub const META_SOURCE: &str = "source";

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Whether the cell counts as missing: empty, whitespace-only text or NaN.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            Cell::Number(value) => value.is_nan(),
            Cell::Bool(_) => false,
        }
    }

    /// Renders the cell as trimmed text, returning `None` when missing.
    /// Integral numbers are rendered without a fractional part.
    pub fn as_text(&self) -> Option<String> {
        if self.is_missing() {
            return None;
        }
        Some(match self {
            Cell::Text(text) => text.trim().to_string(),
            Cell::Number(value) => format_number(*value),
            Cell::Bool(value) => value.to_string(),
            Cell::Empty => unreachable!("missing cells return early"),
        })
    }

    /// Reads the cell as a finite number. Text is parsed after trimming.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Cell::Number(value) => *value,
            Cell::Text(text) => text.trim().parse::<f64>().ok()?,
            Cell::Bool(value) => {
                if *value {
                    1.0
                } else {
                    0.0
                }
            }
            Cell::Empty => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Number(value) => f.write_str(&format_number(*value)),
            Cell::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// Formats a number the way sheet authors write identifiers: `3.0` becomes `3`.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// One data row of a sheet, keyed by header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    cells: BTreeMap<String, Cell>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, mostly useful for tests.
    pub fn with(mut self, column: impl Into<String>, cell: Cell) -> Self {
        self.insert(column, cell);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, cell: Cell) {
        self.cells.insert(column.into(), cell);
    }

    /// Returns the cell under `column`, or `None` if the column is absent.
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }

    /// Returns the trimmed text of the cell, `None` when absent or missing.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(Cell::as_text)
    }

    pub fn is_missing(&self, column: &str) -> bool {
        self.get(column).is_none_or(Cell::is_missing)
    }
}

/// A header-keyed view of one worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl SheetTable {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for row in &rows {
            for column in row.cells.keys() {
                if !headers.contains(column) {
                    headers.push(column.clone());
                }
            }
        }
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|header| header == column)
    }

    /// Rows up to, but excluding, the first row whose process name is missing.
    /// The second element is the index of that terminator row, if any.
    pub fn data_rows(&self) -> (&[Row], Option<usize>) {
        match self
            .rows
            .iter()
            .position(|row| row.is_missing(COL_ACTIVITY_NAME))
        {
            Some(end) => (&self.rows[..end], Some(end)),
            None => (&self.rows[..], None),
        }
    }
}

/// Category of a sheet listed in the metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetKind {
    Custom,
    Modified,
    /// Any other tag. Such sheets are reported and left alone.
    Other(String),
}

impl SheetKind {
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "custom" => SheetKind::Custom,
            "modified" => SheetKind::Modified,
            _ => SheetKind::Other(tag.trim().to_string()),
        }
    }
}

impl fmt::Display for SheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetKind::Custom => f.write_str("custom"),
            SheetKind::Modified => f.write_str("modified"),
            SheetKind::Other(tag) => f.write_str(tag),
        }
    }
}

/// One row of the sheet-metadata table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetMeta {
    pub sheet: String,
    pub priority: Option<f64>,
    pub kind: SheetKind,
    pub location: Option<String>,
    pub unit: Option<String>,
    pub original_name: Option<String>,
    pub original_location: Option<String>,
    pub source: Option<String>,
}

impl SheetMeta {
    pub fn new(sheet: impl Into<String>, priority: f64, kind: SheetKind) -> Self {
        Self {
            sheet: sheet.into(),
            priority: Some(priority),
            kind,
            location: None,
            unit: None,
            original_name: None,
            original_location: None,
            source: None,
        }
    }
}

/// Orders metadata rows by ascending priority. The sort is stable and rows
/// without a priority go last.
pub fn sort_by_priority(metadata: &[SheetMeta]) -> Vec<&SheetMeta> {
    let mut sorted: Vec<&SheetMeta> = metadata.iter().collect();
    sorted.sort_by(|lhs, rhs| match (lhs.priority, rhs.priority) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    sorted
}

/// Identifies an activity inside the framework.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActivityKey {
    pub database: String,
    pub code: String,
}

impl ActivityKey {
    pub fn new(database: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            code: code.into(),
        }
    }
}

impl fmt::Display for ActivityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.database, self.code)
    }
}

/// The sheets of one workbook, by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: BTreeMap<String, SheetTable>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sheet: SheetTable) {
        self.sheets.insert(sheet.name.clone(), sheet);
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetTable> {
        self.sheets.get(name)
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }
}

impl FromIterator<SheetTable> for Workbook {
    fn from_iter<I: IntoIterator<Item = SheetTable>>(iter: I) -> Self {
        let mut workbook = Workbook::new();
        for sheet in iter {
            workbook.insert(sheet);
        }
        workbook
    }
}
