#![allow(dead_code)]

use std::cell::RefCell;
use std::path::Path;

use lca_sheets::expr::Expr;
use lca_sheets::framework::{
    ExchangeMap, ExchangeSelector, FrameworkError, LcaFramework, MemoryFramework,
};
use lca_sheets::io::database;
use lca_sheets::model::{
    ActivityKey, COL_ACTIVITY_NAME, COL_DEFAULT, COL_LOCATION, COL_PARAMETER_NUMBER, COL_TYPE,
    Cell, Parameter, Row,
};
use rust_xlsxwriter::Workbook;

pub const BACKGROUND_DB: &str = "ecoinvent";
pub const CUSTOM_DB: &str = "foreground";

pub const BACKGROUND_JSON: &str = r#"{
    "name": "ecoinvent",
    "activities": [
        {"code": "steel-rer", "name": "market for steel, low-alloyed", "location": "RER", "unit": "kg"},
        {"code": "steel-glo", "name": "market for steel, low-alloyed", "location": "GLO", "unit": "kg"},
        {"code": "alu-glo", "name": "market for aluminium, primary", "location": "GLO", "unit": "kg"},
        {"code": "elec-ch", "name": "market for electricity, medium voltage", "location": "CH", "unit": "kWh"},
        {"code": "lorry-glo", "name": "market for transport, freight, lorry", "location": "GLO", "unit": "t*km"},
        {
            "code": "frame-ch",
            "name": "bicycle frame production",
            "location": "CH",
            "unit": "unit",
            "exchanges": [
                {"input": "steel-rer", "amount": 2.0},
                {"input": "alu-glo", "amount": 0.5},
                {"input": "elec-ch", "amount": 10.0}
            ]
        }
    ]
}"#;

pub fn background() -> MemoryFramework {
    database::parse_background(BACKGROUND_JSON).expect("background database parsed")
}

pub fn bg(code: &str) -> ActivityKey {
    ActivityKey::new(BACKGROUND_DB, code)
}

pub fn text(value: &str) -> Cell {
    Cell::Text(value.to_string())
}

pub fn num(value: f64) -> Cell {
    Cell::Number(value)
}

/// A float parameter row pointing at `activity`.
pub fn float_row(number: f64, activity: &str, location: Option<&str>, default: f64) -> Row {
    let mut row = Row::new()
        .with(COL_ACTIVITY_NAME, text(activity))
        .with(COL_PARAMETER_NUMBER, num(number))
        .with(COL_TYPE, text("float"))
        .with(COL_DEFAULT, num(default));
    row.insert(
        COL_LOCATION,
        location.map(text).unwrap_or(Cell::Empty),
    );
    row
}

/// A row without process name, ending the sheet.
pub fn terminator_row() -> Row {
    Row::new()
        .with(COL_ACTIVITY_NAME, Cell::Empty)
        .with(COL_PARAMETER_NUMBER, Cell::Empty)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Find {
        name: String,
        location: Option<String>,
        database: String,
    },
    FindTech {
        name: String,
        location: Option<String>,
    },
}

/// Wraps a [`MemoryFramework`] and records every lookup.
pub struct RecordingFramework {
    pub inner: MemoryFramework,
    pub calls: RefCell<Vec<Call>>,
}

impl RecordingFramework {
    pub fn new(inner: MemoryFramework) -> Self {
        Self {
            inner,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl LcaFramework for RecordingFramework {
    fn find_activity(
        &self,
        name: &str,
        location: Option<&str>,
        database: &str,
    ) -> Result<ActivityKey, FrameworkError> {
        self.calls.borrow_mut().push(Call::Find {
            name: name.to_string(),
            location: location.map(str::to_string),
            database: database.to_string(),
        });
        self.inner.find_activity(name, location, database)
    }

    fn find_tech_activity(
        &self,
        name: &str,
        location: Option<&str>,
    ) -> Result<ActivityKey, FrameworkError> {
        self.calls.borrow_mut().push(Call::FindTech {
            name: name.to_string(),
            location: location.map(str::to_string),
        });
        self.inner.find_tech_activity(name, location)
    }

    fn new_parameter(&mut self, parameter: &Parameter) -> Result<(), FrameworkError> {
        self.inner.new_parameter(parameter)
    }

    fn new_activity(
        &mut self,
        database: &str,
        name: &str,
        unit: &str,
        location: Option<&str>,
        exchanges: &ExchangeMap,
    ) -> Result<ActivityKey, FrameworkError> {
        self.inner
            .new_activity(database, name, unit, location, exchanges)
    }

    fn copy_activity(
        &mut self,
        database: &str,
        original: &ActivityKey,
        new_name: &str,
    ) -> Result<ActivityKey, FrameworkError> {
        self.inner.copy_activity(database, original, new_name)
    }

    fn update_exchanges(
        &mut self,
        activity: &ActivityKey,
        updates: &[(ExchangeSelector, Expr)],
    ) -> Result<(), FrameworkError> {
        self.inner.update_exchanges(activity, updates)
    }
}

/// Cell written into a fixture workbook.
pub enum Xl {
    S(&'static str),
    N(f64),
    Blank,
}

/// Writes a workbook where each sheet is `(name, headers, rows)`.
pub fn write_workbook(path: &Path, sheets: &[(&str, &[&str], Vec<Vec<Xl>>)]) {
    let mut workbook = Workbook::new();
    for (name, headers, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).expect("sheet name");
        for (col, header) in headers.iter().enumerate() {
            worksheet
                .write_string(0, col as u16, *header)
                .expect("header written");
        }
        for (row_idx, row) in rows.iter().enumerate() {
            let row_num = (row_idx + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                match cell {
                    Xl::S(value) => {
                        worksheet
                            .write_string(row_num, col as u16, *value)
                            .expect("cell written");
                    }
                    Xl::N(value) => {
                        worksheet
                            .write_number(row_num, col as u16, *value)
                            .expect("cell written");
                    }
                    Xl::Blank => {}
                }
            }
        }
    }
    workbook.save(path).expect("workbook saved");
}
