use tracing::{info, instrument, warn};

use crate::lca::sheets::framework::LcaFramework;
use crate::lca::sheets::model::{
    COL_DEFAULT, COL_DESCRIPTION, COL_DISTRIB, COL_LABEL, COL_MAX, COL_MIN, COL_PARAMETER_NUMBER,
    COL_STD, COL_TYPE, COL_VALUES, COL_WEIGHTS, Cell, Distribution, EnumValue, ParamKind,
    Parameter, Row, SheetTable,
};
use crate::lca::sheets::outcome::{Phase, RowOutcome, SheetReport, SkipReason};
use crate::lca::sheets::registry::{ParameterRegistry, RunContext};

/// Creates the parameters declared on `sheet` and registers them in the run
/// context. Stops at the first row without a process name.
#[instrument(level = "info", skip_all, fields(sheet = %sheet.name))]
pub fn process_parameters(
    framework: &mut impl LcaFramework,
    context: &mut RunContext,
    sheet: &SheetTable,
) -> SheetReport {
    let mut report = SheetReport::new(&sheet.name, Phase::Parameters);
    let (rows, terminator) = sheet.data_rows();

    for (index, row) in rows.iter().enumerate() {
        let result = match build_parameter(&sheet.name, row) {
            Ok(parameter) => register(&mut *framework, &mut context.registry, parameter),
            Err(reason) => Err(reason),
        };
        let outcome = match result {
            Ok(name) => {
                info!(row = index, %name, "parameter created and registered");
                RowOutcome::ParameterRegistered { row: index, name }
            }
            Err(reason) => {
                warn!(row = index, %reason, "parameter row skipped");
                RowOutcome::Skipped { row: index, reason }
            }
        };
        report.rows.push(outcome);
    }

    if let Some(index) = terminator {
        info!(row = index, "stopping at row without process name");
    }
    report.terminated_at = terminator;
    report
}

fn register(
    framework: &mut impl LcaFramework,
    registry: &mut ParameterRegistry,
    parameter: Parameter,
) -> Result<String, SkipReason> {
    if registry.contains(&parameter.name) {
        return Err(SkipReason::DuplicateParameter(parameter.name));
    }
    framework.new_parameter(&parameter)?;
    let name = parameter.name.clone();
    registry
        .register(parameter)
        .map_err(|parameter| SkipReason::DuplicateParameter(parameter.name))?;
    Ok(name)
}

/// Reads one parameter definition from a sheet row.
pub fn build_parameter(sheet: &str, row: &Row) -> Result<Parameter, SkipReason> {
    let number = row
        .text(COL_PARAMETER_NUMBER)
        .ok_or_else(|| SkipReason::MissingField(COL_PARAMETER_NUMBER.to_string()))?;
    let name = ParameterRegistry::key(sheet, &number);
    let type_tag = row
        .text(COL_TYPE)
        .map(|tag| tag.to_lowercase())
        .unwrap_or_default();

    let kind = match type_tag.as_str() {
        "float" => float_kind(row)?,
        "bool" => ParamKind::Bool {
            default: bool_cell(row, COL_DEFAULT)?,
        },
        "enum" => enum_kind(row)?,
        other => return Err(SkipReason::UnsupportedType(other.to_string())),
    };

    let description = row.text(COL_DESCRIPTION);
    let label = match kind {
        ParamKind::Enum { .. } => None,
        _ => row.text(COL_LABEL),
    };
    Ok(Parameter {
        name,
        kind,
        description,
        label,
    })
}

fn float_kind(row: &Row) -> Result<ParamKind, SkipReason> {
    let default = optional_number(row, COL_DEFAULT)?
        .ok_or_else(|| SkipReason::MissingField(COL_DEFAULT.to_string()))?;
    let distribution = match row.text(COL_DISTRIB) {
        Some(name) => {
            let distribution = Distribution::from_name(&name);
            if distribution.is_none() {
                warn!(distribution = %name, "unknown distribution, using default");
            }
            distribution
        }
        None => None,
    };
    Ok(ParamKind::Float {
        default,
        min: optional_number(row, COL_MIN)?,
        max: optional_number(row, COL_MAX)?,
        std: optional_number(row, COL_STD)?,
        distribution,
    })
}

fn enum_kind(row: &Row) -> Result<ParamKind, SkipReason> {
    let raw_values = row
        .text(COL_VALUES)
        .ok_or_else(|| SkipReason::MissingField(COL_VALUES.to_string()))?;
    let values = parse_list_literal(&raw_values)
        .map_err(|message| SkipReason::invalid(COL_VALUES, &raw_values, message))?;
    if values.is_empty() {
        return Err(SkipReason::invalid(COL_VALUES, &raw_values, "empty list"));
    }

    let weights = match row.text(COL_WEIGHTS) {
        Some(raw_weights) => {
            let items = parse_list_literal(&raw_weights)
                .map_err(|message| SkipReason::invalid(COL_WEIGHTS, &raw_weights, message))?;
            let weights = items
                .iter()
                .map(|item| item.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| SkipReason::invalid(COL_WEIGHTS, &raw_weights, "not a number list"))?;
            if weights.len() != values.len() {
                return Err(SkipReason::invalid(
                    COL_WEIGHTS,
                    &raw_weights,
                    format!("{} weights for {} values", weights.len(), values.len()),
                ));
            }
            Some(weights)
        }
        None => None,
    };

    let default = row
        .text(COL_DEFAULT)
        .ok_or_else(|| SkipReason::MissingField(COL_DEFAULT.to_string()))?;

    let values = values
        .into_iter()
        .enumerate()
        .map(|(index, value)| EnumValue {
            value,
            weight: weights.as_ref().map(|weights| weights[index]),
        })
        .collect();
    Ok(ParamKind::Enum { values, default })
}

fn optional_number(row: &Row, column: &str) -> Result<Option<f64>, SkipReason> {
    match row.get(column) {
        None => Ok(None),
        Some(cell) if cell.is_missing() => Ok(None),
        Some(cell) => cell
            .as_number()
            .map(Some)
            .ok_or_else(|| SkipReason::invalid(column, cell, "not a number")),
    }
}

fn bool_cell(row: &Row, column: &str) -> Result<bool, SkipReason> {
    let cell = row
        .get(column)
        .filter(|cell| !cell.is_missing())
        .ok_or_else(|| SkipReason::MissingField(column.to_string()))?;
    match cell {
        Cell::Bool(value) => Ok(*value),
        Cell::Number(value) if *value == 0.0 || *value == 1.0 => Ok(*value == 1.0),
        Cell::Text(text) => match text.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(SkipReason::invalid(column, cell, "not a boolean")),
        },
        _ => Err(SkipReason::invalid(column, cell, "not a boolean")),
    }
}

/// Splits a list literal such as `['steel', "wood, raw", 3]` into its items.
/// Brackets or parentheses around the list are optional; quotes around an
/// item are removed.
pub fn parse_list_literal(source: &str) -> Result<Vec<String>, String> {
    let trimmed = source.trim();
    let inner = match (trimmed.chars().next(), trimmed.chars().last()) {
        (Some('['), Some(']')) | (Some('('), Some(')')) if trimmed.len() >= 2 => {
            &trimmed[1..trimmed.len() - 1]
        }
        (Some('[' | '('), _) => return Err("unbalanced brackets".to_string()),
        _ => trimmed,
    };

    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut quoted_item = false;

    for c in inner.chars() {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '\'' | '"' => {
                    if !current.trim().is_empty() {
                        return Err(format!("unexpected quote after '{}'", current.trim()));
                    }
                    current.clear();
                    quote = Some(c);
                    quoted_item = true;
                }
                ',' => {
                    push_item(&mut items, &mut current, quoted_item)?;
                    quoted_item = false;
                }
                _ if quoted_item => {
                    if !c.is_whitespace() {
                        return Err(format!("unexpected character '{c}' after quoted item"));
                    }
                }
                _ => current.push(c),
            },
        }
    }
    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    if quoted_item || !current.trim().is_empty() {
        push_item(&mut items, &mut current, quoted_item)?;
    }
    Ok(items)
}

fn push_item(items: &mut Vec<String>, current: &mut String, quoted: bool) -> Result<(), String> {
    let item = if quoted {
        current.clone()
    } else {
        current.trim().to_string()
    };
    if item.is_empty() && !quoted {
        return Err("empty list item".to_string());
    }
    items.push(item);
    current.clear();
    Ok(())
}
