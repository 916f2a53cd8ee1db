//! Per-row and per-sheet results of a run.
//!
//! Builders never abort on a bad row or sheet. Every unit of work yields a
//! value here instead, so callers can inspect exactly what was applied and
//! what was skipped.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::lca::sheets::expr::{Expr, ExprError};
use crate::lca::sheets::framework::{ExchangeSelector, FrameworkError};
use crate::lca::sheets::model::ActivityKey;
use crate::lca::sheets::resolve::ResolveFailure;

/// Why a row or sheet was skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("{0}")]
    Unresolved(ResolveFailure),

    #[error("unsupported parameter type: {0}")]
    UnsupportedType(String),

    #[error("missing value in column '{0}'")]
    MissingField(String),

    #[error("invalid value '{value}' in column '{column}': {message}")]
    InvalidField {
        column: String,
        value: String,
        message: String,
    },

    #[error("parameter '{0}' is already registered")]
    DuplicateParameter(String),

    #[error("expression error: {0}")]
    Expression(#[from] ExprError),

    #[error("framework error: {0}")]
    Framework(#[from] FrameworkError),

    #[error("sheet '{0}' not found in workbook")]
    MissingSheet(String),

    #[error("unsupported sheet type '{0}', expected 'custom' or 'modified'")]
    UnsupportedSheetType(String),
}

impl SkipReason {
    pub fn invalid(column: &str, value: impl fmt::Display, message: impl Into<String>) -> Self {
        SkipReason::InvalidField {
            column: column.to_string(),
            value: value.to_string(),
            message: message.into(),
        }
    }
}

/// Result of processing one sheet row. `row` is the zero-based data row index.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    ParameterRegistered {
        row: usize,
        name: String,
    },
    /// An amount was added to the sheet's accumulated exchanges.
    ExchangeAccumulated {
        row: usize,
        input: ActivityKey,
        amount: Expr,
    },
    /// A replacement amount was queued for a modified activity.
    ExchangeQueued {
        row: usize,
        exchange: ExchangeSelector,
        amount: Expr,
    },
    ActivityCreated {
        row: usize,
        activity: ActivityKey,
    },
    Skipped {
        row: usize,
        reason: SkipReason,
    },
}

impl RowOutcome {
    pub fn row(&self) -> usize {
        match self {
            RowOutcome::ParameterRegistered { row, .. }
            | RowOutcome::ExchangeAccumulated { row, .. }
            | RowOutcome::ExchangeQueued { row, .. }
            | RowOutcome::ActivityCreated { row, .. }
            | RowOutcome::Skipped { row, .. } => *row,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RowOutcome::Skipped { .. })
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            RowOutcome::Skipped { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowOutcome::ParameterRegistered { name, .. } => {
                write!(f, "parameter registered: {name}")
            }
            RowOutcome::ExchangeAccumulated { input, amount, .. } => {
                write!(f, "exchange accumulated: {input} += {amount}")
            }
            RowOutcome::ExchangeQueued {
                exchange, amount, ..
            } => write!(f, "exchange queued: {exchange} = {amount}"),
            RowOutcome::ActivityCreated { activity, .. } => {
                write!(f, "activity created: {activity}")
            }
            RowOutcome::Skipped { reason, .. } => write!(f, "skipped: {reason}"),
        }
    }
}

/// Result of the sheet-level step of a builder.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetOutcome {
    /// Parameter and foreground sheets have no sheet-level step.
    RowsOnly,
    Created(ActivityKey),
    /// A modified activity was copied and its exchanges updated.
    Updated(ActivityKey),
    /// The copy exists but the exchange update failed; it is kept as is.
    PartiallyApplied {
        activity: ActivityKey,
        reason: SkipReason,
    },
    Failed(SkipReason),
}

impl SheetOutcome {
    pub fn activity(&self) -> Option<&ActivityKey> {
        match self {
            SheetOutcome::Created(activity)
            | SheetOutcome::Updated(activity)
            | SheetOutcome::PartiallyApplied { activity, .. } => Some(activity),
            SheetOutcome::RowsOnly | SheetOutcome::Failed(_) => None,
        }
    }
}

impl fmt::Display for SheetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetOutcome::RowsOnly => f.write_str("rows processed"),
            SheetOutcome::Created(activity) => write!(f, "activity created: {activity}"),
            SheetOutcome::Updated(activity) => write!(f, "activity updated: {activity}"),
            SheetOutcome::PartiallyApplied { activity, reason } => {
                write!(f, "activity {activity} copied but not updated: {reason}")
            }
            SheetOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Which builder produced a [`SheetReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Parameters,
    Custom,
    Modified,
    Foreground,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Parameters => "parameters",
            Phase::Custom => "custom",
            Phase::Modified => "modified",
            Phase::Foreground => "foreground",
        };
        f.write_str(name)
    }
}

/// Everything that happened while one builder processed one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetReport {
    pub sheet: String,
    pub phase: Phase,
    pub rows: Vec<RowOutcome>,
    /// Index of the row that ended the sheet, if one did.
    pub terminated_at: Option<usize>,
    pub outcome: SheetOutcome,
}

impl SheetReport {
    pub fn new(sheet: impl Into<String>, phase: Phase) -> Self {
        Self {
            sheet: sheet.into(),
            phase,
            rows: Vec::new(),
            terminated_at: None,
            outcome: SheetOutcome::RowsOnly,
        }
    }

    pub fn failed(sheet: impl Into<String>, phase: Phase, reason: SkipReason) -> Self {
        Self {
            outcome: SheetOutcome::Failed(reason),
            ..Self::new(sheet, phase)
        }
    }

    pub fn skipped_rows(&self) -> impl Iterator<Item = &RowOutcome> {
        self.rows.iter().filter(|outcome| outcome.is_skipped())
    }
}

/// Reports of every sheet processed during a run, in processing order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunReport {
    pub sheets: Vec<SheetReport>,
}

impl RunReport {
    pub fn skipped_row_count(&self) -> usize {
        self.sheets
            .iter()
            .map(|sheet| sheet.skipped_rows().count())
            .sum()
    }

    pub fn failed_sheet_count(&self) -> usize {
        self.sheets
            .iter()
            .filter(|sheet| {
                matches!(
                    sheet.outcome,
                    SheetOutcome::Failed(_) | SheetOutcome::PartiallyApplied { .. }
                )
            })
            .count()
    }

    pub fn sheet(&self, name: &str, phase: Phase) -> Option<&SheetReport> {
        self.sheets
            .iter()
            .find(|report| report.sheet == name && report.phase == phase)
    }
}
