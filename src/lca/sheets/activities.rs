use tracing::{info, instrument, warn};

use crate::lca::sheets::expr::{self, Expr};
use crate::lca::sheets::framework::{ExchangeMap, ExchangeSelector, LcaFramework};
use crate::lca::sheets::model::{
    ActivityKey, COL_ACTIVITY_NAME, COL_AMOUNT_FORMULA, COL_LOCATION, COL_PARAMETER_NUMBER,
    META_ORIGINAL_NAME, Row, SheetKind, SheetMeta, SheetTable, Workbook, sort_by_priority,
};
use crate::lca::sheets::outcome::{Phase, RowOutcome, SheetOutcome, SheetReport, SkipReason};
use crate::lca::sheets::registry::{ParameterRegistry, RunContext};
use crate::lca::sheets::resolve::{ActivityQuery, resolve_activity};

/// Unit given to custom activities whose metadata names none.
pub const DEFAULT_UNIT: &str = "unit";

/// Builds the custom and modified activities listed in `metadata`, lowest
/// priority first so later sheets can reference earlier ones. Sheets of any
/// other type are reported as failed in the custom phase.
#[instrument(level = "info", skip_all, fields(sheet_count = metadata.len()))]
pub fn create_custom_activities(
    framework: &mut impl LcaFramework,
    context: &RunContext,
    metadata: &[SheetMeta],
    workbook: &Workbook,
) -> Vec<SheetReport> {
    let mut reports = Vec::new();

    for meta in sort_by_priority(metadata) {
        let phase = match &meta.kind {
            SheetKind::Custom => Phase::Custom,
            SheetKind::Modified => Phase::Modified,
            SheetKind::Other(tag) => {
                warn!(sheet = %meta.sheet, kind = %tag, "unsupported sheet type, skipping");
                reports.push(SheetReport::failed(
                    &meta.sheet,
                    Phase::Custom,
                    SkipReason::UnsupportedSheetType(tag.clone()),
                ));
                continue;
            }
        };
        info!(sheet = %meta.sheet, %phase, "processing sheet");

        let Some(sheet) = workbook.sheet(&meta.sheet) else {
            warn!(sheet = %meta.sheet, "sheet listed in metadata is missing from the workbook");
            reports.push(SheetReport::failed(
                &meta.sheet,
                phase,
                SkipReason::MissingSheet(meta.sheet.clone()),
            ));
            continue;
        };

        let report = match phase {
            Phase::Modified => build_modified(&mut *framework, context, meta, sheet),
            _ => build_custom(&mut *framework, context, meta, sheet),
        };
        reports.push(report);
    }

    info!("finished processing all custom and modified sheets");
    reports
}

/// Creates one activity from the summed exchanges of a custom sheet.
pub fn build_custom(
    framework: &mut impl LcaFramework,
    context: &RunContext,
    meta: &SheetMeta,
    sheet: &SheetTable,
) -> SheetReport {
    let mut report = SheetReport::new(&meta.sheet, Phase::Custom);
    let mut accumulated = ExchangeMap::new();
    let (rows, terminator) = sheet.data_rows();

    for (index, row) in rows.iter().enumerate() {
        let outcome = match accumulate_row(&*framework, context, &sheet.name, row, &mut accumulated)
        {
            Ok((input, amount)) => RowOutcome::ExchangeAccumulated {
                row: index,
                input,
                amount,
            },
            Err(reason) => {
                warn!(sheet = %sheet.name, row = index, %reason, "row skipped");
                RowOutcome::Skipped { row: index, reason }
            }
        };
        report.rows.push(outcome);
    }
    report.terminated_at = terminator;

    let unit = meta.unit.as_deref().unwrap_or(DEFAULT_UNIT);
    report.outcome = match framework.new_activity(
        &context.custom_db,
        &meta.sheet,
        unit,
        meta.location.as_deref(),
        &accumulated,
    ) {
        Ok(activity) => {
            info!(sheet = %meta.sheet, %activity, exchange_count = accumulated.len(), "custom activity created");
            SheetOutcome::Created(activity)
        }
        Err(error) => {
            warn!(sheet = %meta.sheet, %error, "failed to create custom activity");
            SheetOutcome::Failed(error.into())
        }
    };
    report
}

fn accumulate_row(
    framework: &impl LcaFramework,
    context: &RunContext,
    sheet: &str,
    row: &Row,
    accumulated: &mut ExchangeMap,
) -> Result<(ActivityKey, Expr), SkipReason> {
    let query = ActivityQuery::from_row(row)
        .ok_or_else(|| SkipReason::MissingField(COL_ACTIVITY_NAME.to_string()))?;
    let resolution =
        resolve_activity(framework, &query, &context.custom_db).map_err(SkipReason::Unresolved)?;
    let amount = row_amount(sheet, row)?.bind(&context.registry)?;

    let input = resolution.activity;
    let total = match accumulated.remove(&input) {
        Some(previous) => previous.sum(amount.clone()),
        None => amount.clone(),
    };
    accumulated.insert(input.clone(), total);
    Ok((input, amount))
}

/// Copies the original activity under the sheet's name and overrides the
/// exchanges listed on the sheet.
pub fn build_modified(
    framework: &mut impl LcaFramework,
    context: &RunContext,
    meta: &SheetMeta,
    sheet: &SheetTable,
) -> SheetReport {
    let mut report = SheetReport::new(&meta.sheet, Phase::Modified);

    let Some(original_name) = meta.original_name.as_deref() else {
        report.outcome =
            SheetOutcome::Failed(SkipReason::MissingField(META_ORIGINAL_NAME.to_string()));
        return report;
    };

    let original =
        match framework.find_tech_activity(original_name, meta.original_location.as_deref()) {
            Ok(original) => original,
            Err(error) => {
                warn!(sheet = %meta.sheet, %error, "skipping copy and update, original not found");
                report.outcome = SheetOutcome::Failed(error.into());
                return report;
            }
        };
    let copy = match framework.copy_activity(&context.custom_db, &original, &meta.sheet) {
        Ok(copy) => copy,
        Err(error) => {
            warn!(sheet = %meta.sheet, %error, "failed to copy activity");
            report.outcome = SheetOutcome::Failed(error.into());
            return report;
        }
    };
    info!(sheet = %meta.sheet, activity = %copy, "copied activity");

    let (rows, terminator) = sheet.data_rows();
    let mut updates: Vec<(ExchangeSelector, Expr)> = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let exchange = exchange_selector(row);
        let outcome = match row_amount(&sheet.name, row).and_then(|amount| {
            amount
                .bind(&context.registry)
                .map_err(SkipReason::from)
        }) {
            Ok(amount) => {
                info!(%exchange, %amount, "replacement amount evaluated");
                updates.push((exchange.clone(), amount.clone()));
                RowOutcome::ExchangeQueued {
                    row: index,
                    exchange,
                    amount,
                }
            }
            Err(reason) => {
                warn!(sheet = %sheet.name, row = index, %exchange, %reason, "exchange skipped");
                RowOutcome::Skipped { row: index, reason }
            }
        };
        report.rows.push(outcome);
    }
    report.terminated_at = terminator;

    report.outcome = match framework.update_exchanges(&copy, &updates) {
        Ok(()) => {
            info!(sheet = %meta.sheet, update_count = updates.len(), "updated exchanges");
            SheetOutcome::Updated(copy)
        }
        Err(error) => {
            warn!(sheet = %meta.sheet, %error, "failed to update exchanges");
            SheetOutcome::PartiallyApplied {
                activity: copy,
                reason: error.into(),
            }
        }
    };
    report
}

/// The exchange a modified-sheet row overrides.
fn exchange_selector(row: &Row) -> ExchangeSelector {
    ExchangeSelector::new(
        row.text(COL_ACTIVITY_NAME).unwrap_or_default(),
        row.text(COL_LOCATION),
    )
}

/// The amount expression of an activity row: its `Amount formula` when given,
/// otherwise a reference to the parameter declared on the same row.
pub fn row_amount(sheet: &str, row: &Row) -> Result<Expr, SkipReason> {
    if let Some(formula) = row.text(COL_AMOUNT_FORMULA) {
        return Ok(expr::parse(&formula)?);
    }
    let number = row
        .text(COL_PARAMETER_NUMBER)
        .ok_or_else(|| SkipReason::MissingField(COL_PARAMETER_NUMBER.to_string()))?;
    Ok(Expr::param(ParameterRegistry::key(sheet, &number)))
}
