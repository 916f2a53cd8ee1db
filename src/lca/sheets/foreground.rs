use tracing::{info, instrument, warn};

use crate::lca::sheets::activities::{DEFAULT_UNIT, row_amount};
use crate::lca::sheets::framework::{ExchangeMap, LcaFramework};
use crate::lca::sheets::model::{
    ActivityKey, COL_ACTIVITY_NAME, COL_NEW_ACTIVITY_NAME, Row, SheetTable,
};
use crate::lca::sheets::outcome::{Phase, RowOutcome, SheetReport, SkipReason};
use crate::lca::sheets::registry::RunContext;
use crate::lca::sheets::resolve::{ActivityQuery, resolve_activity};

/// Creates one activity per row of a foreground sheet, each with the row's
/// resolved activity as its only exchange.
#[instrument(level = "info", skip_all, fields(sheet = %sheet.name))]
pub fn create_foreground(
    framework: &mut impl LcaFramework,
    context: &RunContext,
    sheet: &SheetTable,
) -> SheetReport {
    let mut report = SheetReport::new(&sheet.name, Phase::Foreground);
    let (rows, terminator) = sheet.data_rows();

    for (index, row) in rows.iter().enumerate() {
        let outcome = match create_row_activity(&mut *framework, context, &sheet.name, row) {
            Ok(activity) => {
                info!(row = index, %activity, "activity created");
                RowOutcome::ActivityCreated {
                    row: index,
                    activity,
                }
            }
            Err(reason) => {
                warn!(row = index, %reason, "skipping activity creation");
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

fn create_row_activity(
    framework: &mut impl LcaFramework,
    context: &RunContext,
    sheet: &str,
    row: &Row,
) -> Result<ActivityKey, SkipReason> {
    let new_name = row
        .text(COL_NEW_ACTIVITY_NAME)
        .ok_or_else(|| SkipReason::MissingField(COL_NEW_ACTIVITY_NAME.to_string()))?;
    let query = ActivityQuery::from_row(row)
        .ok_or_else(|| SkipReason::MissingField(COL_ACTIVITY_NAME.to_string()))?;
    let resolution =
        resolve_activity(&*framework, &query, &context.custom_db).map_err(SkipReason::Unresolved)?;
    let amount = row_amount(sheet, row)?.bind(&context.registry)?;

    let mut exchanges = ExchangeMap::new();
    exchanges.insert(resolution.activity, amount);
    Ok(framework.new_activity(&context.custom_db, &new_name, DEFAULT_UNIT, None, &exchanges)?)
}
