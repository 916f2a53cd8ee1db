mod common;

use common::{CUSTOM_DB, background, bg, float_row, terminator_row, text};
use lca_sheets::activities::create_custom_activities;
use lca_sheets::expr::Expr;
use lca_sheets::foreground::create_foreground;
use lca_sheets::framework::{Activity, Exchange, ExchangeSelector, LcaFramework, MemoryFramework};
use lca_sheets::model::{
    COL_AMOUNT_FORMULA, COL_CUSTOM_PROCESS, COL_NEW_ACTIVITY_NAME, SheetKind, SheetMeta,
    SheetTable, Workbook, sort_by_priority,
};
use lca_sheets::outcome::{Phase, RowOutcome, SheetOutcome, SkipReason};
use lca_sheets::params::process_parameters;
use lca_sheets::registry::RunContext;

fn prepare(sheets: Vec<SheetTable>) -> (MemoryFramework, RunContext, Workbook) {
    let mut framework = background();
    let mut context = RunContext::new(CUSTOM_DB);
    for sheet in &sheets {
        process_parameters(&mut framework, &mut context, sheet);
    }
    (framework, context, sheets.into_iter().collect())
}

fn custom(sheet: &str, priority: f64) -> SheetMeta {
    let mut meta = SheetMeta::new(sheet, priority, SheetKind::Custom);
    meta.unit = Some("unit".to_string());
    meta
}

#[test]
fn repeated_activity_amounts_are_summed() {
    let frame = SheetTable::new(
        "Frame",
        vec![
            float_row(1.0, "market for aluminium, primary", Some("GLO"), 2.0),
            float_row(2.0, "market for aluminium, primary", Some("GLO"), 3.0),
            float_row(3.0, "market for electricity, medium voltage", None, 4.0),
        ],
    );
    let (mut framework, context, workbook) = prepare(vec![frame]);

    let reports =
        create_custom_activities(&mut framework, &context, &[custom("Frame", 1.0)], &workbook);

    assert_eq!(reports.len(), 1);
    let SheetOutcome::Created(key) = &reports[0].outcome else {
        panic!("activity not created: {:?}", reports[0].outcome);
    };
    let activity = framework.activity(key).expect("activity stored");
    assert_eq!(activity.name, "Frame");
    assert_eq!(activity.exchanges.len(), 2);

    let aluminium = activity
        .exchanges
        .iter()
        .find(|exchange| exchange.input == bg("alu-glo"))
        .expect("aluminium exchange");
    assert_eq!(aluminium.amount.evaluate(&context.registry), Ok(5.0));
    assert_eq!(aluminium.amount.references(), vec!["Frame_1", "Frame_2"]);
}

#[test]
fn sheets_are_processed_by_ascending_priority() {
    let sheets: Vec<SheetTable> = ["Second", "First", "Third"]
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            SheetTable::new(
                name,
                vec![float_row(
                    index as f64 + 1.0,
                    "market for electricity, medium voltage",
                    None,
                    1.0,
                )],
            )
        })
        .collect();
    let (mut framework, context, workbook) = prepare(sheets);
    let metadata = vec![
        custom("Second", 2.0),
        custom("First", 1.0),
        custom("Third", 3.0),
    ];

    let reports = create_custom_activities(&mut framework, &context, &metadata, &workbook);

    let order: Vec<&str> = reports.iter().map(|report| report.sheet.as_str()).collect();
    assert_eq!(order, vec!["First", "Second", "Third"]);
}

#[test]
fn equal_priorities_keep_listing_order_and_unranked_sheets_go_last() {
    let names = ["Unranked", "Second", "First", "Third"];
    let sheets: Vec<SheetTable> = names
        .into_iter()
        .map(|name| {
            SheetTable::new(
                name,
                vec![float_row(
                    1.0,
                    "market for electricity, medium voltage",
                    None,
                    1.0,
                )],
            )
        })
        .collect();
    let (mut framework, context, workbook) = prepare(sheets);
    let mut unranked = custom("Unranked", 0.0);
    unranked.priority = None;
    let metadata = vec![
        unranked,
        custom("Second", 2.0),
        custom("First", 1.0),
        custom("Third", 2.0),
    ];

    let sorted: Vec<&str> = sort_by_priority(&metadata)
        .into_iter()
        .map(|meta| meta.sheet.as_str())
        .collect();
    assert_eq!(sorted, vec!["First", "Second", "Third", "Unranked"]);

    let reports = create_custom_activities(&mut framework, &context, &metadata, &workbook);

    let order: Vec<&str> = reports.iter().map(|report| report.sheet.as_str()).collect();
    assert_eq!(order, vec!["First", "Second", "Third", "Unranked"]);
    assert!(
        reports
            .iter()
            .all(|report| matches!(report.outcome, SheetOutcome::Created(_)))
    );
}

#[test]
fn unsupported_sheet_types_are_reported() {
    let sheet = SheetTable::new(
        "Notes",
        vec![float_row(
            1.0,
            "market for electricity, medium voltage",
            None,
            1.0,
        )],
    );
    let (mut framework, context, workbook) = prepare(vec![sheet]);
    let metadata = vec![SheetMeta::new("Notes", 1.0, SheetKind::parse("Template"))];

    let reports = create_custom_activities(&mut framework, &context, &metadata, &workbook);

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].phase, Phase::Custom);
    assert_eq!(
        reports[0].outcome,
        SheetOutcome::Failed(SkipReason::UnsupportedSheetType("Template".to_string()))
    );
    assert_eq!(framework.activities(CUSTOM_DB).count(), 0);
}

#[test]
fn later_sheets_can_use_earlier_custom_activities() {
    let wheel = SheetTable::new(
        "Wheel",
        vec![float_row(1.0, "market for aluminium, primary", Some("GLO"), 1.2)],
    );
    let bike = SheetTable::new(
        "Bike",
        vec![
            float_row(1.0, "wheel placeholder", None, 2.0)
                .with(COL_CUSTOM_PROCESS, text("Wheel")),
        ],
    );
    let (mut framework, context, workbook) = prepare(vec![wheel, bike]);
    let metadata = vec![custom("Bike", 2.0), custom("Wheel", 1.0)];

    let reports = create_custom_activities(&mut framework, &context, &metadata, &workbook);

    let wheel_key = reports[0].outcome.activity().expect("wheel created").clone();
    let bike_key = reports[1].outcome.activity().expect("bike created");
    let bike = framework.activity(bike_key).expect("bike stored");
    assert_eq!(bike.exchanges[0].input, wheel_key);
}

#[test]
fn unresolved_rows_are_skipped_and_the_sheet_still_builds() {
    let frame = SheetTable::new(
        "Frame",
        vec![
            float_row(1.0, "market for unobtainium", None, 1.0),
            float_row(2.0, "market for aluminium, primary", None, 3.0),
            terminator_row(),
            float_row(4.0, "market for electricity, medium voltage", None, 1.0),
        ],
    );
    let (mut framework, context, workbook) = prepare(vec![frame]);

    let reports =
        create_custom_activities(&mut framework, &context, &[custom("Frame", 1.0)], &workbook);

    let report = &reports[0];
    assert!(matches!(
        report.rows[0].skip_reason(),
        Some(SkipReason::Unresolved(_))
    ));
    assert!(matches!(
        report.rows[1],
        RowOutcome::ExchangeAccumulated { row: 1, .. }
    ));
    assert_eq!(report.terminated_at, Some(2));
    let activity = framework
        .activity(report.outcome.activity().expect("created"))
        .expect("stored");
    assert_eq!(activity.exchanges.len(), 1);
}

#[test]
fn missing_parameters_skip_the_row() {
    let frame = SheetTable::new(
        "Frame",
        vec![
            float_row(1.0, "market for aluminium, primary", None, 3.0)
                .with(COL_AMOUNT_FORMULA, text("Frame_1 * Frame_9")),
        ],
    );
    let (mut framework, context, workbook) = prepare(vec![frame]);

    let reports =
        create_custom_activities(&mut framework, &context, &[custom("Frame", 1.0)], &workbook);

    assert!(matches!(
        reports[0].rows[0].skip_reason(),
        Some(SkipReason::Expression(_))
    ));
    assert!(matches!(reports[0].outcome, SheetOutcome::Created(_)));
}

#[test]
fn sheets_absent_from_the_workbook_fail() {
    let (mut framework, context, workbook) = prepare(Vec::new());

    let reports =
        create_custom_activities(&mut framework, &context, &[custom("Ghost", 1.0)], &workbook);

    assert_eq!(
        reports[0].outcome,
        SheetOutcome::Failed(SkipReason::MissingSheet("Ghost".to_string()))
    );
}

fn modified(sheet: &str) -> SheetMeta {
    let mut meta = SheetMeta::new(sheet, 1.0, SheetKind::Modified);
    meta.original_name = Some("bicycle frame production".to_string());
    meta.original_location = Some("CH".to_string());
    meta
}

#[test]
fn modified_sheet_updates_a_copy_of_the_original() {
    let sheet = SheetTable::new(
        "Light frame",
        vec![
            float_row(1.0, "market for steel, low-alloyed", Some("RER"), 1.5),
            float_row(2.0, "market for electricity, medium voltage", None, 8.0),
        ],
    );
    let (mut framework, context, workbook) = prepare(vec![sheet]);

    let reports =
        create_custom_activities(&mut framework, &context, &[modified("Light frame")], &workbook);

    assert_eq!(reports[0].phase, Phase::Modified);
    let SheetOutcome::Updated(copy) = &reports[0].outcome else {
        panic!("copy not updated: {:?}", reports[0].outcome);
    };
    assert_eq!(
        framework.exchange_values(copy),
        vec![
            ("market for steel, low-alloyed".to_string(), Some(1.5)),
            ("market for aluminium, primary".to_string(), Some(0.5)),
            ("market for electricity, medium voltage".to_string(), Some(8.0)),
        ]
    );
    assert_eq!(
        framework.exchange_values(&bg("frame-ch"))[0],
        ("market for steel, low-alloyed".to_string(), Some(2.0))
    );
    assert_eq!(
        framework.find_activity("Light frame", Some("CH"), CUSTOM_DB),
        Ok(copy.clone())
    );
}

#[test]
fn failed_update_keeps_the_copy() {
    let sheet = SheetTable::new(
        "Light frame",
        vec![float_row(1.0, "market for transport, freight, lorry", None, 1.0)],
    );
    let (mut framework, context, workbook) = prepare(vec![sheet]);

    let reports =
        create_custom_activities(&mut framework, &context, &[modified("Light frame")], &workbook);

    let SheetOutcome::PartiallyApplied { activity, reason } = &reports[0].outcome else {
        panic!("expected a partial outcome: {:?}", reports[0].outcome);
    };
    assert!(matches!(reason, SkipReason::Framework(_)));
    let copy = framework.activity(activity).expect("copy kept");
    assert_eq!(copy.exchanges[0].amount, Expr::Number(2.0));
}

#[test]
fn modified_sheet_without_original_fails() {
    let sheet = SheetTable::new(
        "Light frame",
        vec![float_row(1.0, "market for steel, low-alloyed", Some("RER"), 1.5)],
    );
    let (mut framework, context, workbook) = prepare(vec![sheet]);
    let mut meta = modified("Light frame");
    meta.original_location = Some("US".to_string());

    let reports = create_custom_activities(&mut framework, &context, &[meta], &workbook);

    assert!(matches!(
        reports[0].outcome,
        SheetOutcome::Failed(SkipReason::Framework(_))
    ));
    assert_eq!(framework.activities(CUSTOM_DB).count(), 0);
}

#[test]
fn foreground_rows_each_create_an_activity() {
    let sheet = SheetTable::new(
        "Scenario",
        vec![
            float_row(1.0, "market for aluminium, primary", None, 4.0)
                .with(COL_NEW_ACTIVITY_NAME, text("aluminium use")),
            float_row(2.0, "market for electricity, medium voltage", None, 12.0)
                .with(COL_NEW_ACTIVITY_NAME, text("electricity use")),
            float_row(3.0, "market for transport, freight, lorry", None, 1.0),
            terminator_row(),
            float_row(5.0, "market for aluminium, primary", None, 1.0)
                .with(COL_NEW_ACTIVITY_NAME, text("never built")),
        ],
    );
    let (mut framework, context, _) = prepare(vec![sheet.clone()]);

    let report = create_foreground(&mut framework, &context, &sheet);

    assert_eq!(report.rows.len(), 3);
    assert_eq!(
        report.rows[2].skip_reason(),
        Some(&SkipReason::MissingField(COL_NEW_ACTIVITY_NAME.to_string()))
    );
    assert_eq!(report.terminated_at, Some(3));
    let names: Vec<String> = framework
        .activities(CUSTOM_DB)
        .map(|activity| activity.name.clone())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"aluminium use".to_string()));
    assert!(names.contains(&"electricity use".to_string()));

    let RowOutcome::ActivityCreated { activity, .. } = &report.rows[1] else {
        panic!("expected an activity: {:?}", report.rows[1]);
    };
    let created = framework.activity(activity).expect("stored");
    assert_eq!(created.unit, "unit");
    assert_eq!(created.exchanges[0].amount, Expr::param("Scenario_2"));
    assert_eq!(
        created.exchanges[0].amount.evaluate(&framework),
        Ok(12.0)
    );
}

#[test]
fn modified_exchange_names_may_contain_hash_signs() {
    let mut framework = background();
    framework.insert_activity(Activity {
        key: bg("scrap-2"),
        name: "steel scrap #2".to_string(),
        location: Some("GLO".to_string()),
        unit: "kg".to_string(),
        exchanges: Vec::new(),
    });
    framework.insert_activity(Activity {
        key: bg("wheel-ch"),
        name: "wheel production".to_string(),
        location: Some("CH".to_string()),
        unit: "unit".to_string(),
        exchanges: vec![
            Exchange {
                input: bg("scrap-2"),
                amount: Expr::Number(0.2),
            },
            Exchange {
                input: bg("alu-glo"),
                amount: Expr::Number(1.0),
            },
        ],
    });
    let sheet = SheetTable::new(
        "Recycled wheel",
        vec![float_row(1.0, "steel scrap #2", None, 0.35)],
    );
    let mut context = RunContext::new(CUSTOM_DB);
    process_parameters(&mut framework, &mut context, &sheet);
    let workbook: Workbook = vec![sheet].into_iter().collect();
    let mut meta = SheetMeta::new("Recycled wheel", 1.0, SheetKind::Modified);
    meta.original_name = Some("wheel production".to_string());

    let reports = create_custom_activities(&mut framework, &context, &[meta], &workbook);

    assert!(matches!(
        &reports[0].rows[0],
        RowOutcome::ExchangeQueued { exchange, .. }
            if *exchange == ExchangeSelector::new("steel scrap #2", None)
    ));
    let SheetOutcome::Updated(copy) = &reports[0].outcome else {
        panic!("copy not updated: {:?}", reports[0].outcome);
    };
    assert_eq!(
        framework.exchange_values(copy),
        vec![
            ("steel scrap #2".to_string(), Some(0.35)),
            ("market for aluminium, primary".to_string(), Some(1.0)),
        ]
    );
}
