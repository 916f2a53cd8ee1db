use lca_sheets::expr::{BinaryOp, Expr, ExprError, parse};
use lca_sheets::model::{EnumValue, ParamKind, Parameter};
use lca_sheets::registry::ParameterRegistry;

fn registry() -> ParameterRegistry {
    let mut registry = ParameterRegistry::new();
    registry
        .register(Parameter::float("Frame_1", 2.0))
        .expect("registered");
    registry
        .register(Parameter::float("Steel sheet_2", 0.5))
        .expect("registered");
    registry
        .register(Parameter::boolean("Frame_3", true))
        .expect("registered");
    registry
        .register(Parameter::new(
            "Frame_4",
            ParamKind::Enum {
                values: vec![
                    EnumValue {
                        value: "steel".to_string(),
                        weight: None,
                    },
                    EnumValue {
                        value: "aluminium".to_string(),
                        weight: None,
                    },
                ],
                default: "aluminium".to_string(),
            },
        ))
        .expect("registered");
    registry
}

fn eval(source: &str) -> Result<f64, ExprError> {
    parse(source)?.evaluate(&registry())
}

#[test]
fn arithmetic_follows_usual_precedence() {
    assert_eq!(eval("1 + 2 * 3"), Ok(7.0));
    assert_eq!(eval("(1 + 2) * 3"), Ok(9.0));
    assert_eq!(eval("-2 ^ 2"), Ok(-4.0));
    assert_eq!(eval("2 ** 3 ** 2"), Ok(512.0));
    assert_eq!(eval("10 / 4 - 1.5e0"), Ok(1.0));
}

#[test]
fn references_evaluate_at_defaults() {
    assert_eq!(eval("Frame_1 * 3"), Ok(6.0));
    assert_eq!(eval("`Steel sheet_2` + Frame_1"), Ok(2.5));
    assert_eq!(eval("Frame_3 * 4"), Ok(4.0));
    assert_eq!(eval("Frame_4.aluminium * 2 + Frame_4.steel"), Ok(2.0));
}

#[test]
fn evaluation_errors_are_explicit() {
    assert_eq!(
        eval("Frame_9"),
        Err(ExprError::UnknownParameter("Frame_9".to_string()))
    );
    assert_eq!(
        eval("Frame_4 + 1"),
        Err(ExprError::NotNumeric {
            name: "Frame_4".to_string(),
            kind: "enum".to_string(),
        })
    );
    assert_eq!(
        eval("Frame_4.wood"),
        Err(ExprError::UnknownEnumValue {
            name: "Frame_4".to_string(),
            value: "wood".to_string(),
        })
    );
    assert_eq!(
        eval("Frame_1.steel"),
        Err(ExprError::NotAnEnum("Frame_1".to_string()))
    );
    assert_eq!(eval("Frame_1 / (Frame_3 - 1)"), Err(ExprError::DivisionByZero));
}

#[test]
fn parse_errors_carry_an_offset() {
    assert!(matches!(parse("1 +"), Err(ExprError::Parse { offset: 3, .. })));
    assert!(matches!(parse("Frame_1 $ 2"), Err(ExprError::Parse { offset: 8, .. })));
    assert!(matches!(parse("(1 + 2"), Err(ExprError::Parse { .. })));
    assert!(matches!(parse("`unterminated"), Err(ExprError::Parse { offset: 0, .. })));
    assert!(matches!(parse("   "), Err(ExprError::Parse { .. })));
    assert!(matches!(parse("1 2"), Err(ExprError::Parse { offset: 2, .. })));
}

#[test]
fn display_reparses_to_the_same_tree() {
    for source in [
        "Frame_1 + 2 * `Steel sheet_2`",
        "(Frame_1 + 2) * 3",
        "-(Frame_1 - 1) ^ 2",
        "Frame_1 - (2 - Frame_3)",
        "Frame_4.steel / 4",
    ] {
        let expr = parse(source).expect("parsed");
        let rendered = expr.to_string();
        assert_eq!(parse(&rendered), Ok(expr), "rendered as {rendered}");
    }
}

#[test]
fn sums_fold_constants() {
    assert_eq!(Expr::Number(2.0).sum(Expr::Number(3.0)), Expr::Number(5.0));
    assert_eq!(
        Expr::Number(0.0).sum(Expr::param("Frame_1")),
        Expr::param("Frame_1")
    );
    assert_eq!(
        Expr::param("Frame_1").sum(Expr::param("Frame_1")),
        Expr::binary(BinaryOp::Add, Expr::param("Frame_1"), Expr::param("Frame_1"))
    );
}

#[test]
fn bind_rejects_unknown_references() {
    let registry = registry();
    assert_eq!(
        Expr::param("Frame_1").bind(&registry),
        Ok(Expr::param("Frame_1"))
    );
    assert_eq!(
        Expr::param("Frame_2").bind(&registry),
        Err(ExprError::UnknownParameter("Frame_2".to_string()))
    );
}

#[test]
fn deeply_nested_formulas_are_rejected() {
    let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
    assert!(matches!(
        parse(&parens),
        Err(ExprError::Parse { message, .. }) if message.contains("nested too deeply")
    ));

    let signs = format!("{}Frame_1", "-".repeat(10_000));
    assert!(matches!(parse(&signs), Err(ExprError::Parse { .. })));

    let powers = vec!["2"; 5_000].join(" ^ ");
    assert!(matches!(parse(&powers), Err(ExprError::Parse { .. })));

    let reasonable = format!("{}Frame_1{}", "(".repeat(100), ")".repeat(100));
    assert_eq!(parse(&reasonable), Ok(Expr::param("Frame_1")));
}

#[test]
fn negative_literals_survive_display() {
    assert_eq!(parse("-2"), Ok(Expr::Number(-2.0)));
    assert_eq!(eval("-2 ^ 2"), Ok(-4.0));

    for expr in [
        Expr::binary(BinaryOp::Add, Expr::param("Frame_1"), Expr::Number(-2.0)),
        Expr::binary(BinaryOp::Pow, Expr::Number(-2.0), Expr::Number(2.0)),
        Expr::binary(BinaryOp::Pow, Expr::Number(2.0), Expr::Number(-0.5)),
        Expr::binary(BinaryOp::Sub, Expr::param("Frame_1"), Expr::Number(-1.5)),
    ] {
        let rendered = expr.to_string();
        assert_eq!(parse(&rendered), Ok(expr), "rendered as {rendered}");
    }
}
