//! Restricted arithmetic expressions over parameter references.
//!
//! Exchange amounts are kept symbolic: a row contributes an [`Expr`], custom
//! sheets sum those expressions per input activity, and the framework stores
//! the result. Numeric values are obtained by evaluating an expression at the
//! parameters' default values.

mod parser;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lca::sheets::model::{ParamKind, ParameterLookup};

pub use parser::parse;

/// Errors raised while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("{kind} parameter '{name}' cannot be used as a number")]
    NotNumeric { name: String, kind: String },

    #[error("parameter '{0}' is not an enum")]
    NotAnEnum(String),

    #[error("'{value}' is not a value of enum parameter '{name}'")]
    UnknownEnumValue { name: String, value: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("expression does not evaluate to a finite number")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
            BinaryOp::Pow => 4,
        }
    }
}

/// An exchange-amount expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    /// Reference to a float or bool parameter.
    Param(String),
    /// `1` when the enum parameter takes `value`, else `0`.
    EnumIs { param: String, value: String },
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

const NEG_PRECEDENCE: u8 = 3;
const ATOM_PRECEDENCE: u8 = 5;

impl Expr {
    pub fn param(name: impl Into<String>) -> Self {
        Expr::Param(name.into())
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Sums two amounts, folding constants.
    pub fn sum(self, other: Expr) -> Expr {
        match (self, other) {
            (Expr::Number(a), Expr::Number(b)) => Expr::Number(a + b),
            (Expr::Number(zero), other) | (other, Expr::Number(zero)) if zero == 0.0 => other,
            (lhs, rhs) => Expr::binary(BinaryOp::Add, lhs, rhs),
        }
    }

    /// Names of every parameter the expression refers to, in order of appearance.
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Param(name) | Expr::EnumIs { param: name, .. } => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expr::Neg(inner) => inner.collect_references(names),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_references(names);
                rhs.collect_references(names);
            }
        }
    }

    /// Evaluates the expression with every parameter at its default value.
    pub fn evaluate(&self, params: &impl ParameterLookup) -> Result<f64, ExprError> {
        let value = self.eval_inner(params)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ExprError::NonFinite)
        }
    }

    /// Checks that the expression can be evaluated against `params` and hands
    /// it back unchanged, ready to be stored as an exchange amount.
    pub fn bind(self, params: &impl ParameterLookup) -> Result<Expr, ExprError> {
        self.evaluate(params)?;
        Ok(self)
    }

    fn eval_inner(&self, params: &impl ParameterLookup) -> Result<f64, ExprError> {
        match self {
            Expr::Number(value) => Ok(*value),
            Expr::Param(name) => {
                let parameter = params
                    .parameter(name)
                    .ok_or_else(|| ExprError::UnknownParameter(name.clone()))?;
                match &parameter.kind {
                    ParamKind::Float { default, .. } => Ok(*default),
                    ParamKind::Bool { default } => Ok(if *default { 1.0 } else { 0.0 }),
                    ParamKind::Enum { .. } => Err(ExprError::NotNumeric {
                        name: name.clone(),
                        kind: parameter.kind.type_name().to_string(),
                    }),
                }
            }
            Expr::EnumIs { param, value } => {
                let parameter = params
                    .parameter(param)
                    .ok_or_else(|| ExprError::UnknownParameter(param.clone()))?;
                let ParamKind::Enum { values, default } = &parameter.kind else {
                    return Err(ExprError::NotAnEnum(param.clone()));
                };
                if !values.iter().any(|candidate| &candidate.value == value) {
                    return Err(ExprError::UnknownEnumValue {
                        name: param.clone(),
                        value: value.clone(),
                    });
                }
                Ok(if default == value { 1.0 } else { 0.0 })
            }
            Expr::Neg(inner) => Ok(-inner.eval_inner(params)?),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = lhs.eval_inner(params)?;
                let rhs = rhs.eval_inner(params)?;
                match op {
                    BinaryOp::Add => Ok(lhs + rhs),
                    BinaryOp::Sub => Ok(lhs - rhs),
                    BinaryOp::Mul => Ok(lhs * rhs),
                    BinaryOp::Div if rhs == 0.0 => Err(ExprError::DivisionByZero),
                    BinaryOp::Div => Ok(lhs / rhs),
                    BinaryOp::Pow => Ok(lhs.powf(rhs)),
                }
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Neg(_) => NEG_PRECEDENCE,
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Number(value) if *value < 0.0 => NEG_PRECEDENCE,
            _ => ATOM_PRECEDENCE,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

fn write_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if parser::is_plain_identifier(name) {
        f.write_str(name)
    } else {
        write!(f, "`{name}`")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(value) => f.write_str(&crate::lca::sheets::model::format_number(*value)),
            Expr::Param(name) => write_name(f, name),
            Expr::EnumIs { param, value } => {
                write_name(f, param)?;
                f.write_str(".")?;
                write_name(f, value)
            }
            Expr::Neg(inner) => {
                f.write_str("-")?;
                inner.fmt_operand(f, NEG_PRECEDENCE)
            }
            Expr::Binary { op, lhs, rhs } => {
                let precedence = op.precedence();
                // `^` is right-associative, the others left-associative.
                let (lhs_min, rhs_min) = if *op == BinaryOp::Pow {
                    (precedence + 1, precedence)
                } else {
                    (precedence, precedence + 1)
                };
                lhs.fmt_operand(f, lhs_min)?;
                write!(f, " {} ", op.symbol())?;
                rhs.fmt_operand(f, rhs_min)
            }
        }
    }
}
