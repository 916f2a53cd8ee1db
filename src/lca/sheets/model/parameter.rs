use std::fmt;

use serde::{Deserialize, Serialize};

/// Probability distribution attached to a float parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    Linear,
    Normal,
    LogNormal,
    Triangle,
    Beta,
    Fixed,
    Statistic,
}

impl Distribution {
    /// Case-insensitive lookup by name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "LINEAR" => Some(Distribution::Linear),
            "NORMAL" => Some(Distribution::Normal),
            "LOGNORMAL" => Some(Distribution::LogNormal),
            "TRIANGLE" => Some(Distribution::Triangle),
            "BETA" => Some(Distribution::Beta),
            "FIXED" => Some(Distribution::Fixed),
            "STATISTIC" => Some(Distribution::Statistic),
            _ => None,
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Distribution::Linear => "linear",
            Distribution::Normal => "normal",
            Distribution::LogNormal => "lognormal",
            Distribution::Triangle => "triangle",
            Distribution::Beta => "beta",
            Distribution::Fixed => "fixed",
            Distribution::Statistic => "statistic",
        };
        f.write_str(name)
    }
}

/// One admissible value of an enum parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub value: String,
    /// Relative probability; `None` when the sheet gives no weights.
    pub weight: Option<f64>,
}

/// Type-specific part of a parameter definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParamKind {
    Float {
        default: f64,
        min: Option<f64>,
        max: Option<f64>,
        std: Option<f64>,
        /// Left unset when the sheet names no known distribution.
        distribution: Option<Distribution>,
    },
    Bool {
        default: bool,
    },
    Enum {
        values: Vec<EnumValue>,
        default: String,
    },
}

impl ParamKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamKind::Float { .. } => "float",
            ParamKind::Bool { .. } => "bool",
            ParamKind::Enum { .. } => "enum",
        }
    }
}

/// A named, typed parameter usable in exchange-amount expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    pub description: Option<String>,
    pub label: Option<String>,
}

impl Parameter {
    pub fn float(name: impl Into<String>, default: f64) -> Self {
        Self::new(
            name,
            ParamKind::Float {
                default,
                min: None,
                max: None,
                std: None,
                distribution: None,
            },
        )
    }

    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self::new(name, ParamKind::Bool { default })
    }

    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            label: None,
        }
    }

    /// The distribution a float parameter is sampled with once defaults are
    /// applied: an explicit choice wins, otherwise `fixed` without bounds and
    /// `linear` with them.
    pub fn effective_distribution(&self) -> Option<Distribution> {
        match &self.kind {
            ParamKind::Float {
                distribution: Some(distribution),
                ..
            } => Some(*distribution),
            ParamKind::Float { min, max, .. } => {
                if min.is_none() && max.is_none() {
                    Some(Distribution::Fixed)
                } else {
                    Some(Distribution::Linear)
                }
            }
            _ => None,
        }
    }
}

/// Read access to parameters by name, used by expression evaluation.
pub trait ParameterLookup {
    fn parameter(&self, name: &str) -> Option<&Parameter>;
}
