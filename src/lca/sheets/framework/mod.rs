//! The seam towards the LCA modelling framework that owns activities and
//! parameters.

mod memory;

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::lca::sheets::expr::Expr;
use crate::lca::sheets::model::{ActivityKey, Parameter};

pub use memory::{Activity, Exchange, MemoryFramework};

/// Accumulated exchanges of an activity being built: input → amount.
pub type ExchangeMap = BTreeMap<ActivityKey, Expr>;

/// Picks the exchange of an activity whose input is named `name`, at
/// `location` when one is given. Wildcards are allowed in `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSelector {
    pub name: String,
    pub location: Option<String>,
}

impl ExchangeSelector {
    pub fn new(name: impl Into<String>, location: Option<String>) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }
}

impl fmt::Display for ExchangeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "'{}' at '{location}'", self.name),
            None => write!(f, "'{}'", self.name),
        }
    }
}

/// Failures reported by the framework.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameworkError {
    #[error("unknown database '{0}'")]
    UnknownDatabase(String),

    #[error("no activity named '{name}'{} in database '{database}'", location_suffix(.location))]
    NotFound {
        name: String,
        location: Option<String>,
        database: String,
    },

    #[error("{count} activities match '{name}'{} in database '{database}'", location_suffix(.location))]
    Ambiguous {
        name: String,
        location: Option<String>,
        database: String,
        count: usize,
    },

    #[error("unknown activity {0}")]
    UnknownActivity(ActivityKey),

    #[error("activity {0} already exists")]
    DuplicateActivity(ActivityKey),

    #[error("parameter '{0}' already exists")]
    DuplicateParameter(String),

    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("no exchange of {activity} matches {exchange}")]
    NoMatchingExchange {
        activity: ActivityKey,
        exchange: ExchangeSelector,
    },

    #[error("{count} exchanges of {activity} match {exchange}")]
    AmbiguousExchange {
        activity: ActivityKey,
        exchange: ExchangeSelector,
        count: usize,
    },
}

fn location_suffix(location: &Option<String>) -> String {
    match location {
        Some(location) => format!(" at location '{location}'"),
        None => String::new(),
    }
}

/// Operations the builders need from an LCA modelling framework.
///
/// Lookups take `&self`; everything that writes takes `&mut self`. All calls
/// are synchronous.
pub trait LcaFramework {
    /// Finds exactly one activity by name (and location, when given) in `database`.
    fn find_activity(
        &self,
        name: &str,
        location: Option<&str>,
        database: &str,
    ) -> Result<ActivityKey, FrameworkError>;

    /// Finds exactly one activity in the base (technosphere) database.
    fn find_tech_activity(
        &self,
        name: &str,
        location: Option<&str>,
    ) -> Result<ActivityKey, FrameworkError>;

    /// Declares a new parameter.
    fn new_parameter(&mut self, parameter: &Parameter) -> Result<(), FrameworkError>;

    /// Creates an activity in `database` with the given exchanges.
    fn new_activity(
        &mut self,
        database: &str,
        name: &str,
        unit: &str,
        location: Option<&str>,
        exchanges: &ExchangeMap,
    ) -> Result<ActivityKey, FrameworkError>;

    /// Copies `original` into `database` under `new_name`, exchanges included.
    fn copy_activity(
        &mut self,
        database: &str,
        original: &ActivityKey,
        new_name: &str,
    ) -> Result<ActivityKey, FrameworkError>;

    /// Replaces the amounts of existing exchanges. Nothing is written unless
    /// every selector matches exactly one exchange.
    fn update_exchanges(
        &mut self,
        activity: &ActivityKey,
        updates: &[(ExchangeSelector, Expr)],
    ) -> Result<(), FrameworkError>;
}
