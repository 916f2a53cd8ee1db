use std::fmt;

use tracing::{debug, warn};

use crate::lca::sheets::framework::{FrameworkError, LcaFramework};
use crate::lca::sheets::model::{
    ActivityKey, COL_ACTIVITY_NAME, COL_CUSTOM_PROCESS, COL_LOCATION, COL_MODIFIED_PROCESS, Row,
};

/// What a sheet row asks to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityQuery {
    pub name: String,
    pub location: Option<String>,
    pub custom_process: Option<String>,
    pub modified_activity: Option<String>,
}

impl ActivityQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
            custom_process: None,
            modified_activity: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn custom(mut self, name: impl Into<String>) -> Self {
        self.custom_process = Some(name.into());
        self
    }

    pub fn modified(mut self, name: impl Into<String>) -> Self {
        self.modified_activity = Some(name.into());
        self
    }

    /// Reads the query from an activity row; `None` when the row has no
    /// process name.
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            name: row.text(COL_ACTIVITY_NAME)?,
            location: row.text(COL_LOCATION),
            custom_process: row.text(COL_CUSTOM_PROCESS),
            modified_activity: row.text(COL_MODIFIED_PROCESS),
        })
    }
}

/// The lookup that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Modified,
    Custom,
    Base,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Modified => f.write_str("modified activity"),
            Strategy::Custom => f.write_str("custom process"),
            Strategy::Base => f.write_str("base database"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub activity: ActivityKey,
    pub strategy: Strategy,
}

/// Every lookup attempted for a query, all of which failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveFailure {
    pub name: String,
    pub attempts: Vec<(Strategy, FrameworkError)>,
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not resolve activity '{}'", self.name)?;
        for (strategy, error) in &self.attempts {
            write!(f, "; {strategy}: {error}")?;
        }
        Ok(())
    }
}

/// Resolves a query: the modified activity first, then the custom process,
/// both in `custom_db`, then the process name in the base database.
pub fn resolve_activity(
    framework: &impl LcaFramework,
    query: &ActivityQuery,
    custom_db: &str,
) -> Result<Resolution, ResolveFailure> {
    let mut attempts = Vec::new();

    let overrides = [
        (Strategy::Modified, query.modified_activity.as_deref()),
        (Strategy::Custom, query.custom_process.as_deref()),
    ];
    for (strategy, name) in overrides {
        let Some(name) = name else { continue };
        match framework.find_activity(name, None, custom_db) {
            Ok(activity) => {
                debug!(%strategy, name, %activity, "activity resolved");
                return Ok(Resolution { activity, strategy });
            }
            Err(error) => {
                warn!(%strategy, name, custom_db, %error, "lookup failed");
                attempts.push((strategy, error));
            }
        }
    }

    match framework.find_tech_activity(&query.name, query.location.as_deref()) {
        Ok(activity) => {
            debug!(name = %query.name, %activity, "activity resolved in base database");
            Ok(Resolution {
                activity,
                strategy: Strategy::Base,
            })
        }
        Err(error) => {
            warn!(
                name = %query.name,
                location = query.location.as_deref().unwrap_or("-"),
                %error,
                "base database lookup failed"
            );
            attempts.push((Strategy::Base, error));
            Err(ResolveFailure {
                name: query.name.clone(),
                attempts,
            })
        }
    }
}
