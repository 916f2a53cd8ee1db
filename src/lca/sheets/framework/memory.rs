use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{ExchangeMap, ExchangeSelector, FrameworkError, LcaFramework};
use crate::lca::sheets::expr::Expr;
use crate::lca::sheets::model::{ActivityKey, Distribution, ParamKind, Parameter, ParameterLookup};

/// An input of an activity with its (possibly parametric) amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub input: ActivityKey,
    pub amount: Expr,
}

/// An activity record held by [`MemoryFramework`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub key: ActivityKey,
    pub name: String,
    pub location: Option<String>,
    pub unit: String,
    pub exchanges: Vec<Exchange>,
}

/// In-process implementation of [`LcaFramework`].
///
/// Activities live in named databases; one of them is the background database
/// searched by [`LcaFramework::find_tech_activity`].
#[derive(Debug, Clone, Default)]
pub struct MemoryFramework {
    background: String,
    databases: BTreeMap<String, BTreeMap<String, Activity>>,
    parameters: BTreeMap<String, Parameter>,
}

impl MemoryFramework {
    /// Creates an empty framework whose background database is `background`.
    pub fn new(background: impl Into<String>) -> Self {
        let background = background.into();
        let mut databases = BTreeMap::new();
        databases.insert(background.clone(), BTreeMap::new());
        Self {
            background,
            databases,
            parameters: BTreeMap::new(),
        }
    }

    pub fn background_name(&self) -> &str {
        &self.background
    }

    /// Inserts (or replaces) an activity as-is. Used to seed databases.
    pub fn insert_activity(&mut self, activity: Activity) {
        self.databases
            .entry(activity.key.database.clone())
            .or_default()
            .insert(activity.key.code.clone(), activity);
    }

    pub fn activity(&self, key: &ActivityKey) -> Option<&Activity> {
        self.databases
            .get(&key.database)
            .and_then(|activities| activities.get(&key.code))
    }

    /// Activities of `database`, ordered by code.
    pub fn activities(&self, database: &str) -> impl Iterator<Item = &Activity> {
        self.databases
            .get(database)
            .into_iter()
            .flat_map(|activities| activities.values())
    }

    pub fn database_names(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    /// Evaluates every exchange of `key` at parameter defaults, keyed by input name.
    pub fn exchange_values(&self, key: &ActivityKey) -> Vec<(String, Option<f64>)> {
        let Some(activity) = self.activity(key) else {
            return Vec::new();
        };
        activity
            .exchanges
            .iter()
            .map(|exchange| {
                let name = self
                    .activity(&exchange.input)
                    .map(|input| input.name.clone())
                    .unwrap_or_else(|| exchange.input.code.clone());
                (name, exchange.amount.evaluate(self).ok())
            })
            .collect()
    }

    fn lookup(
        &self,
        name: &str,
        location: Option<&str>,
        database: &str,
    ) -> Result<ActivityKey, FrameworkError> {
        let activities = self
            .databases
            .get(database)
            .ok_or_else(|| FrameworkError::UnknownDatabase(database.to_string()))?;

        let matches: Vec<&Activity> = activities
            .values()
            .filter(|activity| matches_activity(activity, name, location))
            .collect();

        match matches.as_slice() {
            [single] => Ok(single.key.clone()),
            [] => Err(FrameworkError::NotFound {
                name: name.to_string(),
                location: location.map(str::to_string),
                database: database.to_string(),
            }),
            many => Err(FrameworkError::Ambiguous {
                name: name.to_string(),
                location: location.map(str::to_string),
                database: database.to_string(),
                count: many.len(),
            }),
        }
    }

    fn ensure_absent(&self, key: &ActivityKey) -> Result<(), FrameworkError> {
        if self.activity(key).is_some() {
            return Err(FrameworkError::DuplicateActivity(key.clone()));
        }
        Ok(())
    }
}

impl ParameterLookup for MemoryFramework {
    fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }
}

impl LcaFramework for MemoryFramework {
    fn find_activity(
        &self,
        name: &str,
        location: Option<&str>,
        database: &str,
    ) -> Result<ActivityKey, FrameworkError> {
        self.lookup(name, location, database)
    }

    fn find_tech_activity(
        &self,
        name: &str,
        location: Option<&str>,
    ) -> Result<ActivityKey, FrameworkError> {
        self.lookup(name, location, &self.background)
    }

    fn new_parameter(&mut self, parameter: &Parameter) -> Result<(), FrameworkError> {
        if self.parameters.contains_key(&parameter.name) {
            return Err(FrameworkError::DuplicateParameter(parameter.name.clone()));
        }
        validate_parameter(parameter)?;
        self.parameters
            .insert(parameter.name.clone(), parameter.clone());
        Ok(())
    }

    fn new_activity(
        &mut self,
        database: &str,
        name: &str,
        unit: &str,
        location: Option<&str>,
        exchanges: &ExchangeMap,
    ) -> Result<ActivityKey, FrameworkError> {
        let key = ActivityKey::new(database, activity_code(database, name, location));
        self.ensure_absent(&key)?;
        for input in exchanges.keys() {
            if self.activity(input).is_none() {
                return Err(FrameworkError::UnknownActivity(input.clone()));
            }
        }

        let activity = Activity {
            key: key.clone(),
            name: name.to_string(),
            location: location.map(str::to_string),
            unit: unit.to_string(),
            exchanges: exchanges
                .iter()
                .map(|(input, amount)| Exchange {
                    input: input.clone(),
                    amount: amount.clone(),
                })
                .collect(),
        };
        debug!(%key, exchange_count = activity.exchanges.len(), "activity stored");
        self.insert_activity(activity);
        Ok(key)
    }

    fn copy_activity(
        &mut self,
        database: &str,
        original: &ActivityKey,
        new_name: &str,
    ) -> Result<ActivityKey, FrameworkError> {
        let source = self
            .activity(original)
            .ok_or_else(|| FrameworkError::UnknownActivity(original.clone()))?;
        let key = ActivityKey::new(
            database,
            activity_code(database, new_name, source.location.as_deref()),
        );
        self.ensure_absent(&key)?;

        let copy = Activity {
            key: key.clone(),
            name: new_name.to_string(),
            ..source.clone()
        };
        self.insert_activity(copy);
        Ok(key)
    }

    fn update_exchanges(
        &mut self,
        activity: &ActivityKey,
        updates: &[(ExchangeSelector, Expr)],
    ) -> Result<(), FrameworkError> {
        let target = self
            .activity(activity)
            .ok_or_else(|| FrameworkError::UnknownActivity(activity.clone()))?;

        let mut resolved: Vec<(usize, Expr)> = Vec::with_capacity(updates.len());
        for (selector, amount) in updates {
            let indices: Vec<usize> = target
                .exchanges
                .iter()
                .enumerate()
                .filter(|(_, exchange)| {
                    self.activity(&exchange.input).is_some_and(|input| {
                        matches_activity(input, &selector.name, selector.location.as_deref())
                    })
                })
                .map(|(index, _)| index)
                .collect();
            match indices.as_slice() {
                [index] => resolved.push((*index, amount.clone())),
                [] => {
                    return Err(FrameworkError::NoMatchingExchange {
                        activity: activity.clone(),
                        exchange: selector.clone(),
                    });
                }
                many => {
                    return Err(FrameworkError::AmbiguousExchange {
                        activity: activity.clone(),
                        exchange: selector.clone(),
                        count: many.len(),
                    });
                }
            }
        }

        let target = self
            .databases
            .get_mut(&activity.database)
            .and_then(|activities| activities.get_mut(&activity.code))
            .ok_or_else(|| FrameworkError::UnknownActivity(activity.clone()))?;
        for (index, amount) in resolved {
            target.exchanges[index].amount = amount;
        }
        Ok(())
    }
}

fn activity_code(database: &str, name: &str, location: Option<&str>) -> String {
    let seed = format!("{database}/{name}/{}", location.unwrap_or_default());
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes())
        .simple()
        .to_string()
}

fn matches_activity(activity: &Activity, name: &str, location: Option<&str>) -> bool {
    if !wildcard_match(&name.to_lowercase(), &activity.name.to_lowercase()) {
        return false;
    }
    match location {
        Some(location) => activity
            .location
            .as_deref()
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(location)),
        None => true,
    }
}

/// Matches `text` against `pattern`, where `*` stands for any run of characters.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == text;
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !text.starts_with(first) || text.len() < first.len() + last.len() || !text.ends_with(last)
    {
        return false;
    }
    let mut rest = &text[first.len()..text.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(found) => rest = &rest[found + part.len()..],
            None => return false,
        }
    }
    true
}

fn validate_parameter(parameter: &Parameter) -> Result<(), FrameworkError> {
    let invalid = |message: &str| FrameworkError::InvalidParameter {
        name: parameter.name.clone(),
        message: message.to_string(),
    };

    match &parameter.kind {
        ParamKind::Float {
            default,
            min,
            max,
            std,
            ..
        } => {
            let not_finite = std::iter::once(default)
                .chain([min, max, std].into_iter().flatten())
                .any(|value| !value.is_finite());
            if not_finite {
                return Err(invalid("Default, Min, Max and Std must be finite"));
            }
            let distribution = parameter
                .effective_distribution()
                .unwrap_or(Distribution::Fixed);
            let needs_bounds = matches!(
                distribution,
                Distribution::Linear | Distribution::Triangle | Distribution::Beta
            );
            let needs_std = matches!(
                distribution,
                Distribution::Normal | Distribution::LogNormal | Distribution::Beta
            );
            if needs_bounds && (min.is_none() || max.is_none()) {
                return Err(invalid(&format!("{distribution} distribution requires Min and Max")));
            }
            if needs_std && std.is_none() {
                return Err(invalid(&format!("{distribution} distribution requires Std")));
            }
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(invalid("Min is greater than Max"));
                }
            }
            Ok(())
        }
        ParamKind::Bool { .. } => Ok(()),
        ParamKind::Enum { values, default } => {
            if values.is_empty() {
                return Err(invalid("enum has no values"));
            }
            if !values.iter().any(|candidate| &candidate.value == default) {
                return Err(invalid(&format!("default '{default}' is not one of the values")));
            }
            let bad_weight = values
                .iter()
                .filter_map(|candidate| candidate.weight)
                .any(|weight| !weight.is_finite() || weight < 0.0);
            if bad_weight {
                return Err(invalid("weights must be finite and non-negative"));
            }
            Ok(())
        }
    }
}
