use std::collections::BTreeMap;

use crate::lca::sheets::model::{Parameter, ParameterLookup, format_number};

/// Parameters created during one run, keyed by `<sheet>_<parameter number>`.
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    parameters: BTreeMap<String, Parameter>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composite key of the parameter defined on `number` of `sheet`.
    pub fn key(sheet: &str, number: &str) -> String {
        format!("{sheet}_{number}")
    }

    /// Same as [`ParameterRegistry::key`] for numeric parameter numbers.
    pub fn numeric_key(sheet: &str, number: f64) -> String {
        Self::key(sheet, &format_number(number))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// Registers `parameter` under its name. Keys are write-once: the
    /// parameter is handed back if the name is already taken.
    pub fn register(&mut self, parameter: Parameter) -> Result<(), Parameter> {
        if self.parameters.contains_key(&parameter.name) {
            return Err(parameter);
        }
        self.parameters.insert(parameter.name.clone(), parameter);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }
}

impl ParameterLookup for ParameterRegistry {
    fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.get(name)
    }
}

/// State shared by the builders during one processing run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Database receiving custom, modified and foreground activities.
    pub custom_db: String,
    pub registry: ParameterRegistry,
}

impl RunContext {
    pub fn new(custom_db: impl Into<String>) -> Self {
        Self {
            custom_db: custom_db.into(),
            registry: ParameterRegistry::new(),
        }
    }
}
