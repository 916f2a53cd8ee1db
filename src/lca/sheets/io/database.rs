use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::lca::sheets::error::{IngestError, Result};
use crate::lca::sheets::expr::Expr;
use crate::lca::sheets::framework::{Activity, Exchange, MemoryFramework};
use crate::lca::sheets::model::{ActivityKey, Parameter};

#[derive(Debug, Deserialize)]
struct BackgroundFile {
    name: String,
    activities: Vec<BackgroundActivity>,
}

#[derive(Debug, Deserialize)]
struct BackgroundActivity {
    code: String,
    name: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default = "default_unit")]
    unit: String,
    #[serde(default)]
    exchanges: Vec<BackgroundExchange>,
}

#[derive(Debug, Deserialize)]
struct BackgroundExchange {
    /// Code of the input activity, in the background database.
    input: String,
    amount: f64,
}

fn default_unit() -> String {
    "unit".to_string()
}

/// Loads a background database from JSON into a fresh [`MemoryFramework`].
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_background(path: &Path) -> Result<MemoryFramework> {
    let source = fs::read_to_string(path)?;
    let framework = parse_background(&source)?;
    info!(
        database = framework.background_name(),
        activity_count = framework.activities(framework.background_name()).count(),
        "background database loaded"
    );
    Ok(framework)
}

/// Parses a background database from its JSON text.
pub fn parse_background(source: &str) -> Result<MemoryFramework> {
    let file: BackgroundFile = serde_json::from_str(source)?;
    let codes: BTreeSet<&str> = file
        .activities
        .iter()
        .map(|activity| activity.code.as_str())
        .collect();
    if codes.len() != file.activities.len() {
        return Err(IngestError::InvalidDatabase(format!(
            "duplicate activity codes in database '{}'",
            file.name
        )));
    }

    let mut framework = MemoryFramework::new(file.name.clone());
    for activity in &file.activities {
        let mut exchanges = Vec::with_capacity(activity.exchanges.len());
        for exchange in &activity.exchanges {
            if !codes.contains(exchange.input.as_str()) {
                return Err(IngestError::InvalidDatabase(format!(
                    "activity '{}' references unknown input '{}'",
                    activity.code, exchange.input
                )));
            }
            exchanges.push(Exchange {
                input: ActivityKey::new(&file.name, &exchange.input),
                amount: Expr::Number(exchange.amount),
            });
        }
        framework.insert_activity(Activity {
            key: ActivityKey::new(&file.name, &activity.code),
            name: activity.name.clone(),
            location: activity.location.clone(),
            unit: activity.unit.clone(),
            exchanges,
        });
    }
    Ok(framework)
}

/// Snapshot of the databases written during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseExport {
    pub databases: Vec<DatabaseDump>,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseDump {
    pub name: String,
    pub activities: Vec<ActivityDump>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityDump {
    pub code: String,
    pub name: String,
    pub location: Option<String>,
    pub unit: String,
    pub exchanges: Vec<ExchangeDump>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeDump {
    pub input: ActivityKey,
    pub input_name: Option<String>,
    /// The amount as written, e.g. `steel_1 + steel_2`.
    pub formula: String,
    /// The amount at parameter defaults, when it can be evaluated.
    pub amount: Option<f64>,
}

/// Collects every database except the background one.
pub fn export_databases(framework: &MemoryFramework) -> DatabaseExport {
    let databases = framework
        .database_names()
        .filter(|name| *name != framework.background_name())
        .map(|name| DatabaseDump {
            name: name.to_string(),
            activities: framework
                .activities(name)
                .map(|activity| dump_activity(framework, activity))
                .collect(),
        })
        .collect();

    DatabaseExport {
        databases,
        parameters: framework.parameters().cloned().collect(),
    }
}

fn dump_activity(framework: &MemoryFramework, activity: &Activity) -> ActivityDump {
    ActivityDump {
        code: activity.key.code.clone(),
        name: activity.name.clone(),
        location: activity.location.clone(),
        unit: activity.unit.clone(),
        exchanges: activity
            .exchanges
            .iter()
            .map(|exchange| ExchangeDump {
                input: exchange.input.clone(),
                input_name: framework
                    .activity(&exchange.input)
                    .map(|input| input.name.clone()),
                formula: exchange.amount.to_string(),
                amount: exchange.amount.evaluate(framework).ok(),
            })
            .collect(),
    }
}

/// Writes the export as pretty-printed JSON.
pub fn write_export(path: &Path, export: &DatabaseExport) -> Result<()> {
    let json = serde_json::to_string_pretty(export)?;
    fs::write(path, json)?;
    Ok(())
}
