use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::garden::tools::error::{Result, ToolError};
use crate::garden::tools::io::airtable::DEFAULT_API_URL;
use crate::garden::tools::model::{Field, FieldSet};
use crate::garden::tools::tag::DecodePolicy;

/// Prefix of environment variables overriding the configuration file, e.g.
/// `GARDEN_AIRTABLE__API_KEY`.
pub const ENV_PREFIX: &str = "GARDEN_";

/// Minimum spacing between writes accepted by the hosted service's rate limit.
pub const DEFAULT_WRITE_DELAY_SECS: f64 = 12.0;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub airtable: AirtableConfig,
    #[serde(default)]
    pub sync: SyncSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirtableConfig {
    pub api_key: String,
    pub base_id: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    pub table_name: TableNames,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableNames {
    pub garden_plants: String,
    /// Plant name catalogue; only needed by the catalogue sync.
    #[serde(default)]
    pub plants: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_write_delay")]
    pub write_delay_secs: f64,
    #[serde(default)]
    pub decode_policy: DecodePolicy,
    #[serde(default = "default_diary_path")]
    pub diary_path: PathBuf,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub field_set: FieldSet,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            write_delay_secs: DEFAULT_WRITE_DELAY_SECS,
            decode_policy: DecodePolicy::default(),
            diary_path: default_diary_path(),
            log_file: None,
            log_level: default_log_level(),
            field_set: FieldSet::default(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_write_delay() -> f64 {
    DEFAULT_WRITE_DELAY_SECS
}

fn default_diary_path() -> PathBuf {
    PathBuf::from("data/gardening_web.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl SyncConfig {
    /// Loads the JSON file at `path`, then applies `GARDEN_` environment
    /// overrides. Keys are matched case-insensitively, so the file may use
    /// `API_KEY` / `TABLE_NAME` style keys.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ToolError::MissingInput(path.to_path_buf()));
        }
        let source: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let figment = Figment::from(Serialized::defaults(lowercase_keys(source)))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    /// Builds a configuration from an in-memory JSON document, without
    /// environment overrides.
    pub fn from_json(source: Value) -> Result<Self> {
        Self::from_figment(Figment::from(Serialized::defaults(lowercase_keys(source))))
    }

    /// Extracts and validates a configuration from any figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: SyncConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        require("airtable.API_KEY", &self.airtable.api_key)?;
        require("airtable.BASE_ID", &self.airtable.base_id)?;
        require("airtable.API_URL", &self.airtable.api_url)?;
        require(
            "airtable.TABLE_NAME.GARDEN_PLANTS",
            &self.airtable.table_name.garden_plants,
        )?;
        if let Some(plants) = &self.airtable.table_name.plants {
            require("airtable.TABLE_NAME.PLANTS", plants)?;
        }

        self.write_delay()?;
        validate_field_set(&self.sync.field_set)?;
        Ok(())
    }

    /// Spacing between writes. Fails on negative, non-finite or overflowing
    /// values instead of panicking.
    pub fn write_delay(&self) -> Result<Duration> {
        let delay = self.sync.write_delay_secs;
        Duration::try_from_secs_f64(delay).map_err(|error| {
            ToolError::Config(format!(
                "sync.write_delay_secs is not a usable delay ({delay}): {error}"
            ))
        })
    }

    /// Catalogue table name, required by the catalogue sync.
    pub fn plants_table(&self) -> Result<&str> {
        self.airtable
            .table_name
            .plants
            .as_deref()
            .ok_or_else(|| ToolError::Config("airtable.TABLE_NAME.PLANTS is not set".to_string()))
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ToolError::Config(format!("{name} must not be empty")));
    }
    Ok(())
}

/// Records are keyed on `Plant ID` and `Number`, so both must be written.
/// A compared field that is never written would differ on every run.
fn validate_field_set(field_set: &FieldSet) -> Result<()> {
    for key in [Field::PlantId, Field::Number] {
        if !field_set.submitted.contains(&key) {
            return Err(ToolError::Config(format!("sync.field_set.submitted must include {key}")));
        }
    }
    if let Some(field) = field_set
        .compared
        .iter()
        .find(|field| !field_set.submitted.contains(field))
    {
        return Err(ToolError::Config(format!(
            "sync.field_set compares {field} but never submits it"
        )));
    }
    Ok(())
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key.to_lowercase(), lowercase_keys(value)))
                .collect(),
        ),
        other => other,
    }
}
