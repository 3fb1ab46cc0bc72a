use std::fs;
use std::time::Duration;

use garden_tools::ToolError;
use garden_tools::config::SyncConfig;
use garden_tools::model::{Field, FieldSet};
use garden_tools::tag::DecodePolicy;
use serde_json::json;
use tempfile::tempdir;

#[test]
fn upper_case_config_layout_loads_with_defaults() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("config.json");
    let source = json!({
        "airtable": {
            "API_KEY": "keyABC",
            "BASE_ID": "appXYZ",
            "TABLE_NAME": { "GARDEN_PLANTS": "Garden Plants", "VARIETIES": "Varieties" }
        }
    });
    fs::write(&path, source.to_string()).expect("config written");

    let config = SyncConfig::load(&path).expect("config loaded");

    assert_eq!(config.airtable.api_key, "keyABC");
    assert_eq!(config.airtable.base_id, "appXYZ");
    assert_eq!(config.airtable.api_url, "https://api.airtable.com/v0");
    assert_eq!(config.airtable.table_name.garden_plants, "Garden Plants");
    assert_eq!(config.airtable.table_name.plants, None);
    assert_eq!(config.write_delay().expect("delay"), Duration::from_secs(12));
    assert_eq!(config.sync.decode_policy, DecodePolicy::Abort);
    assert_eq!(config.sync.field_set, FieldSet::garden());
    assert!(matches!(config.plants_table(), Err(ToolError::Config(_))));
}

#[test]
fn sync_settings_are_configurable() {
    let config = SyncConfig::from_json(json!({
        "airtable": {
            "api_key": "key",
            "base_id": "app",
            "table_name": { "garden_plants": "Garden", "plants": "Plants" }
        },
        "sync": {
            "write_delay_secs": 0.5,
            "decode_policy": "skip",
            "log_level": "debug",
            "field_set": { "compared": ["name"], "submitted": ["plant_id", "number", "name"] }
        }
    }))
    .expect("config");

    assert_eq!(config.write_delay().expect("delay"), Duration::from_millis(500));
    assert_eq!(config.sync.decode_policy, DecodePolicy::Skip);
    assert_eq!(config.sync.log_level, "debug");
    assert_eq!(config.sync.field_set.compared, vec![Field::Name]);
    assert_eq!(config.plants_table().expect("plants table"), "Plants");
}

#[test]
fn missing_credentials_are_rejected() {
    let blank_key = SyncConfig::from_json(json!({
        "airtable": {
            "API_KEY": " ",
            "BASE_ID": "app",
            "TABLE_NAME": { "GARDEN_PLANTS": "Garden" }
        }
    }));
    assert!(matches!(
        blank_key,
        Err(ToolError::Config(message)) if message.contains("API_KEY")
    ));

    let no_table = SyncConfig::from_json(json!({
        "airtable": { "API_KEY": "key", "BASE_ID": "app" }
    }));
    assert!(matches!(no_table, Err(ToolError::Config(_))));
}

#[test]
fn negative_write_delay_is_rejected() {
    let result = SyncConfig::from_json(json!({
        "airtable": {
            "API_KEY": "key",
            "BASE_ID": "app",
            "TABLE_NAME": { "GARDEN_PLANTS": "Garden" }
        },
        "sync": { "write_delay_secs": -1 }
    }));
    assert!(matches!(result, Err(ToolError::Config(_))));
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempdir().expect("temporary directory");
    let missing = dir.path().join("absent.json");
    assert!(matches!(
        SyncConfig::load(&missing),
        Err(ToolError::MissingInput(path)) if path == missing
    ));
}

#[test]
fn overflowing_write_delay_is_rejected() {
    let result = SyncConfig::from_json(json!({
        "airtable": {
            "API_KEY": "key",
            "BASE_ID": "app",
            "TABLE_NAME": { "GARDEN_PLANTS": "Garden" }
        },
        "sync": { "write_delay_secs": 1e30 }
    }));
    assert!(matches!(
        result,
        Err(ToolError::Config(message)) if message.contains("write_delay_secs")
    ));
}

#[test]
fn field_set_without_key_columns_is_rejected() {
    let result = SyncConfig::from_json(json!({
        "airtable": {
            "API_KEY": "key",
            "BASE_ID": "app",
            "TABLE_NAME": { "GARDEN_PLANTS": "Garden" }
        },
        "sync": {
            "field_set": { "compared": ["name"], "submitted": ["plant_id", "name"] }
        }
    }));
    assert!(matches!(
        result,
        Err(ToolError::Config(message)) if message.contains("Number")
    ));
}

#[test]
fn compared_fields_must_be_submitted() {
    let result = SyncConfig::from_json(json!({
        "airtable": {
            "API_KEY": "key",
            "BASE_ID": "app",
            "TABLE_NAME": { "GARDEN_PLANTS": "Garden" }
        },
        "sync": {
            "field_set": {
                "compared": ["name", "location"],
                "submitted": ["plant_id", "number", "name"]
            }
        }
    }));
    assert!(matches!(
        result,
        Err(ToolError::Config(message)) if message.contains("Location")
    ));
}
