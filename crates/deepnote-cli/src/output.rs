//! Output formatting helpers for the CLI.

use std::collections::BTreeMap;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use deepnote_core::integrations::types::{IntegrationMetadata, SNOWFLAKE_ACCOUNT_FIELDS};
use deepnote_core::integrations::{IntegrationConfig, IntegrationStatus, IntegrationWithStatus};
use serde_json::{json, Value};

use crate::constants::REDACTED;

/// Metadata fields that hold credentials.
const SECRET_FIELDS: [&str; 4] = [
    "password",
    "service_account",
    "privateKey",
    "privateKeyPassphrase",
];

fn table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table
}

/// Persisted JSON form of `config` with credential fields masked.
///
/// Snowflake auth methods stored as an untyped map have every non-account
/// field masked, since any of them may be a credential.
pub fn redacted_json(config: &IntegrationConfig) -> anyhow::Result<Value> {
    let opaque_auth = matches!(
        &config.metadata,
        IntegrationMetadata::Snowflake(snowflake) if snowflake.auth.is_opaque()
    );

    let mut value = serde_json::to_value(config)?;
    if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
        for (field, secret) in metadata.iter_mut() {
            let masked = if opaque_auth {
                !SNOWFLAKE_ACCOUNT_FIELDS.contains(&field.as_str())
            } else {
                SECRET_FIELDS.contains(&field.as_str())
            };
            if masked {
                *secret = Value::String(REDACTED.to_string());
            }
        }
    }
    Ok(value)
}

pub fn integrations_table(configs: &[IntegrationConfig]) -> Table {
    let mut table = table(vec!["ID", "NAME", "TYPE"]);
    for config in configs {
        table.add_row(vec![
            config.id.clone(),
            config.name.clone(),
            config.database_type().to_string(),
        ]);
    }
    table
}

pub fn integrations_json(configs: &[IntegrationConfig]) -> Value {
    Value::Array(
        configs
            .iter()
            .map(|config| {
                json!({
                    "id": config.id,
                    "name": config.name,
                    "type": config.database_type().as_str(),
                })
            })
            .collect(),
    )
}

fn status_label(status: IntegrationStatus) -> &'static str {
    match status {
        IntegrationStatus::Connected => "connected",
        IntegrationStatus::Disconnected => "disconnected",
        IntegrationStatus::Error => "error",
    }
}

fn detected_name(entry: &IntegrationWithStatus) -> String {
    entry
        .integration_name
        .clone()
        .or_else(|| entry.config.as_ref().map(|config| config.name.clone()))
        .unwrap_or_default()
}

fn detected_type(entry: &IntegrationWithStatus) -> String {
    entry
        .integration_type
        .or_else(|| entry.config.as_ref().map(IntegrationConfig::integration_type))
        .map(|integration_type| integration_type.to_string())
        .unwrap_or_default()
}

pub fn detection_table(detected: &BTreeMap<String, IntegrationWithStatus>) -> Table {
    let mut table = table(vec!["ID", "NAME", "TYPE", "STATUS"]);
    for (id, entry) in detected {
        table.add_row(vec![
            id.clone(),
            detected_name(entry),
            detected_type(entry),
            status_label(entry.status).to_string(),
        ]);
    }
    table
}

pub fn detection_json(detected: &BTreeMap<String, IntegrationWithStatus>) -> Value {
    Value::Array(
        detected
            .iter()
            .map(|(id, entry)| {
                json!({
                    "id": id,
                    "name": detected_name(entry),
                    "type": detected_type(entry),
                    "status": entry.status,
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepnote_core::integrations::types::{IntegrationMetadata, PostgresMetadata};

    fn postgres() -> IntegrationConfig {
        IntegrationConfig::new(
            "pg",
            "Production",
            IntegrationMetadata::Postgres(PostgresMetadata {
                host: "db".to_string(),
                port: "5432".to_string(),
                database: "app".to_string(),
                user: "me".to_string(),
                password: "hunter22".to_string(),
                ssl_enabled: false,
            }),
        )
    }

    #[test]
    fn test_redacted_json_masks_password() {
        let value = redacted_json(&postgres()).unwrap();

        assert_eq!(value["metadata"]["password"], json!(REDACTED));
        assert_eq!(value["metadata"]["user"], json!("me"));
        assert!(!value.to_string().contains("hunter22"));
    }

    #[test]
    fn test_redacted_json_masks_untyped_snowflake_auth() {
        let config: IntegrationConfig = serde_json::from_value(json!({
            "id": "sf",
            "name": "Snow",
            "type": "snowflake",
            "metadata": {
                "accountName": "acme",
                "warehouse": "wh",
                "authMethod": "okta",
                "clientId": "client",
                "clientSecret": "TOP-SECRET-VALUE"
            },
            "version": 1
        }))
        .unwrap();

        let value = redacted_json(&config).unwrap();

        assert_eq!(value["metadata"]["clientSecret"], json!(REDACTED));
        assert_eq!(value["metadata"]["clientId"], json!(REDACTED));
        assert_eq!(value["metadata"]["accountName"], json!("acme"));
        assert_eq!(value["metadata"]["authMethod"], json!("okta"));
        assert!(!value.to_string().contains("TOP-SECRET-VALUE"));
    }

    #[test]
    fn test_integrations_table_lists_dialect_type() {
        let rendered = integrations_table(&[postgres()]).to_string();
        assert!(rendered.contains("pgsql"));
        assert!(rendered.contains("Production"));
    }

    #[test]
    fn test_detection_json_prefers_declared_name() {
        let mut detected = BTreeMap::new();
        detected.insert(
            "pg".to_string(),
            IntegrationWithStatus {
                config: None,
                status: IntegrationStatus::Disconnected,
                integration_name: Some("Declared".to_string()),
                integration_type: None,
            },
        );

        let value = detection_json(&detected);
        assert_eq!(value[0]["name"], json!("Declared"));
        assert_eq!(value[0]["status"], json!("disconnected"));
    }
}
