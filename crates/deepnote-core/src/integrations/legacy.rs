//! Legacy (unversioned) integration records and their upgrade path.
//!
//! Records written before the versioned envelope existed have flat,
//! type-specific fields and no `version`. They are upgraded lazily, the next
//! time the registry loads them, so [`upgrade_legacy_config`] must stay pure
//! and idempotent.

use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};

use crate::integrations::schema::validate_metadata;
use crate::integrations::types::{DatabaseType, IntegrationConfig, SnowflakeAuthMethod};

/// A persisted record without a `version` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LegacyIntegrationConfig {
    Postgres(LegacyPostgresConfig),
    Bigquery(LegacyBigQueryConfig),
    Snowflake(LegacySnowflakeConfig),
    Duckdb(LegacyDuckDbConfig),
}

impl LegacyIntegrationConfig {
    pub fn id(&self) -> &str {
        match self {
            LegacyIntegrationConfig::Postgres(config) => &config.id,
            LegacyIntegrationConfig::Bigquery(config) => &config.id,
            LegacyIntegrationConfig::Snowflake(config) => &config.id,
            LegacyIntegrationConfig::Duckdb(config) => &config.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LegacyIntegrationConfig::Postgres(config) => &config.name,
            LegacyIntegrationConfig::Bigquery(config) => &config.name,
            LegacyIntegrationConfig::Snowflake(config) => &config.name,
            LegacyIntegrationConfig::Duckdb(config) => &config.name,
        }
    }
}

/// Port as written by older versions: usually a number, occasionally a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LegacyPort {
    Number(u64),
    Text(String),
}

impl LegacyPort {
    fn to_port_string(&self) -> String {
        match self {
            LegacyPort::Number(port) => port.to_string(),
            LegacyPort::Text(port) => port.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPostgresConfig {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: LegacyPort,
    pub database: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub ssl: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBigQueryConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub credentials: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySnowflakeConfig {
    pub id: String,
    pub name: String,
    pub account: String,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// `None` when the field is absent, `Some(None)` for an explicit `null`.
    #[serde(default, deserialize_with = "present")]
    pub auth_method: Option<Option<String>>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub private_key_passphrase: Option<String>,
}

fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegacyDuckDbConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Parse a raw legacy record.
///
/// Returns `None` when the value matches none of the legacy shapes.
pub fn parse_legacy_config(value: &Value) -> Option<LegacyIntegrationConfig> {
    LegacyIntegrationConfig::deserialize(value).ok()
}

/// Map a legacy record onto the current schema.
///
/// Returns `None` when the record cannot be expressed in the current schema
/// or the result fails validation. Never returns a partially filled config.
pub fn upgrade_legacy_config(legacy: &LegacyIntegrationConfig) -> Option<IntegrationConfig> {
    let (database_type, metadata) = match legacy {
        LegacyIntegrationConfig::Postgres(config) => (
            DatabaseType::Pgsql,
            json!({
                "host": config.host,
                "port": config.port.to_port_string(),
                "database": config.database,
                "user": config.username,
                "password": config.password,
                "sslEnabled": config.ssl.unwrap_or(false),
            }),
        ),
        LegacyIntegrationConfig::Bigquery(config) => (
            DatabaseType::BigQuery,
            json!({
                "authMethod": "service-account",
                "service_account": config.credentials,
            }),
        ),
        LegacyIntegrationConfig::Snowflake(config) => {
            (DatabaseType::Snowflake, upgrade_snowflake(config)?)
        }
        LegacyIntegrationConfig::Duckdb(_) => (DatabaseType::PandasDataframe, json!({})),
    };

    let metadata = validate_metadata(database_type, metadata).ok()?;
    Some(IntegrationConfig::new(legacy.id(), legacy.name(), metadata))
}

fn upgrade_snowflake(config: &LegacySnowflakeConfig) -> Option<Value> {
    // Only an explicit null predates the auth-method field; a missing tag is unknown.
    let method = match config.auth_method.as_ref()?.as_deref() {
        None => SnowflakeAuthMethod::Password,
        Some(tag) => tag.parse::<SnowflakeAuthMethod>().ok()?,
    };

    let mut metadata = Map::new();
    metadata.insert("accountName".to_string(), json!(config.account));
    for (field, value) in [
        ("warehouse", &config.warehouse),
        ("database", &config.database),
        ("role", &config.role),
    ] {
        if let Some(value) = value {
            metadata.insert(field.to_string(), json!(value));
        }
    }
    metadata.insert("authMethod".to_string(), json!(method.as_str()));

    match method {
        SnowflakeAuthMethod::Password => {
            metadata.insert("username".to_string(), json!(config.username));
            metadata.insert("password".to_string(), json!(config.password));
        }
        SnowflakeAuthMethod::ServiceAccountKeyPair => {
            metadata.insert("username".to_string(), json!(config.username));
            metadata.insert("privateKey".to_string(), json!(config.private_key));
            if let Some(passphrase) = &config.private_key_passphrase {
                metadata.insert("privateKeyPassphrase".to_string(), json!(passphrase));
            }
        }
        // Never downgrade these to password auth.
        SnowflakeAuthMethod::Okta
        | SnowflakeAuthMethod::NativeSnowflake
        | SnowflakeAuthMethod::AzureAd
        | SnowflakeAuthMethod::KeyPair => return None,
    }

    Some(Value::Object(metadata))
}
