//! Integration configuration data model.
//!
//! An integration is a named, typed connection to an external database or
//! warehouse, or the built-in DuckDB engine used to query dataframes.
//! Every branch of the model is an enum variant so that adding a new
//! integration type or auth method is a compile error at each `match`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DeepnoteError, Result};

/// Id of the built-in DuckDB integration used to query dataframes with SQL.
///
/// It is always available, never persisted and never editable.
pub const DATAFRAME_SQL_INTEGRATION_ID: &str = "deepnote-dataframe-sql";

/// Current version of the persisted record envelope.
pub const CONFIG_VERSION: u32 = 1;

/// Internal integration kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationType {
    Postgres,
    BigQuery,
    Snowflake,
    DuckDb,
}

impl IntegrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationType::Postgres => "postgres",
            IntegrationType::BigQuery => "bigquery",
            IntegrationType::Snowflake => "snowflake",
            IntegrationType::DuckDb => "duckdb",
        }
    }

    /// Dialect tag used in persisted records and project files.
    pub fn database_type(&self) -> DatabaseType {
        match self {
            IntegrationType::Postgres => DatabaseType::Pgsql,
            IntegrationType::BigQuery => DatabaseType::BigQuery,
            IntegrationType::Snowflake => DatabaseType::Snowflake,
            IntegrationType::DuckDb => DatabaseType::PandasDataframe,
        }
    }
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database dialect tags as they appear in project files and versioned records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatabaseType {
    #[serde(rename = "pgsql")]
    Pgsql,
    #[serde(rename = "big-query")]
    BigQuery,
    #[serde(rename = "snowflake")]
    Snowflake,
    #[serde(rename = "pandas-dataframe")]
    PandasDataframe,
}

impl DatabaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::Pgsql => "pgsql",
            DatabaseType::BigQuery => "big-query",
            DatabaseType::Snowflake => "snowflake",
            DatabaseType::PandasDataframe => "pandas-dataframe",
        }
    }

    pub fn integration_type(&self) -> IntegrationType {
        match self {
            DatabaseType::Pgsql => IntegrationType::Postgres,
            DatabaseType::BigQuery => IntegrationType::BigQuery,
            DatabaseType::Snowflake => IntegrationType::Snowflake,
            DatabaseType::PandasDataframe => IntegrationType::DuckDb,
        }
    }
}

impl FromStr for DatabaseType {
    type Err = DeepnoteError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "pgsql" => Ok(DatabaseType::Pgsql),
            "big-query" => Ok(DatabaseType::BigQuery),
            "snowflake" => Ok(DatabaseType::Snowflake),
            "pandas-dataframe" => Ok(DatabaseType::PandasDataframe),
            other => Err(DeepnoteError::unsupported(other, "unknown integration type")),
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for a PostgreSQL server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostgresMetadata {
    pub host: String,
    #[serde(default = "default_postgres_port")]
    pub port: String,
    pub database: String,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub ssl_enabled: bool,
}

fn default_postgres_port() -> String {
    "5432".to_string()
}

impl fmt::Debug for PostgresMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresMetadata")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_enabled", &self.ssl_enabled)
            .finish()
    }
}

/// BigQuery authentication methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BigQueryAuthMethod {
    #[serde(rename = "service-account")]
    ServiceAccount,
}

/// Service-account credentials for BigQuery.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigQueryMetadata {
    #[serde(rename = "authMethod")]
    pub auth_method: BigQueryAuthMethod,
    /// Raw service-account key JSON, kept as the user pasted it.
    pub service_account: String,
}

impl fmt::Debug for BigQueryMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigQueryMetadata")
            .field("auth_method", &self.auth_method)
            .field("service_account", &"[REDACTED]")
            .finish()
    }
}

/// Snowflake authentication method tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnowflakeAuthMethod {
    Password,
    Okta,
    NativeSnowflake,
    AzureAd,
    KeyPair,
    ServiceAccountKeyPair,
}

impl SnowflakeAuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnowflakeAuthMethod::Password => "password",
            SnowflakeAuthMethod::Okta => "okta",
            SnowflakeAuthMethod::NativeSnowflake => "native-snowflake",
            SnowflakeAuthMethod::AzureAd => "azure-ad",
            SnowflakeAuthMethod::KeyPair => "key-pair",
            SnowflakeAuthMethod::ServiceAccountKeyPair => "service-account-key-pair",
        }
    }
}

impl FromStr for SnowflakeAuthMethod {
    type Err = DeepnoteError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "password" => Ok(SnowflakeAuthMethod::Password),
            "okta" => Ok(SnowflakeAuthMethod::Okta),
            "native-snowflake" => Ok(SnowflakeAuthMethod::NativeSnowflake),
            "azure-ad" => Ok(SnowflakeAuthMethod::AzureAd),
            "key-pair" => Ok(SnowflakeAuthMethod::KeyPair),
            "service-account-key-pair" => Ok(SnowflakeAuthMethod::ServiceAccountKeyPair),
            other => Err(DeepnoteError::Schema(format!(
                "Unknown Snowflake auth method: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SnowflakeAuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snowflake credentials, one variant per auth method.
///
/// Only `Password` and `ServiceAccountKeyPair` can be turned into a
/// connection. The remaining methods are stored verbatim so that a record
/// created elsewhere survives a load/save cycle untouched.
#[derive(Clone, PartialEq)]
pub enum SnowflakeAuth {
    Password {
        username: String,
        password: String,
    },
    ServiceAccountKeyPair {
        username: String,
        private_key: String,
        private_key_passphrase: Option<String>,
    },
    Okta(Map<String, Value>),
    NativeSnowflake(Map<String, Value>),
    AzureAd(Map<String, Value>),
    KeyPair(Map<String, Value>),
}

impl SnowflakeAuth {
    pub fn method(&self) -> SnowflakeAuthMethod {
        match self {
            SnowflakeAuth::Password { .. } => SnowflakeAuthMethod::Password,
            SnowflakeAuth::ServiceAccountKeyPair { .. } => {
                SnowflakeAuthMethod::ServiceAccountKeyPair
            }
            SnowflakeAuth::Okta(_) => SnowflakeAuthMethod::Okta,
            SnowflakeAuth::NativeSnowflake(_) => SnowflakeAuthMethod::NativeSnowflake,
            SnowflakeAuth::AzureAd(_) => SnowflakeAuthMethod::AzureAd,
            SnowflakeAuth::KeyPair(_) => SnowflakeAuthMethod::KeyPair,
        }
    }
}

impl SnowflakeAuth {
    /// Whether the auth fields are kept as an untyped map.
    pub fn is_opaque(&self) -> bool {
        !matches!(
            self,
            SnowflakeAuth::Password { .. } | SnowflakeAuth::ServiceAccountKeyPair { .. }
        )
    }
}

impl fmt::Debug for SnowflakeAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnowflakeAuth::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            SnowflakeAuth::ServiceAccountKeyPair {
                username,
                private_key_passphrase,
                ..
            } => f
                .debug_struct("ServiceAccountKeyPair")
                .field("username", username)
                .field("private_key", &"[REDACTED]")
                .field(
                    "private_key_passphrase",
                    &private_key_passphrase.as_ref().map(|_| "[REDACTED]"),
                )
                .finish(),
            SnowflakeAuth::Okta(fields)
            | SnowflakeAuth::NativeSnowflake(fields)
            | SnowflakeAuth::AzureAd(fields)
            | SnowflakeAuth::KeyPair(fields) => f
                .debug_struct(self.method().as_str())
                .field("fields", &fields.keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}

/// Connection settings for a Snowflake account.
///
/// Serialized as one flat object: the auth method's fields sit next to the
/// account fields, discriminated by `authMethod`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "Map<String, Value>",
    into = "Map<String, Value>"
)]
pub struct SnowflakeMetadata {
    pub account_name: String,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub role: Option<String>,
    pub auth: SnowflakeAuth,
}

/// Snowflake metadata fields that are not part of any auth method.
pub const SNOWFLAKE_ACCOUNT_FIELDS: [&str; 5] =
    ["accountName", "warehouse", "database", "role", "authMethod"];

fn take_string(map: &mut Map<String, Value>, field: &str) -> Result<Option<String>> {
    match map.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(other) => Err(DeepnoteError::Schema(format!(
            "Field {} must be a string (got {})",
            field, other
        ))),
    }
}

fn require_string(map: &mut Map<String, Value>, field: &str) -> Result<String> {
    take_string(map, field)?
        .ok_or_else(|| DeepnoteError::Schema(format!("Missing required field: {}", field)))
}

impl TryFrom<Map<String, Value>> for SnowflakeMetadata {
    type Error = DeepnoteError;

    fn try_from(mut map: Map<String, Value>) -> Result<Self> {
        let account_name = require_string(&mut map, "accountName")?;
        let warehouse = take_string(&mut map, "warehouse")?;
        let database = take_string(&mut map, "database")?;
        let role = take_string(&mut map, "role")?;

        // A missing or null method predates the auth-method field and means password.
        let method = match take_string(&mut map, "authMethod")? {
            Some(tag) => tag.parse::<SnowflakeAuthMethod>()?,
            None => SnowflakeAuthMethod::Password,
        };

        let auth = match method {
            SnowflakeAuthMethod::Password => SnowflakeAuth::Password {
                username: require_string(&mut map, "username")?,
                password: require_string(&mut map, "password")?,
            },
            SnowflakeAuthMethod::ServiceAccountKeyPair => SnowflakeAuth::ServiceAccountKeyPair {
                username: require_string(&mut map, "username")?,
                private_key: require_string(&mut map, "privateKey")?,
                private_key_passphrase: take_string(&mut map, "privateKeyPassphrase")?,
            },
            SnowflakeAuthMethod::Okta => SnowflakeAuth::Okta(map),
            SnowflakeAuthMethod::NativeSnowflake => SnowflakeAuth::NativeSnowflake(map),
            SnowflakeAuthMethod::AzureAd => SnowflakeAuth::AzureAd(map),
            SnowflakeAuthMethod::KeyPair => SnowflakeAuth::KeyPair(map),
        };

        Ok(SnowflakeMetadata {
            account_name,
            warehouse,
            database,
            role,
            auth,
        })
    }
}

impl From<SnowflakeMetadata> for Map<String, Value> {
    fn from(metadata: SnowflakeMetadata) -> Self {
        let method = metadata.auth.method();
        let mut map = match metadata.auth {
            SnowflakeAuth::Password { username, password } => {
                let mut map = Map::new();
                map.insert("username".to_string(), Value::String(username));
                map.insert("password".to_string(), Value::String(password));
                map
            }
            SnowflakeAuth::ServiceAccountKeyPair {
                username,
                private_key,
                private_key_passphrase,
            } => {
                let mut map = Map::new();
                map.insert("username".to_string(), Value::String(username));
                map.insert("privateKey".to_string(), Value::String(private_key));
                if let Some(passphrase) = private_key_passphrase {
                    map.insert(
                        "privateKeyPassphrase".to_string(),
                        Value::String(passphrase),
                    );
                }
                map
            }
            SnowflakeAuth::Okta(fields)
            | SnowflakeAuth::NativeSnowflake(fields)
            | SnowflakeAuth::AzureAd(fields)
            | SnowflakeAuth::KeyPair(fields) => fields
                .into_iter()
                .filter(|(key, _)| !SNOWFLAKE_ACCOUNT_FIELDS.contains(&key.as_str()))
                .collect(),
        };

        map.insert(
            "accountName".to_string(),
            Value::String(metadata.account_name),
        );
        for (field, value) in [
            ("warehouse", metadata.warehouse),
            ("database", metadata.database),
            ("role", metadata.role),
        ] {
            if let Some(value) = value {
                map.insert(field.to_string(), Value::String(value));
            }
        }
        map.insert(
            "authMethod".to_string(),
            Value::String(method.as_str().to_string()),
        );
        map
    }
}

/// Type-specific connection settings.
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrationMetadata {
    Postgres(PostgresMetadata),
    BigQuery(BigQueryMetadata),
    Snowflake(SnowflakeMetadata),
    /// The built-in in-memory DuckDB engine. Carries no settings.
    DuckDb,
}

impl IntegrationMetadata {
    pub fn integration_type(&self) -> IntegrationType {
        match self {
            IntegrationMetadata::Postgres(_) => IntegrationType::Postgres,
            IntegrationMetadata::BigQuery(_) => IntegrationType::BigQuery,
            IntegrationMetadata::Snowflake(_) => IntegrationType::Snowflake,
            IntegrationMetadata::DuckDb => IntegrationType::DuckDb,
        }
    }

    /// Serialize the settings to the JSON object stored under `metadata`.
    pub fn to_value(&self) -> Value {
        let value = match self {
            IntegrationMetadata::Postgres(metadata) => serde_json::to_value(metadata),
            IntegrationMetadata::BigQuery(metadata) => serde_json::to_value(metadata),
            IntegrationMetadata::Snowflake(metadata) => serde_json::to_value(metadata),
            IntegrationMetadata::DuckDb => Ok(Value::Object(Map::new())),
        };
        // Plain string/bool structs always serialize.
        value.unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// A validated integration configuration.
///
/// Persisted as `{id, name, type, metadata, version}`; see
/// [`crate::integrations::schema`] for how records are validated on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfigRecord", into = "ConfigRecord")]
pub struct IntegrationConfig {
    pub id: String,
    pub name: String,
    pub metadata: IntegrationMetadata,
}

impl IntegrationConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, metadata: IntegrationMetadata) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            metadata,
        }
    }

    /// The always-available DuckDB integration for querying dataframes.
    pub fn dataframe_sql() -> Self {
        Self::new(
            DATAFRAME_SQL_INTEGRATION_ID,
            "Dataframe SQL (DuckDB)",
            IntegrationMetadata::DuckDb,
        )
    }

    pub fn integration_type(&self) -> IntegrationType {
        self.metadata.integration_type()
    }

    pub fn database_type(&self) -> DatabaseType {
        self.integration_type().database_type()
    }
}

/// Wire shape of a persisted integration record.
///
/// Only used as the serde proxy for [`IntegrationConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub database_type: DatabaseType,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl TryFrom<ConfigRecord> for IntegrationConfig {
    type Error = DeepnoteError;

    fn try_from(record: ConfigRecord) -> Result<Self> {
        let metadata = crate::integrations::schema::validate_metadata(
            record.database_type,
            record.metadata,
        )?;
        Ok(IntegrationConfig {
            id: record.id,
            name: record.name,
            metadata,
        })
    }
}

impl From<IntegrationConfig> for ConfigRecord {
    fn from(config: IntegrationConfig) -> Self {
        ConfigRecord {
            database_type: config.database_type(),
            metadata: config.metadata.to_value(),
            id: config.id,
            name: config.name,
            version: Some(CONFIG_VERSION),
        }
    }
}

/// Connection state of an integration referenced by a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    /// A stored config exists and can be turned into a connection.
    Connected,
    /// The project references the integration but nothing is stored for it.
    Disconnected,
    /// A config is stored but cannot be turned into a connection.
    Error,
}

/// A project's integration reference joined against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationWithStatus {
    pub config: Option<IntegrationConfig>,
    pub status: IntegrationStatus,
    /// Name declared by the project, used to prefill a configuration form.
    pub integration_name: Option<String>,
    /// Type declared by the project, used to prefill a configuration form.
    pub integration_type: Option<IntegrationType>,
}

impl IntegrationWithStatus {
    pub fn is_disconnected(&self) -> bool {
        self.status == IntegrationStatus::Disconnected
    }
}
