//! Per-connector metadata validators.
//!
//! Stored records are loosely-typed JSON. They are validated exactly once,
//! when they enter the registry, and only the typed result is trusted
//! downstream.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DeepnoteError, Result};
use crate::integrations::types::{
    BigQueryMetadata, DatabaseType, IntegrationConfig, IntegrationMetadata, PostgresMetadata,
    SnowflakeAuth, SnowflakeMetadata,
};

/// Validate `metadata` against the schema for `database_type`.
pub fn validate_metadata(database_type: DatabaseType, metadata: Value) -> Result<IntegrationMetadata> {
    let metadata = match database_type {
        DatabaseType::Pgsql => IntegrationMetadata::Postgres(parse(database_type, metadata)?),
        DatabaseType::BigQuery => IntegrationMetadata::BigQuery(parse(database_type, metadata)?),
        DatabaseType::Snowflake => IntegrationMetadata::Snowflake(parse(database_type, metadata)?),
        DatabaseType::PandasDataframe => IntegrationMetadata::DuckDb,
    };
    check_metadata(&metadata)?;
    Ok(metadata)
}

/// Re-run the field checks on an already typed config.
///
/// Configs built in code bypass deserialization, so `save` calls this
/// before anything reaches the credential store.
pub fn validate_config(config: &IntegrationConfig) -> Result<()> {
    if config.id.trim().is_empty() {
        return Err(DeepnoteError::Validation(
            "Integration id cannot be empty".to_string(),
        ));
    }
    check_metadata(&config.metadata)
}

fn parse<T: DeserializeOwned>(database_type: DatabaseType, metadata: Value) -> Result<T> {
    serde_json::from_value(metadata).map_err(|e| {
        DeepnoteError::Schema(format!("Invalid {} metadata: {}", database_type, e))
    })
}

fn check_metadata(metadata: &IntegrationMetadata) -> Result<()> {
    match metadata {
        IntegrationMetadata::Postgres(postgres) => check_postgres(postgres),
        IntegrationMetadata::BigQuery(bigquery) => check_bigquery(bigquery),
        IntegrationMetadata::Snowflake(snowflake) => check_snowflake(snowflake),
        IntegrationMetadata::DuckDb => Ok(()),
    }
}

fn non_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DeepnoteError::Schema(format!("Field {} cannot be empty", field)));
    }
    Ok(())
}

fn check_postgres(metadata: &PostgresMetadata) -> Result<()> {
    non_empty(&metadata.host, "host")?;
    non_empty(&metadata.database, "database")?;
    non_empty(&metadata.user, "user")?;
    metadata.port.parse::<u16>().map_err(|_| {
        DeepnoteError::Schema(format!("Field port must be a port number (got {})", metadata.port))
    })?;
    Ok(())
}

fn check_bigquery(metadata: &BigQueryMetadata) -> Result<()> {
    non_empty(&metadata.service_account, "service_account")
}

fn check_snowflake(metadata: &SnowflakeMetadata) -> Result<()> {
    non_empty(&metadata.account_name, "accountName")?;
    match &metadata.auth {
        SnowflakeAuth::Password { username, .. } => non_empty(username, "username"),
        SnowflakeAuth::ServiceAccountKeyPair {
            username,
            private_key,
            ..
        } => {
            non_empty(username, "username")?;
            non_empty(private_key, "privateKey")
        }
        SnowflakeAuth::Okta(_)
        | SnowflakeAuth::NativeSnowflake(_)
        | SnowflakeAuth::AzureAd(_)
        | SnowflakeAuth::KeyPair(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_postgres_metadata_defaults_port() {
        let metadata = validate_metadata(
            DatabaseType::Pgsql,
            json!({"host": "db", "database": "app", "user": "me", "password": "pw"}),
        )
        .unwrap();

        let IntegrationMetadata::Postgres(postgres) = metadata else {
            panic!("expected postgres metadata");
        };
        assert_eq!(postgres.port, "5432");
        assert!(!postgres.ssl_enabled);
    }

    #[test]
    fn test_postgres_rejects_non_numeric_port() {
        let result = validate_metadata(
            DatabaseType::Pgsql,
            json!({"host": "db", "port": "abc", "database": "app", "user": "me", "password": "pw"}),
        );
        assert!(matches!(result, Err(DeepnoteError::Schema(_))));
    }

    #[test]
    fn test_postgres_rejects_missing_field() {
        let result = validate_metadata(DatabaseType::Pgsql, json!({"host": "db"}));
        assert!(result.unwrap_err().to_string().contains("pgsql"));
    }

    #[test]
    fn test_bigquery_requires_service_account_method() {
        let ok = validate_metadata(
            DatabaseType::BigQuery,
            json!({"authMethod": "service-account", "service_account": "{}"}),
        );
        assert!(ok.is_ok());

        let wrong_method = validate_metadata(
            DatabaseType::BigQuery,
            json!({"authMethod": "oauth", "service_account": "{}"}),
        );
        assert!(wrong_method.is_err());
    }

    #[test]
    fn test_snowflake_unknown_auth_method_is_invalid() {
        let result = validate_metadata(
            DatabaseType::Snowflake,
            json!({"accountName": "acme", "authMethod": "magic-link"}),
        );
        assert!(matches!(result, Err(DeepnoteError::Schema(_))));
    }

    #[test]
    fn test_snowflake_key_pair_requires_private_key() {
        let result = validate_metadata(
            DatabaseType::Snowflake,
            json!({
                "accountName": "acme",
                "authMethod": "service-account-key-pair",
                "username": "svc"
            }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_dataframe_metadata_is_ignored() {
        let metadata =
            validate_metadata(DatabaseType::PandasDataframe, json!({"anything": 1})).unwrap();
        assert_eq!(metadata, IntegrationMetadata::DuckDb);
    }

    #[test]
    fn test_validate_config_rejects_blank_id() {
        let config = IntegrationConfig::new("  ", "Blank", IntegrationMetadata::DuckDb);
        assert!(matches!(
            validate_config(&config),
            Err(DeepnoteError::Validation(_))
        ));
    }
}
