//! Which integrations a project uses, and whether each one is configured.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::integrations::storage::IntegrationStorage;
use crate::integrations::types::{
    DatabaseType, IntegrationConfig, IntegrationStatus, IntegrationType, IntegrationWithStatus,
    DATAFRAME_SQL_INTEGRATION_ID,
};
use crate::project::{Block, ProjectProvider};
use crate::sql::connection::to_connection_descriptor;

/// Status for an integration given its stored config, if any.
///
/// Both detection paths classify through here so they always agree.
pub fn classify(config: Option<&IntegrationConfig>) -> IntegrationStatus {
    match config {
        None => IntegrationStatus::Disconnected,
        Some(config) => match to_connection_descriptor(config) {
            Ok(_) => IntegrationStatus::Connected,
            Err(err) => {
                tracing::debug!(id = %config.id, error = %err, "integration cannot connect");
                IntegrationStatus::Error
            }
        },
    }
}

/// Build the status map from the integration references found in `blocks`.
///
/// Used when a project carries no authoritative integration list.
pub async fn scan_blocks_for_integrations<'a>(
    blocks: impl IntoIterator<Item = &'a Block>,
    registry: &IntegrationStorage,
) -> BTreeMap<String, IntegrationWithStatus> {
    let mut integrations = BTreeMap::new();

    for block in blocks {
        let Some(id) = block.sql_integration_id() else {
            continue;
        };
        if id == DATAFRAME_SQL_INTEGRATION_ID || integrations.contains_key(id) {
            continue;
        }

        let config = registry.get_integration_config(id).await;
        let status = classify(config.as_ref());
        let integration_name = config.as_ref().map(|config| config.name.clone());
        let integration_type = config.as_ref().map(IntegrationConfig::integration_type);
        integrations.insert(
            id.to_string(),
            IntegrationWithStatus {
                config,
                status,
                integration_name,
                integration_type,
            },
        );
    }

    integrations
}

pub struct IntegrationDetector {
    registry: Arc<IntegrationStorage>,
    projects: Arc<dyn ProjectProvider>,
}

impl IntegrationDetector {
    pub fn new(registry: Arc<IntegrationStorage>, projects: Arc<dyn ProjectProvider>) -> Self {
        Self { registry, projects }
    }

    /// Integrations used by `project_id`, keyed by id.
    ///
    /// An unknown project yields an empty map.
    pub async fn detect_integrations(
        &self,
        project_id: &str,
    ) -> BTreeMap<String, IntegrationWithStatus> {
        let Some(project) = self.projects.project(project_id) else {
            tracing::debug!(project_id, "project not loaded, no integrations detected");
            return BTreeMap::new();
        };

        let Some(declared) = &project.integrations else {
            tracing::debug!(project_id, "project declares no integrations, scanning blocks");
            return scan_blocks_for_integrations(project.blocks(), &self.registry).await;
        };

        let mut integrations = BTreeMap::new();
        for integration in declared {
            if integration.id == DATAFRAME_SQL_INTEGRATION_ID {
                continue;
            }
            let integration_type: IntegrationType =
                match integration.integration_type.parse::<DatabaseType>() {
                    Ok(database_type) => database_type.integration_type(),
                    Err(_) => {
                        tracing::warn!(
                            id = %integration.id,
                            integration_type = %integration.integration_type,
                            "skipping integration of unsupported type"
                        );
                        continue;
                    }
                };

            let config = self.registry.get_integration_config(&integration.id).await;
            integrations.insert(
                integration.id.clone(),
                IntegrationWithStatus {
                    status: classify(config.as_ref()),
                    config,
                    integration_name: Some(integration.name.clone()),
                    integration_type: Some(integration_type),
                },
            );
        }

        integrations
    }

    /// True if any integration the project uses has no stored config.
    pub async fn has_unconfigured_integrations(&self, project_id: &str) -> bool {
        self.detect_integrations(project_id)
            .await
            .values()
            .any(IntegrationWithStatus::is_disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::types::{IntegrationMetadata, PostgresMetadata};
    use crate::project::{DeepnoteProject, InMemoryProjects};
    use crate::storage::MemoryStore;

    fn postgres(id: &str) -> IntegrationConfig {
        IntegrationConfig::new(
            id,
            "Stored name",
            IntegrationMetadata::Postgres(PostgresMetadata {
                host: "localhost".to_string(),
                port: "5432".to_string(),
                database: "app".to_string(),
                user: "me".to_string(),
                password: "secret".to_string(),
                ssl_enabled: false,
            }),
        )
    }

    fn detector(yaml: &str) -> (Arc<IntegrationStorage>, IntegrationDetector) {
        let registry = Arc::new(IntegrationStorage::new(Arc::new(MemoryStore::new())));
        let project = DeepnoteProject::from_yaml_str(yaml).expect("project should parse");
        let projects: Arc<InMemoryProjects> = Arc::new(std::iter::once(project).collect());
        (registry.clone(), IntegrationDetector::new(registry, projects))
    }

    const DECLARED: &str = r#"
project:
  id: p
  integrations:
    - {id: pg, name: Production, type: pgsql}
    - {id: mongo, name: Mongo, type: mongodb}
    - {id: deepnote-dataframe-sql, name: Dataframes, type: pandas-dataframe}
"#;

    const BLOCKS_ONLY: &str = r#"
project:
  id: p
  notebooks:
    - id: nb
      blocks:
        - {id: b1, type: sql, metadata: {sql_integration_id: pg}}
        - {id: b2, type: sql, metadata: {sql_integration_id: pg}}
        - {id: b3, type: sql, metadata: {sql_integration_id: deepnote-dataframe-sql}}
"#;

    #[tokio::test]
    async fn test_declared_integration_disconnected_then_connected() {
        let (registry, detector) = detector(DECLARED);

        let detected = detector.detect_integrations("p").await;
        assert_eq!(detected.len(), 1);
        let pg = &detected["pg"];
        assert_eq!(pg.status, IntegrationStatus::Disconnected);
        assert_eq!(pg.integration_name.as_deref(), Some("Production"));
        assert_eq!(pg.integration_type, Some(IntegrationType::Postgres));
        assert!(detector.has_unconfigured_integrations("p").await);

        registry.save(postgres("pg")).await.unwrap();

        let detected = detector.detect_integrations("p").await;
        assert_eq!(detected["pg"].status, IntegrationStatus::Connected);
        assert_eq!(detected["pg"].config, Some(postgres("pg")));
        assert!(!detector.has_unconfigured_integrations("p").await);
    }

    #[tokio::test]
    async fn test_fallback_scan_matches_primary_semantics() {
        let (registry, detector) = detector(BLOCKS_ONLY);

        let detected = detector.detect_integrations("p").await;
        assert_eq!(detected.len(), 1);
        assert_eq!(detected["pg"].status, IntegrationStatus::Disconnected);

        registry.save(postgres("pg")).await.unwrap();
        let detected = detector.detect_integrations("p").await;
        assert_eq!(detected["pg"].status, IntegrationStatus::Connected);
    }

    #[tokio::test]
    async fn test_unknown_project_is_empty() {
        let (_registry, detector) = detector(DECLARED);
        assert!(detector.detect_integrations("other").await.is_empty());
        assert!(!detector.has_unconfigured_integrations("other").await);
    }

    #[test]
    fn test_classify_unsupported_auth_is_error() {
        use crate::integrations::types::{SnowflakeAuth, SnowflakeMetadata};
        use serde_json::Map;

        let config = IntegrationConfig::new(
            "sf",
            "Snow",
            IntegrationMetadata::Snowflake(SnowflakeMetadata {
                account_name: "acme".to_string(),
                warehouse: None,
                database: None,
                role: None,
                auth: SnowflakeAuth::AzureAd(Map::new()),
            }),
        );
        assert_eq!(classify(Some(&config)), IntegrationStatus::Error);
        assert_eq!(classify(None), IntegrationStatus::Disconnected);
    }
}
