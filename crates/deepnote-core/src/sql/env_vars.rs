//! Environment variables carrying connection descriptors into the kernel.
//!
//! Each integration a project uses becomes one `SQL_<NORMALIZED_ID>` variable
//! whose value is the JSON connection descriptor. The built-in DuckDB
//! integration is always present.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::ChangeNotifier;
use crate::integrations::storage::IntegrationStorage;
use crate::integrations::types::{IntegrationConfig, DATAFRAME_SQL_INTEGRATION_ID};
use crate::project::ProjectProvider;
use crate::sql::connection::to_connection_descriptor;

const ENV_VAR_PREFIX: &str = "SQL_";

/// Environment variable name for an integration id.
///
/// ```
/// use deepnote_core::sql::env_var_name;
///
/// assert_eq!(env_var_name("My Production DB"), "SQL_MY_PRODUCTION_DB");
/// assert_eq!(env_var_name("123abc"), "SQL__123ABC");
/// ```
pub fn env_var_name(integration_id: &str) -> String {
    let mut name = String::with_capacity(ENV_VAR_PREFIX.len() + integration_id.len() + 1);
    name.push_str(ENV_VAR_PREFIX);
    if integration_id.starts_with(|c: char| c.is_ascii_digit()) {
        name.push('_');
    }
    name.extend(integration_id.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == '_' {
            c.to_ascii_uppercase()
        } else {
            '_'
        }
    }));
    name
}

/// Fired when previously returned variables may be stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentChange {
    /// Affected resource; `None` means every resource.
    pub resource: Option<String>,
}

/// Resolves the SQL environment variables for a project.
pub struct EnvironmentVariablesProvider {
    registry: Arc<IntegrationStorage>,
    projects: Arc<dyn ProjectProvider>,
    changes: Arc<ChangeNotifier<EnvironmentChange>>,
    forwarder: JoinHandle<()>,
}

impl EnvironmentVariablesProvider {
    /// Create the provider. Must be called inside a Tokio runtime: registry
    /// changes are forwarded by a background task.
    pub fn new(registry: Arc<IntegrationStorage>, projects: Arc<dyn ProjectProvider>) -> Self {
        let changes = Arc::new(ChangeNotifier::new());
        let forwarder = tokio::spawn(forward_registry_changes(
            registry.subscribe(),
            changes.clone(),
        ));
        Self {
            registry,
            projects,
            changes,
            forwarder,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EnvironmentChange> {
        self.changes.subscribe()
    }

    /// Variables for every integration `project_id` uses, plus DuckDB.
    ///
    /// Integrations without a stored config, or whose config cannot be turned
    /// into a connection, are skipped. Once `cancel` fires, whatever has been
    /// resolved so far is returned.
    pub async fn get_environment_variables(
        &self,
        project_id: &str,
        cancel: &CancellationToken,
    ) -> BTreeMap<String, String> {
        let mut variables = BTreeMap::new();
        if cancel.is_cancelled() {
            return variables;
        }

        insert_descriptor(&mut variables, &IntegrationConfig::dataframe_sql());

        let Some(project) = self.projects.project(project_id) else {
            tracing::debug!(project_id, "project not loaded, only dataframe SQL is available");
            return variables;
        };

        for id in project.integration_ids() {
            if cancel.is_cancelled() {
                tracing::debug!(project_id, "environment resolution cancelled");
                break;
            }
            if id == DATAFRAME_SQL_INTEGRATION_ID {
                continue;
            }

            let Some(config) = self.registry.get_integration_config(&id).await else {
                tracing::debug!(id = %id, "no stored config for integration, skipping");
                continue;
            };
            insert_descriptor(&mut variables, &config);
        }

        variables
    }
}

impl Drop for EnvironmentVariablesProvider {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

fn insert_descriptor(variables: &mut BTreeMap<String, String>, config: &IntegrationConfig) {
    let json = match to_connection_descriptor(config).and_then(|descriptor| descriptor.to_json()) {
        Ok(json) => json,
        Err(err) => {
            tracing::warn!(id = %config.id, error = %err, "skipping integration");
            return;
        }
    };

    let name = env_var_name(&config.id);
    if variables.contains_key(&name) {
        tracing::warn!(
            id = %config.id,
            variable = %name,
            "environment variable name already taken by another integration, skipping"
        );
        return;
    }
    variables.insert(name, json);
}

async fn forward_registry_changes(
    mut registry_changes: broadcast::Receiver<()>,
    changes: Arc<ChangeNotifier<EnvironmentChange>>,
) {
    loop {
        match registry_changes.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                changes.notify(EnvironmentChange { resource: None });
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
