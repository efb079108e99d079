//! Integration registry: typed cache over the encrypted credential store.
//!
//! The credential store holds one encrypted record per integration id plus an
//! index record listing every id. The registry owns both exclusively.
//!
//! Loading happens once, lazily. It is the single place where schema drift is
//! absorbed:
//! - legacy (unversioned) records are upgraded and written back
//! - versioned records are validated against their connector schema
//! - corrupt, invalid and unrecoverable records are deleted and dropped from
//!   the index, and never retried
//!
//! After every successful mutation a payload-free change event is fired;
//! subscribers re-query the registry.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex, OnceCell};

use crate::error::{DeepnoteError, Result};
use crate::events::ChangeNotifier;
use crate::integrations::legacy::{parse_legacy_config, upgrade_legacy_config};
use crate::integrations::schema::validate_config;
use crate::integrations::types::{
    IntegrationConfig, IntegrationType, CONFIG_VERSION, DATAFRAME_SQL_INTEGRATION_ID,
};
use crate::storage::SecretStorage;

/// Service name shared by every integration record in the credential store.
pub const INTEGRATION_SERVICE_NAME: &str = "deepnote-integrations";

/// Key of the record listing all stored integration ids.
pub const INTEGRATION_INDEX_KEY: &str = "integrations-index";

type ConfigCache = RwLock<BTreeMap<String, IntegrationConfig>>;

/// Fail if `id` names the built-in dataframe integration.
pub fn ensure_user_editable(id: &str) -> Result<()> {
    if id == DATAFRAME_SQL_INTEGRATION_ID {
        return Err(DeepnoteError::ReservedIntegration(id.to_string()));
    }
    Ok(())
}

/// What the load scan decided about one stored record.
enum RecordOutcome {
    Valid(IntegrationConfig),
    /// Unrecoverable: delete the blob and drop the id from the index.
    Invalid,
    /// Leave the record alone without caching it.
    Skipped,
}

/// Registry of user-configured integrations.
pub struct IntegrationStorage {
    store: Arc<dyn SecretStorage>,
    cache: OnceCell<ConfigCache>,
    // Serializes read-modify-write cycles on the index.
    write_lock: Mutex<()>,
    changes: ChangeNotifier<()>,
}

impl IntegrationStorage {
    pub fn new(store: Arc<dyn SecretStorage>) -> Self {
        Self {
            store,
            cache: OnceCell::new(),
            write_lock: Mutex::new(()),
            changes: ChangeNotifier::new(),
        }
    }

    /// Receive a notification after every successful `save`, `delete` or `clear`.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }

    /// Load the cache now, surfacing index read failures.
    ///
    /// Read accessors swallow these failures; call this first when the caller
    /// needs to tell "nothing stored" apart from "store unreadable".
    pub async fn load(&self) -> Result<()> {
        self.cache().await.map(|_| ())
    }

    /// All valid stored configs, ordered by id.
    pub async fn get_all(&self) -> Vec<IntegrationConfig> {
        match self.cache().await {
            Ok(cache) => cache.read().values().cloned().collect(),
            Err(err) => {
                tracing::error!(error = %err, "failed to load integrations");
                Vec::new()
            }
        }
    }

    pub async fn get_integration_config(&self, id: &str) -> Option<IntegrationConfig> {
        match self.cache().await {
            Ok(cache) => cache.read().get(id).cloned(),
            Err(err) => {
                tracing::error!(error = %err, "failed to load integrations");
                None
            }
        }
    }

    /// Persist `config`, replacing any config with the same id.
    ///
    /// Saving the built-in dataframe integration (by id or by type) is
    /// refused as a logged no-op.
    pub async fn save(&self, config: IntegrationConfig) -> Result<()> {
        if config.id == DATAFRAME_SQL_INTEGRATION_ID
            || config.integration_type() == IntegrationType::DuckDb
        {
            tracing::warn!(
                id = %config.id,
                "refusing to save the built-in dataframe integration"
            );
            return Ok(());
        }
        validate_config(&config)?;

        let cache = self.cache().await?;
        let _guard = self.write_lock.lock().await;

        let record = serde_json::to_string(&config)?;

        // Index first: an indexed id without a blob is repaired on load, a
        // blob without an index entry is unreachable.
        let mut ids = self.read_index().await?.unwrap_or_default();
        if !ids.contains(&config.id) {
            ids.push(config.id.clone());
            self.write_index(&ids).await?;
        }

        self.store
            .store(INTEGRATION_SERVICE_NAME, &config.id, Some(&record))
            .await?;

        tracing::debug!(
            id = %config.id,
            integration_type = %config.integration_type(),
            "saved integration"
        );
        cache.write().insert(config.id.clone(), config);
        self.changes.notify(());
        Ok(())
    }

    /// Remove the config stored under `id`.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if id == DATAFRAME_SQL_INTEGRATION_ID {
            tracing::warn!(id, "refusing to delete the built-in dataframe integration");
            return Ok(());
        }

        let cache = self.cache().await?;
        let _guard = self.write_lock.lock().await;

        self.store.store(INTEGRATION_SERVICE_NAME, id, None).await?;

        let mut ids = self.read_index().await?.unwrap_or_default();
        let before = ids.len();
        ids.retain(|existing| existing != id);
        if ids.len() != before {
            self.write_index(&ids).await?;
        }

        cache.write().remove(id);
        tracing::debug!(id, "deleted integration");
        self.changes.notify(());
        Ok(())
    }

    /// Remove every stored config and the index itself.
    pub async fn clear(&self) -> Result<()> {
        let cache = self.cache().await?;
        let _guard = self.write_lock.lock().await;

        let mut ids: BTreeSet<String> = self
            .read_index()
            .await?
            .unwrap_or_default()
            .into_iter()
            .collect();
        ids.extend(cache.read().keys().cloned());

        for id in &ids {
            self.store.store(INTEGRATION_SERVICE_NAME, id, None).await?;
        }
        self.store
            .store(INTEGRATION_SERVICE_NAME, INTEGRATION_INDEX_KEY, None)
            .await?;

        cache.write().clear();
        tracing::debug!(count = ids.len(), "cleared integrations");
        self.changes.notify(());
        Ok(())
    }

    async fn cache(&self) -> Result<&ConfigCache> {
        self.cache
            .get_or_try_init(|| async { self.load_cache().await.map(RwLock::new) })
            .await
    }

    /// Read the id index. `Ok(None)` means no index has been written yet.
    ///
    /// An unreadable index is treated as empty: the ids it held cannot be
    /// recovered, so there is nothing to fail over to.
    async fn read_index(&self) -> Result<Option<Vec<String>>> {
        let Some(raw) = self
            .store
            .retrieve(INTEGRATION_SERVICE_NAME, INTEGRATION_INDEX_KEY)
            .await?
        else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => Ok(Some(ids)),
            Err(err) => {
                tracing::warn!(error = %err, "integration index is corrupt, treating it as empty");
                Ok(Some(Vec::new()))
            }
        }
    }

    async fn write_index(&self, ids: &[String]) -> Result<()> {
        let raw = serde_json::to_string(ids)?;
        self.store
            .store(INTEGRATION_SERVICE_NAME, INTEGRATION_INDEX_KEY, Some(&raw))
            .await
    }

    async fn load_cache(&self) -> Result<BTreeMap<String, IntegrationConfig>> {
        let mut configs = BTreeMap::new();

        let Some(ids) = self.read_index().await? else {
            tracing::debug!("no integration index stored yet");
            return Ok(configs);
        };

        let mut invalid = Vec::new();
        for id in &ids {
            if id == DATAFRAME_SQL_INTEGRATION_ID {
                continue;
            }

            let raw = match self.store.retrieve(INTEGRATION_SERVICE_NAME, id).await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    tracing::warn!(id = %id, "indexed integration has no stored config");
                    invalid.push(id.clone());
                    continue;
                }
                Err(err) => {
                    // Possibly transient (or a wrong passphrase): keep the record.
                    tracing::error!(id = %id, error = %err, "failed to read integration");
                    continue;
                }
            };

            match self.load_record(id, &raw).await {
                RecordOutcome::Valid(config) => {
                    configs.insert(id.clone(), config);
                }
                RecordOutcome::Invalid => invalid.push(id.clone()),
                RecordOutcome::Skipped => {}
            }
        }

        if !invalid.is_empty() {
            self.purge(&ids, &invalid).await;
        }

        tracing::debug!(
            count = configs.len(),
            dropped = invalid.len(),
            "loaded integrations"
        );
        Ok(configs)
    }

    async fn load_record(&self, id: &str, raw: &str) -> RecordOutcome {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(id, error = %err, "dropping unparsable integration record");
                return RecordOutcome::Invalid;
            }
        };

        let Some(version) = value.get("version") else {
            return self.upgrade_record(id, &value).await;
        };

        match version.as_u64() {
            Some(version) if version == u64::from(CONFIG_VERSION) => {}
            Some(version) if version > u64::from(CONFIG_VERSION) => {
                tracing::warn!(
                    id,
                    version,
                    "integration record was written by a newer version, leaving it untouched"
                );
                return RecordOutcome::Skipped;
            }
            _ => {
                tracing::warn!(id, "dropping integration record with invalid version");
                return RecordOutcome::Invalid;
            }
        }

        let config = match serde_json::from_value::<IntegrationConfig>(value) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(id, error = %err, "dropping schema-invalid integration record");
                return RecordOutcome::Invalid;
            }
        };

        if config.id != id {
            tracing::warn!(id, "dropping integration record stored under a foreign id");
            return RecordOutcome::Invalid;
        }
        if config.integration_type() == IntegrationType::DuckDb {
            tracing::warn!(id, "dropping persisted dataframe integration record");
            return RecordOutcome::Invalid;
        }

        RecordOutcome::Valid(config)
    }

    async fn upgrade_record(&self, id: &str, value: &Value) -> RecordOutcome {
        let Some(legacy) = parse_legacy_config(value) else {
            tracing::warn!(id, "dropping legacy integration record with unknown shape");
            return RecordOutcome::Invalid;
        };

        let Some(config) = upgrade_legacy_config(&legacy) else {
            tracing::warn!(id, "legacy integration record could not be upgraded");
            return RecordOutcome::Invalid;
        };

        if config.integration_type() == IntegrationType::DuckDb {
            tracing::warn!(id, "dropping legacy dataframe integration record");
            return RecordOutcome::Invalid;
        }
        if config.id != id {
            tracing::warn!(id, "dropping legacy integration record stored under a foreign id");
            return RecordOutcome::Invalid;
        }

        // Write back so the upgrade happens once.
        match serde_json::to_string(&config) {
            Ok(record) => {
                if let Err(err) = self
                    .store
                    .store(INTEGRATION_SERVICE_NAME, id, Some(&record))
                    .await
                {
                    tracing::error!(id, error = %err, "failed to persist upgraded integration");
                } else {
                    tracing::debug!(id, "upgraded legacy integration record");
                }
            }
            Err(err) => {
                tracing::error!(id, error = %err, "failed to serialize upgraded integration");
            }
        }

        RecordOutcome::Valid(config)
    }

    /// Delete `invalid` blobs and rewrite the index without them.
    async fn purge(&self, ids: &[String], invalid: &[String]) {
        for id in invalid {
            if let Err(err) = self.store.store(INTEGRATION_SERVICE_NAME, id, None).await {
                tracing::error!(id = %id, error = %err, "failed to delete invalid integration");
            }
        }

        let remaining: Vec<String> = ids
            .iter()
            .filter(|id| !invalid.contains(id))
            .cloned()
            .collect();
        if let Err(err) = self.write_index(&remaining).await {
            tracing::error!(error = %err, "failed to rewrite integration index");
        }
    }
}
