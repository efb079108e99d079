//! In-memory credential store.
//!
//! Used for ephemeral sessions and tests. Values are wiped from memory when
//! they are overwritten, deleted, or the store is dropped.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use zeroize::Zeroizing;

use crate::error::Result;
use crate::storage::traits::SecretStorage;

type EntryKey = (String, String);

/// `SecretStorage` over a mutex-guarded map.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<EntryKey, Zeroizing<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored under `namespace`, in sorted order.
    pub fn keys(&self, namespace: &str) -> Vec<String> {
        self.entries
            .lock()
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Number of entries across all namespaces.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Write a raw value without going through the async trait.
    ///
    /// Handy for seeding legacy or corrupt records.
    pub fn insert_raw(&self, namespace: &str, key: &str, value: impl Into<String>) {
        self.entries.lock().insert(
            (namespace.to_string(), key.to_string()),
            Zeroizing::new(value.into()),
        );
    }

    /// Read a raw value without going through the async trait.
    pub fn get_raw(&self, namespace: &str, key: &str) -> Option<String> {
        self.entries
            .lock()
            .get(&(namespace.to_string(), key.to_string()))
            .map(|value| value.as_str().to_string())
    }
}

#[async_trait]
impl SecretStorage for MemoryStore {
    async fn store(&self, namespace: &str, key: &str, value: Option<&str>) -> Result<()> {
        let entry_key = (namespace.to_string(), key.to_string());
        let mut entries = self.entries.lock();
        match value {
            Some(value) => {
                entries.insert(entry_key, Zeroizing::new(value.to_string()));
            }
            None => {
                entries.remove(&entry_key);
            }
        }
        Ok(())
    }

    async fn retrieve(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        Ok(self.get_raw(namespace, key))
    }
}
