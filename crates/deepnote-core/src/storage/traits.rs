//! Credential store trait definition.
//!
//! `SecretStorage` is the narrow boundary between the integration registry
//! and whatever actually keeps the encrypted bytes (an age-encrypted
//! directory, an in-memory map, a host-provided secret store).

use async_trait::async_trait;

use crate::error::Result;

/// Encrypted key-value persistence.
///
/// Implementations must ensure:
/// - Values are encrypted at rest (in-memory implementations excepted)
/// - A completed `store` is visible to every later `retrieve`
/// - Deleting a missing key succeeds
#[async_trait]
pub trait SecretStorage: Send + Sync {
    /// Store `value` under `(namespace, key)`. `None` deletes the entry.
    async fn store(&self, namespace: &str, key: &str, value: Option<&str>) -> Result<()>;

    /// Retrieve the value under `(namespace, key)`.
    ///
    /// Returns `Ok(None)` when nothing is stored there.
    async fn retrieve(&self, namespace: &str, key: &str) -> Result<Option<String>>;
}
