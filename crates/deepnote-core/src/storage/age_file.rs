//! Age-encrypted, directory-backed credential store.
//!
//! Every `(namespace, key)` pair lives in its own file named by the BLAKE3
//! hash of the pair, so neither integration ids nor the service name leak
//! into the directory listing. File contents are age passphrase-encrypted.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use age::secrecy::SecretString;
use async_trait::async_trait;

use crate::crypto::validate_passphrase;
use crate::error::{DeepnoteError, Result};
use crate::fs::{remove_if_exists, write_atomic};
use crate::storage::encryption::{decrypt, encrypt};
use crate::storage::traits::SecretStorage;

const BLOB_EXTENSION: &str = "age";

/// Credential store keeping one age-encrypted file per entry.
pub struct AgeFileStore {
    root: PathBuf,
    passphrase: Arc<SecretString>,
}

impl AgeFileStore {
    /// Open (or create) a store rooted at `root`.
    ///
    /// The passphrase is checked against the minimum policy here; whether it
    /// matches existing blobs is only known on the first `retrieve`.
    pub fn open(root: impl Into<PathBuf>, passphrase: &str) -> Result<Self> {
        validate_passphrase(passphrase)?;

        let root = root.into();
        if root.exists() && !root.is_dir() {
            return Err(DeepnoteError::Storage(format!(
                "Store path {} is not a directory",
                root.display()
            )));
        }
        fs::create_dir_all(&root)?;

        tracing::debug!(path = %root.display(), "opened encrypted credential store");

        Ok(Self {
            root,
            passphrase: Arc::new(SecretString::from(passphrase.to_string())),
        })
    }

    fn blob_path(&self, namespace: &str, key: &str) -> PathBuf {
        let mut hasher = blake3::Hasher::new();
        hasher.update(namespace.as_bytes());
        hasher.update(&[0]);
        hasher.update(key.as_bytes());
        let name = format!("{}.{}", hasher.finalize().to_hex(), BLOB_EXTENSION);
        self.root.join(name)
    }
}

fn join_error(err: tokio::task::JoinError) -> DeepnoteError {
    DeepnoteError::Storage(format!("Credential store task failed: {}", err))
}

#[async_trait]
impl SecretStorage for AgeFileStore {
    async fn store(&self, namespace: &str, key: &str, value: Option<&str>) -> Result<()> {
        let path = self.blob_path(namespace, key);

        let Some(value) = value else {
            return tokio::task::spawn_blocking(move || {
                remove_if_exists(&path).map_err(DeepnoteError::from)
            })
            .await
            .map_err(join_error)?;
        };

        let plaintext = value.as_bytes().to_vec();
        let passphrase = Arc::clone(&self.passphrase);
        // scrypt is CPU-bound; run it off the async workers.
        tokio::task::spawn_blocking(move || -> Result<()> {
            let encrypted = encrypt(&plaintext, &passphrase)?;
            write_atomic(&path, &encrypted)?;
            Ok(())
        })
        .await
        .map_err(join_error)?
    }

    async fn retrieve(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let path = self.blob_path(namespace, key);
        let passphrase = Arc::clone(&self.passphrase);

        tokio::task::spawn_blocking(move || -> Result<Option<String>> {
            let encrypted = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(err.into()),
            };
            let plaintext = decrypt(&encrypted, &passphrase)?;
            let value = String::from_utf8(plaintext).map_err(|_| {
                DeepnoteError::Crypto("Decrypted blob is not valid UTF-8".to_string())
            })?;
            Ok(Some(value))
        })
        .await
        .map_err(join_error)?
    }
}
