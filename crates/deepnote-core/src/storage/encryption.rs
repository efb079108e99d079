//! Age encryption/decryption utilities.
//!
//! Wrappers around the age library for encrypting and decrypting credential
//! blobs with passphrase-based encryption. Age uses scrypt internally for
//! key derivation.

use std::io::{Read, Write};
use std::iter;

use age::secrecy::{ExposeSecret, SecretString};

use crate::error::{DeepnoteError, Result};

/// Encrypt data using age passphrase-based encryption.
///
/// # Examples
///
/// ```
/// use age::secrecy::SecretString;
/// use deepnote_core::storage::encryption::encrypt;
///
/// let passphrase = SecretString::from("my-secure-passphrase".to_string());
/// let encrypted = encrypt(b"secret data", &passphrase).unwrap();
/// assert_ne!(encrypted.as_slice(), b"secret data");
/// ```
pub fn encrypt(data: &[u8], passphrase: &SecretString) -> Result<Vec<u8>> {
    let encryptor = age::Encryptor::with_user_passphrase(SecretString::from(
        passphrase.expose_secret().to_string(),
    ));

    let mut encrypted = Vec::new();
    let mut writer = encryptor
        .wrap_output(&mut encrypted)
        .map_err(|e| DeepnoteError::Crypto(format!("Failed to create encryptor: {}", e)))?;

    writer
        .write_all(data)
        .map_err(|e| DeepnoteError::Crypto(format!("Encryption write failed: {}", e)))?;

    writer
        .finish()
        .map_err(|e| DeepnoteError::Crypto(format!("Encryption finish failed: {}", e)))?;

    Ok(encrypted)
}

/// Decrypt data using age passphrase-based encryption.
///
/// # Errors
///
/// Returns `DeepnoteError::IncorrectPassphrase` when the passphrase does not
/// match, and `DeepnoteError::Crypto` when the data is corrupted.
pub fn decrypt(encrypted_data: &[u8], passphrase: &SecretString) -> Result<Vec<u8>> {
    let decryptor = age::Decryptor::new(encrypted_data)
        .map_err(|e| DeepnoteError::Crypto(format!("Failed to create decryptor: {}", e)))?;

    let identity = age::scrypt::Identity::new(SecretString::from(
        passphrase.expose_secret().to_string(),
    ));
    let mut reader = decryptor
        .decrypt(iter::once(&identity as &dyn age::Identity))
        .map_err(|e| match e {
            age::DecryptError::NoMatchingKeys
            | age::DecryptError::DecryptionFailed
            | age::DecryptError::KeyDecryptionFailed => DeepnoteError::IncorrectPassphrase,
            _ => DeepnoteError::Crypto(format!("Decryption failed: {}", e)),
        })?;

    let mut decrypted = Vec::new();
    reader
        .read_to_end(&mut decrypted)
        .map_err(|e| DeepnoteError::Crypto(format!("Failed to read decrypted data: {}", e)))?;

    Ok(decrypted)
}
