//! Cryptographic policy for the on-disk credential store.
//!
//! Encryption itself is delegated to **age** (https://age-encryption.org/),
//! which derives a key from the passphrase with scrypt. This module only
//! enforces what a passphrase must look like before we trust it with
//! database credentials.
//!
//! ## Threat Model
//!
//! We defend against:
//! - Theft of the credential store directory
//! - Offline brute-force attacks on weak passphrases
//!
//! We do NOT defend against:
//! - A compromised host process or kernel process reading its environment
//! - Access to an unlocked session / memory

pub mod passphrase;

pub use passphrase::validate_passphrase;
