//! Credential storage for integration configurations.
//!
//! The registry talks to storage exclusively through the [`SecretStorage`]
//! trait, a namespaced string key-value interface:
//! - [`AgeFileStore`]: age-encrypted files on disk
//! - [`MemoryStore`]: in-process map for ephemeral sessions and tests
//!
//! Storage backends are responsible for:
//! - Encryption at rest
//! - Atomic writes so a crash never leaves a half-written blob

pub mod age_file;
pub mod encryption;
pub mod memory;
pub mod traits;

pub use age_file::AgeFileStore;
pub use memory::MemoryStore;
pub use traits::SecretStorage;
