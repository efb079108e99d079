//! # Deepnote Core
//!
//! SQL integration credentials for Deepnote notebooks: encrypted storage,
//! schema upgrades, project detection and delivery into the kernel.
//!
//! This crate holds the domain logic independent of any editor or CLI.
//!
//! ## Architecture
//!
//! - **storage**: credential store trait and its encrypted/in-memory backends
//! - **integrations**: config types, validation, legacy upgrades, the
//!   registry and project detection
//! - **sql**: connection descriptors and the `SQL_*` environment variables
//! - **kernel**: startup code exporting those variables inside the kernel
//! - **project**: `.deepnote` project files
//!
//! ## Data flow
//!
//! ```text
//! SecretStorage -> IntegrationStorage -> IntegrationDetector
//!                                     -> EnvironmentVariablesProvider -> SqlIntegrationStartupCodeProvider
//! ```

pub mod crypto;
pub mod error;
pub mod events;
pub mod fs;
pub mod integrations;
pub mod kernel;
pub mod project;
pub mod sql;
pub mod storage;

pub use error::{DeepnoteError, Result};
pub use integrations::{IntegrationConfig, IntegrationDetector, IntegrationStorage};
pub use storage::SecretStorage;

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
