//! Shared command setup: config, passphrase and store opening.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use deepnote_core::project::DeepnoteProject;
use deepnote_core::storage::AgeFileStore;
use deepnote_core::{DeepnoteError, IntegrationStorage};
use dialoguer::Password;

use crate::cli::Cli;
use crate::config::{default_config_path, read_config, DeepnoteConfig};
use crate::errors::CliError;

pub struct AppContext {
    pub config: DeepnoteConfig,
    pub store_path: PathBuf,
}

impl AppContext {
    /// Resolve config and store path. `--store`/`DEEPNOTE_STORE` win over the config file.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let config_path = match &cli.config {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        let config = read_config(&config_path)?;
        let store_path = match &cli.store {
            Some(path) => path.clone(),
            None => config.store_path()?,
        };
        tracing::debug!(
            config = %config_path.display(),
            store = %store_path.display(),
            "resolved paths"
        );
        Ok(Self { config, store_path })
    }

    /// Open the encrypted store and load the registry.
    ///
    /// Loading up front turns a wrong passphrase into an error here instead of
    /// an empty listing later.
    pub async fn open_registry(&self) -> anyhow::Result<Arc<IntegrationStorage>> {
        let passphrase = resolve_passphrase(&self.config.security.passphrase_env)?;
        let store = AgeFileStore::open(&self.store_path, &passphrase)?;
        let registry = Arc::new(IntegrationStorage::new(Arc::new(store)));

        match registry.load().await {
            Ok(()) => Ok(registry),
            Err(DeepnoteError::IncorrectPassphrase) => Err(CliError::auth_failed_with_hint(
                "Incorrect passphrase",
                format!(
                    "The store at {} was created with a different passphrase",
                    self.store_path.display()
                ),
            )
            .into()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Passphrase from `env_name`, or an interactive prompt on a terminal.
pub fn resolve_passphrase(env_name: &str) -> anyhow::Result<String> {
    if let Ok(value) = std::env::var(env_name) {
        if !value.trim().is_empty() {
            return Ok(value);
        }
    }

    if !std::io::stdin().is_terminal() {
        return Err(CliError::auth_failed_with_hint(
            "No passphrase available",
            format!("Set {} or run interactively", env_name),
        )
        .into());
    }

    Password::new()
        .with_prompt("Store passphrase")
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to read passphrase: {}", e))
}

/// Read a `.deepnote` project file.
pub fn load_project(path: &Path) -> anyhow::Result<DeepnoteProject> {
    if !path.exists() {
        return Err(CliError::not_found(
            format!("Project file not found: {}", path.display()),
            "Pass the path to a .deepnote file",
        )
        .into());
    }
    DeepnoteProject::from_path(path).map_err(|e| {
        CliError::invalid_input(format!("Invalid project file {}: {}", path.display(), e)).into()
    })
}
