use std::path::{Path, PathBuf};

use deepnote_core::kernel::DEEPNOTE_NOTEBOOK_TYPE;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PASSPHRASE_ENV;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DeepnoteConfig {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub security: SecuritySection,
    #[serde(default)]
    pub kernel: KernelSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreSection {
    /// Credential store directory; defaults to the XDG data dir.
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SecuritySection {
    #[serde(default = "default_passphrase_env")]
    pub passphrase_env: String,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            passphrase_env: default_passphrase_env(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KernelSection {
    #[serde(default = "default_notebook_type")]
    pub notebook_type: String,
}

impl Default for KernelSection {
    fn default() -> Self {
        Self {
            notebook_type: default_notebook_type(),
        }
    }
}

fn default_passphrase_env() -> String {
    DEFAULT_PASSPHRASE_ENV.to_string()
}

fn default_notebook_type() -> String {
    DEEPNOTE_NOTEBOOK_TYPE.to_string()
}

impl DeepnoteConfig {
    /// Store directory from the config file, or the default location.
    pub fn store_path(&self) -> anyhow::Result<PathBuf> {
        match self.store.path.as_deref().filter(|path| !path.trim().is_empty()) {
            Some(path) => Ok(PathBuf::from(path)),
            None => default_store_path(),
        }
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_store_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("integrations"))
}

/// Read the config at `path`. A missing file yields the defaults.
pub fn read_config(path: &Path) -> anyhow::Result<DeepnoteConfig> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(DeepnoteConfig::default())
        }
        Err(e) => {
            return Err(anyhow::anyhow!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        }
    };
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("deepnote"));
        }
    }
    Ok(home_dir()?.join(".config").join("deepnote"))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("deepnote"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("deepnote"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}
