// src/config/app.rs
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use super::defaults::*;
use crate::consts::{CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE};
use crate::error::{Result, SopsError};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_stores")]
    pub stores: StoresConfig,
    #[serde(default = "default_keys")]
    pub keys: KeysConfig,
    #[serde(default = "default_decrypt")]
    pub decrypt: DecryptDefaults,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoresConfig {
    #[serde(default)]
    pub json: JsonStoreConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsonStoreConfig {
    /// Spaces per level when emitting JSON; tabs when unset.
    #[serde(default)]
    pub indent: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeysConfig {
    /// Explicit age identity file, checked after the environment.
    #[serde(default)]
    pub age_key_file: Option<PathBuf>,
    #[serde(default = "default_age_key_env")]
    pub age_key_env: String,
    #[serde(default = "default_age_key_file_env")]
    pub age_key_file_env: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecryptDefaults {
    #[serde(default)]
    pub ignore_mac_mismatch: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stores: default_stores(),
            keys: default_keys(),
            decrypt: default_decrypt(),
        }
    }
}

impl Default for StoresConfig {
    fn default() -> Self {
        default_stores()
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        default_keys()
    }
}

impl Default for DecryptDefaults {
    fn default() -> Self {
        default_decrypt()
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SopsError::Config(e.to_string()))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }
}

/// Load the config named by `SOPS_ENVELOPE_CONFIG` (or `sops-envelope.toml`
/// in the working directory). A missing file means built-in defaults; a
/// present but invalid one is an error.
pub fn load() -> Result<Config> {
    let explicit = std::env::var(CONFIG_PATH_ENV).ok();
    let config_path = explicit
        .clone()
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    if Path::new(&config_path).exists() {
        debug!(path = %config_path, "loading config");
        Config::from_path(&config_path)
    } else {
        if explicit.is_some() {
            warn!(path = %config_path, "config file not found, using built-in defaults");
        }
        Ok(Config::default())
    }
}
