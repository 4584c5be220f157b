// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default output chunk size (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base directory temp workspaces are allocated under
    pub tmp_dir: PathBuf,

    /// Program and arguments run to install dependencies and prepare a package
    pub install_command: Vec<String>,

    /// Extra environment for the install command
    pub install_env: BTreeMap<String, String>,

    /// Size of the byte chunks handed to stream consumers
    pub chunk_size: usize,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tmp_dir: std::env::temp_dir().join("preper"),
            install_command: vec!["npm".to_string(), "install".to_string()],
            install_env: BTreeMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.install_command.first().is_none_or(|p| p.is_empty()) {
            return Err(ConfigError::Invalid {
                reason: "install_command must name a program".to_string(),
            });
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                reason: "chunk_size must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}
