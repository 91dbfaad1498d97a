//! `~/.studio/config.toml` handling.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const STUDIO_DIR: &str = ".studio";
pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_HOST_URL: &str = "http://localhost:8547";
pub const DEFAULT_LOG_FILTER: &str = "studio=info,lifecycle=info,host_client=info";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub host: HostConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub url: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_HOST_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Location used when `--config` is not given.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(STUDIO_DIR))
        .unwrap_or_else(|| PathBuf::from(STUDIO_DIR))
        .join(CONFIG_FILE)
}

impl StudioConfig {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Write through a sibling temp file so readers never see a partial file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let content = self.to_toml()?;
        let temp_path = path.with_extension("toml.tmp");
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Command-line values take precedence over the file.
    pub fn with_host_url(mut self, host_url: Option<String>) -> Self {
        if let Some(url) = host_url {
            self.host.url = url;
        }
        self
    }
}
