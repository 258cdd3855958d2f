//! Cache configuration.
//! Reads the `[cache]` table of omnisearch.toml from the current directory
//! or the path in the OMNISEARCH_CONFIG env var.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CacheError, Result};

pub const CONFIG_ENV: &str = "OMNISEARCH_CONFIG";
pub const CACHE_DIR_ENV: &str = "OMNISEARCH_CACHE_DIR";
pub const DEFAULT_CONFIG_FILE: &str = "omnisearch.toml";

const APP_DIR: &str = "omnisearch";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Base directory all namespaces are stored under.
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { root: default_root() }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    cache: Option<CacheConfig>,
}

impl CacheConfig {
    /// Load configuration from omnisearch.toml.
    /// Checks OMNISEARCH_CONFIG first, then the current directory. A missing
    /// file means defaults. OMNISEARCH_CACHE_DIR overrides the root.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV)
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)?;
            Self::from_toml_str(&content)?
        } else {
            debug!(path = %path, "No config file, using cache defaults");
            Self::default()
        };

        if let Ok(root) = std::env::var(CACHE_DIR_ENV) {
            if !root.trim().is_empty() {
                config.root = PathBuf::from(root);
            }
        }

        Ok(config)
    }

    /// Parse the `[cache]` table of a TOML document. Other tables are ignored.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        let config = file.cache.unwrap_or_default();
        if config.root.as_os_str().is_empty() {
            return Err(CacheError::Config("cache.root must not be empty".to_string()));
        }
        Ok(config)
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }
}
