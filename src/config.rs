//! Configuration for the retrieval pipeline.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{Ms2Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Query encoder the dense index is built with.
pub const DEFAULT_ENCODER: &str = "castorini/tct_colbert-v2-hnp-msmarco";

/// Search service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the search service (e.g., "http://localhost:8081")
    pub api_base: String,

    /// Encoder model identifier used to embed queries
    #[serde(default = "default_encoder")]
    pub encoder: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "http://localhost:8081".to_string()
}

fn default_encoder() -> String {
    DEFAULT_ENCODER.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            encoder: default_encoder(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// External indexing job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Interpreter used to run the script
    pub shell: String,

    /// Path to the indexing script
    pub script: PathBuf,

    /// Device used for embedding ("cpu", "cuda:0", ...)
    pub device: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            shell: "bash".to_string(),
            script: PathBuf::from("scripts/encode.sh"),
            device: "cpu".to_string(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Search service settings
    pub search: SearchConfig,
    /// Indexing job settings
    pub index: IndexConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    search: Option<SearchFileSection>,
    index: Option<IndexFileSection>,
}

#[derive(Debug, Deserialize)]
struct SearchFileSection {
    api_base: Option<String>,
    encoder: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct IndexFileSection {
    shell: Option<String>,
    script: Option<PathBuf>,
    device: Option<String>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (MS2_SEARCH_API_BASE, MS2_ENCODER, ...)
    /// 2. Config file (~/.config/ms2-retrieval/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(api_base) = env::var("MS2_SEARCH_API_BASE") {
            self.search.api_base = api_base;
        }

        if let Ok(encoder) = env::var("MS2_ENCODER") {
            self.search.encoder = encoder;
        }

        if let Ok(timeout) = env::var("MS2_SEARCH_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.search.timeout_secs = secs;
            }
        }

        if let Ok(shell) = env::var("MS2_INDEX_SHELL") {
            self.index.shell = shell;
        }

        if let Ok(script) = env::var("MS2_INDEX_SCRIPT") {
            self.index.script = PathBuf::from(script);
        }

        if let Ok(device) = env::var("MS2_DEVICE") {
            self.index.device = device;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Ms2Error::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text, filling unset values with defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| Ms2Error::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(search) = file_config.search {
            if let Some(api_base) = search.api_base {
                config.search.api_base = api_base;
            }
            if let Some(encoder) = search.encoder {
                config.search.encoder = encoder;
            }
            if let Some(timeout_secs) = search.timeout_secs {
                config.search.timeout_secs = timeout_secs;
            }
        }

        if let Some(index) = file_config.index {
            if let Some(shell) = index.shell {
                config.index.shell = shell;
            }
            if let Some(script) = index.script {
                config.index.script = script;
            }
            if let Some(device) = index.device {
                config.index.device = device;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ms2-retrieval")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        let api_base = self.search.api_base.trim();
        if api_base.is_empty() {
            return Err(Ms2Error::Config(
                "Search API base URL is required. Set MS2_SEARCH_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
            return Err(Ms2Error::Config(format!(
                "Search API base URL must start with http:// or https://, got '{}'",
                api_base
            )));
        }

        if self.search.encoder.trim().is_empty() {
            return Err(Ms2Error::Config(
                "Encoder is required. Set MS2_ENCODER environment variable or add to config file."
                    .to_string(),
            ));
        }

        if self.search.timeout_secs == 0 {
            return Err(Ms2Error::Config(
                "Search timeout must be at least one second".to_string(),
            ));
        }

        validate_device(&self.index.device)
    }

    /// Create a config pointing at an explicit search service.
    #[cfg(test)]
    pub fn with_search(api_base: impl Into<String>) -> Self {
        Self {
            search: SearchConfig {
                api_base: api_base.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Check a device specifier: "cpu", "mps", "cuda" or "cuda:<N>".
pub fn validate_device(device: &str) -> Result<()> {
    let valid = match device {
        "cpu" | "mps" | "cuda" => true,
        other => other
            .strip_prefix("cuda:")
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit())),
    };

    if valid {
        Ok(())
    } else {
        Err(Ms2Error::Config(format!(
            "Invalid device '{}'. Should be \"cpu\" or \"cuda:0, cuda:1...\"",
            device
        )))
    }
}
