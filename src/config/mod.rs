//! Configuration management for Trendboard.
//!
//! Configuration is read from `~/.config/trendboard/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
    pub refresh: RefreshConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Age in seconds after which a cached batch is stale (default: 1800)
    pub ttl_secs: u64,
    /// Prefix of every cache record key
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 30 * 60,
            key_prefix: "trendboard_news_".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds, 0 disables it (default: 10)
    pub request_timeout_secs: u64,
    /// Bound on one source's whole fetch, 0 disables it (default: 20)
    pub source_timeout_secs: u64,
    /// Maximum sources fetched at once (default: 10)
    pub workers: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            source_timeout_secs: 20,
            workers: 10,
            user_agent: concat!("trendboard/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Background refresh interval, e.g. "5m" (default: "5m")
    pub interval: String,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: "5m".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Source ids switched off at load time
    pub disabled: Vec<String>,
}

impl Config {
    /// Load configuration from `path`, or from the default path.
    ///
    /// If the default config file doesn't exist, creates one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let p = Self::default_config_path()?;
                if !p.exists() {
                    Self::create_default_config(&p)?;
                    return Ok(Self::default());
                }
                p
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/trendboard/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("trendboard").join("config.toml"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Trendboard Configuration
#
# Intervals can be written as "30s", "5m", "1h" or "1d".

[cache]
# Seconds before a cached batch is considered stale
ttl_secs = 1800

# Prefix for cache record keys in the local store
key_prefix = "trendboard_news_"

[fetch]
# Timeout for a single HTTP request (0 = none)
request_timeout_secs = 10

# Upper bound on one source's complete fetch, including follow-up requests (0 = none)
source_timeout_secs = 20

# Maximum number of sources fetched at the same time
workers = 10

[refresh]
# How often `trendboard watch` reloads
interval = "5m"

[sources]
# Source ids to switch off, e.g. ["weibo", "zhihu"]
disabled = []
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
