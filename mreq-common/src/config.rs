//! Bootstrap configuration loading
//!
//! Configuration is read once at startup. Sources, highest priority first:
//! 1. Command-line argument (config path)
//! 2. Environment variables (`MREQ_CONFIG`, `MREQ_API_BASE_URL`, `MREQ_PORT`)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! A missing TOML file is not fatal: a warning is logged and defaults are used.
//! A file that exists but cannot be parsed, or that fails validation, is an error.

use crate::{Error, QualityTier, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const ENV_CONFIG_PATH: &str = "MREQ_CONFIG";
/// Environment variable overriding `api_base_url`
pub const ENV_API_BASE_URL: &str = "MREQ_API_BASE_URL";
/// Environment variable overriding `port`
pub const ENV_PORT: &str = "MREQ_PORT";

/// Upper bound for `session_ttl_seconds` (one day)
pub const MAX_SESSION_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Service configuration loaded from TOML
///
/// Every field has a built-in default, so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Base URL of the NeteaseCloudMusicApi-compatible catalogue service
    pub api_base_url: String,

    /// Tier requested first when resolving a selected song
    pub default_quality: QualityTier,

    /// Number of search results offered for selection (> 0)
    pub search_result_limit: usize,

    /// Lifetime of a selection session (1..=86400)
    pub session_ttl_seconds: u64,

    /// Bound on every catalogue call (> 0)
    pub request_timeout_seconds: u64,

    /// Period of the expired-session sweeper; 0 disables it
    pub sweep_interval_seconds: u64,

    /// Catalogue login cookie, forwarded on playable-URL lookups
    ///
    /// Needed for VIP-gated tiers. Empty means anonymous.
    pub cookie: String,

    /// Character(s) that introduce an explicit command
    pub command_prefix: String,

    /// Command names recognised after `command_prefix`
    pub command_names: Vec<String>,

    /// Natural-language lead-in phrases, tried in order
    pub trigger_phrases: Vec<String>,

    /// HTTP port for the dispatch API
    pub port: u16,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000".to_string(),
            default_quality: QualityTier::High,
            search_result_limit: 5,
            session_ttl_seconds: 60,
            request_timeout_seconds: 20,
            sweep_interval_seconds: 60,
            cookie: String::new(),
            command_prefix: "/".to_string(),
            command_names: ["点歌", "music", "听歌", "网易云"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            trigger_phrases: [
                "来一首", "来首", "播放", "听听", "点歌", "唱一首", "放一首", "play", "give me a",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            port: 5780,
            logging: LoggingConfig::default(),
        }
    }
}

impl BotConfig {
    /// Check value constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("api_base_url must not be empty".to_string()));
        }
        if self.search_result_limit == 0 {
            return Err(Error::Config(
                "search_result_limit must be greater than 0".to_string(),
            ));
        }
        if self.session_ttl_seconds == 0 {
            return Err(Error::Config(
                "session_ttl_seconds must be greater than 0".to_string(),
            ));
        }
        if self.session_ttl_seconds > MAX_SESSION_TTL_SECONDS {
            return Err(Error::Config(format!(
                "session_ttl_seconds must be at most {}",
                MAX_SESSION_TTL_SECONDS
            )));
        }
        if self.request_timeout_seconds == 0 {
            return Err(Error::Config(
                "request_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.command_names.is_empty() {
            return Err(Error::Config("command_names must not be empty".to_string()));
        }
        if self.command_names.iter().any(|c| c.trim().is_empty()) {
            return Err(Error::Config(
                "command_names must not contain empty entries".to_string(),
            ));
        }
        if self.trigger_phrases.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::Config(
                "trigger_phrases must not contain empty entries".to_string(),
            ));
        }
        Ok(())
    }

    /// Session lifetime, clamped to [`MAX_SESSION_TTL_SECONDS`] for configs
    /// that skipped `validate()`
    pub fn session_ttl(&self) -> chrono::Duration {
        let secs = self.session_ttl_seconds.min(MAX_SESSION_TTL_SECONDS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
    }

    /// Per-call bound on catalogue requests
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Sweeper period, `None` when disabled
    pub fn sweep_interval(&self) -> Option<Duration> {
        match self.sweep_interval_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Apply `MREQ_API_BASE_URL` / `MREQ_PORT` if set
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(ENV_API_BASE_URL) {
            if !url.trim().is_empty() {
                info!("api_base_url overridden by {}", ENV_API_BASE_URL);
                self.api_base_url = url;
            }
        }

        if let Ok(port) = std::env::var(ENV_PORT) {
            self.port = port.trim().parse().map_err(|e| {
                Error::Config(format!("{} is not a valid port: {}", ENV_PORT, e))
            })?;
            info!("port overridden by {}", ENV_PORT);
        }

        Ok(())
    }
}

/// Default config file location: `<config_dir>/mreq/mreq-bot.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mreq").join("mreq-bot.toml"))
}

/// Read, parse and validate a TOML config file
pub fn load_toml_config(path: &Path) -> Result<BotConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: BotConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Write config as TOML, creating parent directories as needed
///
/// Writes to a temporary sibling file first and renames it into place.
pub fn write_toml_config(config: &BotConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Resolves which config file to use and loads it
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// `cli_path` is the `--config` argument, if given
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Config file path by priority: CLI → `MREQ_CONFIG` → platform default
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        default_config_path()
    }

    /// Load the config (or defaults), then apply environment overrides
    pub fn resolve(&self) -> Result<BotConfig> {
        let mut config = match self.config_path() {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                load_toml_config(&path)?
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                BotConfig::default()
            }
            None => {
                warn!("Could not determine config directory, using built-in defaults");
                BotConfig::default()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }
}
