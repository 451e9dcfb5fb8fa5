use clap::Args;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "sentinel.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Console settings. Every field is optional so layers can be merged:
/// defaults, then the JSON file, then environment variables and flags.
#[derive(Args, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleConfig {
    #[clap(long, env = "SENTINEL_API_URL", help = "Base URL of the REST API.")]
    pub api_url: Option<String>,

    #[clap(long, env = "SENTINEL_WS_URL", help = "WebSocket URL of the live feed.")]
    pub ws_url: Option<String>,

    #[clap(long, env = "SENTINEL_REQUEST_TIMEOUT_MS", help = "Timeout in milliseconds for every REST request.")]
    pub request_timeout_ms: Option<u64>,

    #[clap(long, env = "SENTINEL_READ_RETRIES", help = "Retries for failed GET requests.")]
    pub read_retries: Option<u32>,

    #[clap(long, env = "SENTINEL_RECONNECT_BASE_DELAY_MS", help = "Base delay in milliseconds for live feed reconnects.")]
    pub reconnect_base_delay_ms: Option<u64>,

    #[clap(long, env = "SENTINEL_RECONNECT_MAX_ATTEMPTS", help = "Reconnect attempts before the live feed gives up.")]
    pub reconnect_max_attempts: Option<u32>,

    #[clap(long, env = "SENTINEL_TOKEN_PATH", help = "File holding the session token.")]
    pub token_path: Option<PathBuf>,

    #[clap(long, env = "SENTINEL_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "SENTINEL_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "SENTINEL_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,
}

impl ConsoleConfig {
    /// Built-in values for every field.
    pub fn defaults() -> Self {
        Self {
            api_url: Some("http://localhost:8000/api".to_string()),
            ws_url: Some("ws://localhost:8000/ws".to_string()),
            request_timeout_ms: Some(10_000),
            read_retries: Some(1),
            reconnect_base_delay_ms: Some(1_000),
            reconnect_max_attempts: Some(5),
            token_path: default_token_path(),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            config_path: None,
        }
    }

    /// `other` wins wherever it has a value.
    pub fn merge(self, other: ConsoleConfig) -> ConsoleConfig {
        ConsoleConfig {
            api_url: other.api_url.or(self.api_url),
            ws_url: other.ws_url.or(self.ws_url),
            request_timeout_ms: other.request_timeout_ms.or(self.request_timeout_ms),
            read_retries: other.read_retries.or(self.read_retries),
            reconnect_base_delay_ms: other.reconnect_base_delay_ms.or(self.reconnect_base_delay_ms),
            reconnect_max_attempts: other.reconnect_max_attempts.or(self.reconnect_max_attempts),
            token_path: other.token_path.or(self.token_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            config_path: other.config_path.or(self.config_path),
        }
    }

    pub fn from_file(path: &Path) -> Result<ConsoleConfig, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rejects values the clients cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.api_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    field: "api_url",
                    reason: format!("'{}' is not an http(s) URL", url),
                });
            }
        }
        if let Some(url) = &self.ws_url {
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                return Err(ConfigError::Invalid {
                    field: "ws_url",
                    reason: format!("'{}' is not a ws(s) URL", url),
                });
            }
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.reconnect_base_delay_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "reconnect_base_delay_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(feature = "api")]
impl ConsoleConfig {
    /// REST client settings; unset fields take the client defaults.
    pub fn api_config(&self) -> crate::api::ApiConfig {
        let mut config = crate::api::ApiConfig::default();
        if let Some(url) = &self.api_url {
            config.base_url = url.clone();
        }
        if let Some(ms) = self.request_timeout_ms {
            config.timeout = std::time::Duration::from_millis(ms);
        }
        if let Some(retries) = self.read_retries {
            config.read_retries = retries;
        }
        config
    }

    /// The file store at `token_path`, or an in-memory store when there is no path.
    pub fn token_store(&self) -> std::sync::Arc<dyn crate::api::TokenStore> {
        match &self.token_path {
            Some(path) => std::sync::Arc::new(crate::api::FileTokenStore::new(path.clone())),
            None => {
                log::warn!("No token path configured; the session will not outlive this process.");
                std::sync::Arc::new(crate::api::MemoryTokenStore::new())
            }
        }
    }
}

#[cfg(feature = "feed")]
impl ConsoleConfig {
    pub fn live_feed_config(&self) -> crate::feed::LiveFeedConfig {
        let mut config = crate::feed::LiveFeedConfig::default();
        if let Some(url) = &self.ws_url {
            config.url = url.clone();
        }
        if let Some(ms) = self.reconnect_base_delay_ms {
            config.reconnect.base_delay = std::time::Duration::from_millis(ms);
        }
        if let Some(attempts) = self.reconnect_max_attempts {
            config.reconnect.max_attempts = attempts;
        }
        config
    }
}

/// `<data dir>/sentinel/session.json`, when the platform has a data directory.
pub fn default_token_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("sentinel").join("session.json"))
}

/// Resolves the effective configuration.
///
/// `overrides` carries the environment and command-line layer (clap fills it from both).
/// A config file named explicitly must exist and parse; the implicit `sentinel.json` is
/// only used when present.
pub fn load_config(overrides: ConsoleConfig) -> Result<ConsoleConfig, ConfigError> {
    let mut current_config = ConsoleConfig::defaults();

    let explicit = overrides.config_path.clone();
    let config_file_path = explicit
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if explicit.is_some() || config_file_path.exists() {
        let file_config = ConsoleConfig::from_file(&config_file_path)?;
        log::debug!("Loaded config file {}", config_file_path.display());
        current_config = current_config.merge(file_config);
    } else {
        log::debug!(
            "Config file not found at {}. Using defaults and environment/CLI variables.",
            config_file_path.display()
        );
    }

    current_config = current_config.merge(overrides);
    current_config.validate()?;
    Ok(current_config)
}
