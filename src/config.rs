//! Browserdeck configuration management
//!
//! Configuration is read from a TOML file (default
//! `~/.config/browserdeck/config.toml`) with the API key overridable via
//! the `BROWSERDECK_API_KEY` environment variable. The API key is a fatal
//! precondition for any remote call; nothing retries around its absence.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted before the config file value.
pub const API_KEY_ENV: &str = "BROWSERDECK_API_KEY";

/// Main browserdeck configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckConfig {
    /// Remote service endpoints and credential
    #[serde(default)]
    pub server: ServerConfig,

    /// Defaults for agent runs
    #[serde(default)]
    pub agent: AgentDefaults,

    /// Stream channel tuning
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Remote service endpoints and credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API base URL
    pub base_url: String,

    /// WebSocket base URL for agent stream channels
    pub ws_base_url: String,

    /// API key; `BROWSERDECK_API_KEY` takes precedence when set
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.notte.cc".to_string(),
            ws_base_url: "wss://api.notte.cc".to_string(),
            api_key: None,
        }
    }
}

/// Defaults applied to agent runs when the caller does not override them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaults {
    /// Default reasoning model identifier
    pub reasoning_model: String,

    /// Default max step count (1-100)
    pub max_steps: u8,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            reasoning_model: "gemini/gemini-2.5-flash".to_string(),
            max_steps: 30,
        }
    }
}

/// Stream channel timeouts and intervals
///
/// These are deployment tuning knobs, not load-bearing semantics. The poll
/// interval bounds cancellation latency: the watcher observes a stop
/// request within roughly one interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Connection open timeout in seconds
    pub open_timeout_secs: u64,

    /// Keep-alive ping interval in seconds
    pub keep_alive_secs: u64,

    /// Idle timeout in seconds; the channel is considered dead when no
    /// frame arrives for this long
    pub idle_timeout_secs: u64,

    /// Receive poll window in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            open_timeout_secs: 30,
            keep_alive_secs: 5,
            idle_timeout_secs: 40,
            poll_interval_ms: 1000,
        }
    }
}

impl StreamConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl DeckConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load from the given path, or defaults when the file does not exist
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("browserdeck")
            .join("config.toml")
    }

    /// Resolve the API key, failing when neither the environment variable
    /// nor the config file provides one
    pub fn require_api_key(&self) -> Result<String> {
        resolve_api_key(
            self.server.api_key.as_deref(),
            std::env::var(API_KEY_ENV).ok(),
        )
    }
}

/// Pick the API key from the environment override or the config value.
fn resolve_api_key(configured: Option<&str>, env_value: Option<String>) -> Result<String> {
    if let Some(key) = env_value {
        if !key.trim().is_empty() {
            return Ok(key);
        }
    }
    match configured {
        Some(key) if !key.trim().is_empty() => Ok(key.to_string()),
        _ => Err(Error::Config(format!(
            "API key not configured: set {} or server.api_key in the config file",
            API_KEY_ENV
        ))),
    }
}
