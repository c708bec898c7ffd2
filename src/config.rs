//! Client configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use fzmahjong_tiles::DEFAULT_TILE_IMAGE_BASE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Environment variable that overrides the configured server URL.
pub const SERVER_URL_ENV: &str = "FZMAHJONG_SERVER_URL";

/// Configuration for the game client.
///
/// Setters (`with_server_url`, `with_session_file`, ...) skip validation;
/// use them for tests and programmatic overrides.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_", into)]
pub struct ClientConfig {
    /// Base HTTP URL of the game server (e.g., "http://localhost:8080").
    #[serde(default = "default_server_url")]
    server_url: String,

    /// Path of the raw WebSocket endpoint on the server.
    #[serde(default = "default_ws_path")]
    ws_path: String,

    /// Fixed delay before a reconnect attempt, in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    reconnect_delay_ms: u64,

    /// How long a hand result stays on screen, in milliseconds.
    #[serde(default = "default_result_overlay_ms")]
    result_overlay_ms: u64,

    /// File holding the saved session.
    #[serde(default = "default_session_file")]
    session_file: PathBuf,

    /// Base path prepended to tile image file names.
    #[serde(default = "default_tile_image_base")]
    tile_image_base: String,
}

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_ws_path() -> String {
    "/ws-mahjong/websocket".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_result_overlay_ms() -> u64 {
    5000
}

fn default_session_file() -> PathBuf {
    PathBuf::from("fzmahjong_session.json")
}

fn default_tile_image_base() -> String {
    DEFAULT_TILE_IMAGE_BASE.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            ws_path: default_ws_path(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            result_overlay_ms: default_result_overlay_ms(),
            session_file: default_session_file(),
            tile_image_base: default_tile_image_base(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from a TOML file. Missing keys take defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml(&content)?;
        info!(server_url = %config.server_url, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file if given, otherwise defaults, then applies the
    /// environment override.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_override(std::env::var(SERVER_URL_ENV).ok())
    }

    /// Replaces the server URL when `server_url` is set and non-empty.
    #[instrument(skip(self))]
    pub fn with_env_override(mut self, server_url: Option<String>) -> Result<Self, ConfigError> {
        if let Some(url) = server_url.filter(|u| !u.trim().is_empty()) {
            debug!(server_url = %url, "Server URL overridden from environment");
            self.server_url = url;
            self.validate()?;
        }
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.server_url)
            .map_err(|e| ConfigError::new(format!("Invalid server_url {}: {}", self.server_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::new(format!(
                "server_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if !self.ws_path.starts_with('/') {
            return Err(ConfigError::new(format!(
                "ws_path must start with '/', got {}",
                self.ws_path
            )));
        }
        Ok(())
    }

    /// WebSocket URL derived from the server URL (`http` → `ws`, `https` → `wss`).
    #[instrument(skip(self))]
    pub fn ws_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.server_url)
            .map_err(|e| ConfigError::new(format!("Invalid server_url: {}", e)))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| ConfigError::new(format!("Cannot use {} scheme", scheme)))?;
        url.set_path(&self.ws_path);
        Ok(url)
    }

    /// Reconnect delay as a duration.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Result overlay lifetime as a duration.
    pub fn result_overlay_duration(&self) -> Duration {
        Duration::from_millis(self.result_overlay_ms)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = ClientConfig::from_toml("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.reconnect_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_ws_url_swaps_scheme() {
        let config = ClientConfig::default().with_server_url("https://mahjong.example.com:8443");
        assert_eq!(
            config.ws_url().unwrap().as_str(),
            "wss://mahjong.example.com:8443/ws-mahjong/websocket"
        );
    }

    #[test]
    fn test_env_override_ignores_blank() {
        let config = ClientConfig::default()
            .with_env_override(Some("  ".to_string()))
            .unwrap();
        assert_eq!(config.server_url(), "http://localhost:8080");
    }

    #[test]
    fn test_rejects_non_http_server() {
        assert!(ClientConfig::from_toml(r#"server_url = "ftp://x""#).is_err());
    }
}
