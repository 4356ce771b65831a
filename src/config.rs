// ABOUTME: Configuration loading for the socket-term client
// Reads an optional TOML file, applies CLI overrides and validates the result

use crate::terminal::{websocket_client::ClientOptions, TerminalTheme};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid server url {0:?}: expected http, https, ws or wss")]
    InvalidUrl(String),

    #[error("invalid color {0:?}")]
    InvalidColor(String),

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectionConfig {
    pub enabled: bool,
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            attempts: 5,
            delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub background: String,
    pub foreground: String,
    pub cursor_blink: bool,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            background: "#121212".to_string(),
            foreground: "#00ff00".to_string(),
            cursor_blink: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the web terminal server
    pub server_url: String,
    pub socketio_path: String,
    pub namespace: String,
    pub poll_interval_ms: u64,
    pub reconnection: ReconnectionConfig,
    pub theme: ThemeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".to_string(),
            socketio_path: "/socket.io".to_string(),
            namespace: "/".to_string(),
            poll_interval_ms: 5000,
            reconnection: ReconnectionConfig::default(),
            theme: ThemeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default config file location, e.g. `~/.config/socket-term/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "socket-term")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load config from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint_url()?;
        self.terminal_theme()?;

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::NotPositive("poll_interval_ms"));
        }
        if self.reconnection.enabled && self.reconnection.attempts == 0 {
            return Err(ConfigError::NotPositive("reconnection.attempts"));
        }
        if self.reconnection.enabled && self.reconnection.delay_ms == 0 {
            return Err(ConfigError::NotPositive("reconnection.delay_ms"));
        }

        Ok(())
    }

    /// Engine.IO WebSocket endpoint; only the websocket transport is ever used
    pub fn endpoint_url(&self) -> Result<String, ConfigError> {
        let url = self.server_url.trim();
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| ConfigError::InvalidUrl(url.to_string()))?;

        let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            _ => return Err(ConfigError::InvalidUrl(url.to_string())),
        };

        let host = rest.trim_end_matches('/');
        if host.is_empty() {
            return Err(ConfigError::InvalidUrl(url.to_string()));
        }

        let path = self.socketio_path.trim_matches('/');
        Ok(format!(
            "{ws_scheme}://{host}/{path}/?EIO={}&transport=websocket",
            crate::terminal::protocol::ENGINE_IO_VERSION
        ))
    }

    pub fn terminal_theme(&self) -> Result<TerminalTheme, ConfigError> {
        Ok(TerminalTheme {
            background: parse_color(&self.theme.background)?,
            foreground: parse_color(&self.theme.foreground)?,
            cursor_blink: self.theme.cursor_blink,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn client_options(&self) -> Result<ClientOptions, ConfigError> {
        let mut options = ClientOptions::new(self.endpoint_url()?);
        options.namespace = self.namespace.clone();
        options.reconnection = self.reconnection.enabled;
        options.reconnection_attempts = self.reconnection.attempts;
        options.reconnection_delay = Duration::from_millis(self.reconnection.delay_ms);
        Ok(options)
    }
}

fn parse_color(value: &str) -> Result<Color, ConfigError> {
    Color::from_str(value).map_err(|_| ConfigError::InvalidColor(value.to_string()))
}
