//! Configuration management for quotesheet.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name under the platform config dir.
const APP_DIR_NAME: &str = "quotesheet";

/// Default data file name, relative to the static root.
pub const DATA_FILE_NAME: &str = "data.json";

/// Environment variable prefix.
const ENV_PREFIX: &str = "QUOTESHEET_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `QUOTESHEET_`, sections split on `__`)
/// 2. TOML config file at `~/.config/quotesheet/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Data file configuration.
    pub storage: StorageConfig,
    /// Save client configuration.
    pub client: ClientConfig,
    /// Document rendering configuration.
    pub render: RenderConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory static assets are served from.
    pub static_dir: PathBuf,
    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,
}

/// Data file configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the quote document.
    /// Defaults to `data.json` inside the static directory.
    pub data_file: Option<PathBuf>,
}

/// Save client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the quotesheet server.
    pub server_url: String,
    /// Where fallback downloads are written.
    /// Defaults to the user's download directory.
    pub download_dir: Option<PathBuf>,
    /// Interval between liveness probes in milliseconds.
    pub poll_interval_ms: u64,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

/// Document rendering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// `lang` attribute of generated pages.
    pub lang: String,
    /// Text direction of generated pages (`rtl` or `ltr`).
    pub dir: String,
    /// Page title, also shown when the quote has no title.
    pub page_title: String,
    /// Label of the total row.
    pub total_label: String,
    /// Table column headings: group, type, origin, price, notes.
    pub headings: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            static_dir: PathBuf::from("public"),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000".to_string(),
            download_dir: None, // Resolved at runtime
            poll_interval_ms: 5_000,
            request_timeout_ms: 3_000,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            lang: "ar".to_string(),
            dir: "rtl".to_string(),
            page_title: "عرض سعر".to_string(),
            total_label: "الإجمالي".to_string(),
            headings: default_headings(),
        }
    }
}

fn default_headings() -> Vec<String> {
    ["البند", "النوع", "المنشأ", "السعر", "ملاحظات"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default fallback download directory.
    #[must_use]
    pub fn default_download_dir() -> PathBuf {
        dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::config("server.port must be greater than 0"));
        }

        if self.server.max_body_bytes == 0 {
            return Err(Error::config("server.max_body_bytes must be greater than 0"));
        }

        if self.client.poll_interval_ms == 0 {
            return Err(Error::config("client.poll_interval_ms must be greater than 0"));
        }

        if self.client.request_timeout_ms == 0 {
            return Err(Error::config(
                "client.request_timeout_ms must be greater than 0",
            ));
        }

        if let Err(e) = reqwest::Url::parse(&self.client.server_url) {
            return Err(Error::config(format!(
                "client.server_url '{}' is not a valid URL: {e}",
                self.client.server_url
            )));
        }

        if self.render.headings.len() != 5 {
            return Err(Error::config(format!(
                "render.headings must have 5 entries, found {}",
                self.render.headings.len()
            )));
        }

        if !matches!(self.render.dir.as_str(), "rtl" | "ltr" | "auto") {
            return Err(Error::config(format!(
                "render.dir must be rtl, ltr or auto, found '{}'",
                self.render.dir
            )));
        }

        Ok(())
    }

    /// Get the data file path, resolving defaults if not set.
    #[must_use]
    pub fn data_file(&self) -> PathBuf {
        self.storage
            .data_file
            .clone()
            .unwrap_or_else(|| self.server.static_dir.join(DATA_FILE_NAME))
    }

    /// Get the fallback download directory, resolving defaults if not set.
    #[must_use]
    pub fn download_dir(&self) -> PathBuf {
        self.client
            .download_dir
            .clone()
            .unwrap_or_else(Self::default_download_dir)
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Base URL operators should open in a browser.
    #[must_use]
    pub fn public_url(&self) -> String {
        let host = match self.server.host.as_str() {
            "127.0.0.1" | "0.0.0.0" | "::" | "::1" => "localhost",
            other => other,
        };
        format!("http://{host}:{}", self.server.port)
    }

    /// Get the liveness poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.client.poll_interval_ms)
    }

    /// Get the client request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.client.request_timeout_ms)
    }
}
