//! Configuration types

use beacon_compression::CompressionConfig;
use beacon_css::CssConfig;
use beacon_middleware::{AssetsConfig, CacheConfig, RequestLogConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Response compression
    #[serde(default)]
    pub compression: CompressionConfig,

    /// Critical resources and stylesheet handling
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Cache-Control headers
    #[serde(default)]
    pub cache: CacheConfig,

    /// Build-time CSS tooling
    #[serde(default)]
    pub css: CssConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-request access logging
    #[serde(default)]
    pub request_logging: RequestLogConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Directory the site is served from
    #[serde(default = "default_site_root")]
    pub site_root: PathBuf,

    /// File served for `/` and directory paths
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Graceful shutdown timeout (wait for in-flight requests)
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            site_root: default_site_root(),
            index_file: default_index_file(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level or filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Port used when neither a config file nor `PORT` says otherwise
pub const DEFAULT_PORT: u16 = 8000;

// Default functions
fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}

fn default_site_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_index_file() -> String {
    "index.html".to_string()
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_log_level() -> String {
    "info".to_string()
}
