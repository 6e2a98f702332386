//! Configuration builder

use crate::types::{Config, LogFormat};
use beacon_compression::CompressionConfig;
use beacon_core::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Builder for constructing configuration programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set listen address
    pub fn listen(mut self, addr: SocketAddr) -> Self {
        self.config.server.listen = addr;
        self
    }

    /// Set only the listen port
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.listen.set_port(port);
        self
    }

    /// Set the site root directory
    pub fn site_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.server.site_root = root.into();
        self
    }

    /// Set the graceful shutdown timeout
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.server.shutdown_timeout = timeout;
        self
    }

    /// Set compression configuration
    pub fn compression(mut self, compression: CompressionConfig) -> Self {
        self.config.compression = compression;
        self
    }

    /// Set log level and format
    pub fn logging(mut self, level: impl Into<String>, format: LogFormat) -> Self {
        self.config.logging.level = level.into();
        self.config.logging.format = format;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<Config> {
        crate::validator::validate_config(&self.config)?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();

        let config = ConfigBuilder::new()
            .listen(addr)
            .site_root("/srv/site")
            .logging("debug", LogFormat::Json)
            .build()
            .unwrap();

        assert_eq!(config.server.listen, addr);
        assert_eq!(config.server.site_root, PathBuf::from("/srv/site"));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_builder_port_keeps_host() {
        let config = ConfigBuilder::new().port(3000).build().unwrap();
        assert_eq!(config.server.listen.to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_builder_validates() {
        let result = ConfigBuilder::new()
            .shutdown_timeout(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }
}
