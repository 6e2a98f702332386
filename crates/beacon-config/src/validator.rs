//! Configuration validation

use crate::Config;
use beacon_compression::CompressionPolicy;
use beacon_core::{Error, Result};
use beacon_css::Safelist;
use beacon_middleware::{CacheControl, PriorityHints};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_compression(config)?;
    validate_assets(config)?;
    validate_css(config)?;
    validate_logging(config)?;

    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    let server = &config.server;

    if server.site_root.as_os_str().is_empty() {
        return Err(Error::Config("site_root cannot be empty".to_string()));
    }

    if !server.site_root.is_dir() {
        tracing::warn!(
            site_root = %server.site_root.display(),
            "Site root is not an existing directory"
        );
    }

    if server.index_file.is_empty() {
        return Err(Error::Config("index_file cannot be empty".to_string()));
    }

    if server.index_file.contains('/') || server.index_file.contains('\\') {
        return Err(Error::Config(format!(
            "index_file must be a file name, got '{}'",
            server.index_file
        )));
    }

    if server.shutdown_timeout.is_zero() {
        return Err(Error::Config("shutdown_timeout must be > 0".to_string()));
    }

    if server.shutdown_timeout.as_secs() > 300 {
        tracing::warn!("shutdown_timeout is very high (>5 minutes)");
    }

    Ok(())
}

fn validate_compression(config: &Config) -> Result<()> {
    // Same checks the middleware applies at startup
    CompressionPolicy::from_config(&config.compression)?;
    Ok(())
}

fn validate_assets(config: &Config) -> Result<()> {
    let assets = &config.assets;

    for resource in &assets.critical_resources {
        if !resource.starts_with('/') && !resource.contains("://") {
            return Err(Error::Config(format!(
                "critical resource '{resource}' must be an absolute path or URL"
            )));
        }
    }

    if assets.priority_hints {
        PriorityHints::new(&assets.critical_resources)?;
    }

    if config.cache.enabled {
        CacheControl::new(&config.cache, &assets.critical_resources)?;
    }

    if assets.inline_critical_css && assets.critical_css.as_os_str().is_empty() {
        return Err(Error::Config(
            "critical_css cannot be empty when inlining is enabled".to_string(),
        ));
    }

    Ok(())
}

fn validate_css(config: &Config) -> Result<()> {
    for target in &config.css.minify {
        if target.input.as_os_str().is_empty() || target.output.as_os_str().is_empty() {
            return Err(Error::Config(
                "minify targets need both input and output".to_string(),
            ));
        }
    }

    let purge = &config.css.purge;
    if purge.content.is_empty() {
        tracing::warn!("Purge has no content globs, every class selector would be removed");
    }
    if purge.css.iter().any(|path| path.as_os_str().is_empty()) {
        return Err(Error::Config("purge css entries cannot be empty".to_string()));
    }
    if purge.output.as_os_str().is_empty() {
        return Err(Error::Config("purge output cannot be empty".to_string()));
    }

    Safelist::new(purge.safelist.as_slice(), purge.safelist_patterns.as_slice())?;

    Ok(())
}

fn validate_logging(config: &Config) -> Result<()> {
    if config.logging.level.trim().is_empty() {
        return Err(Error::Config("logging level cannot be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_valid_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_site_root() {
        let mut config = Config::default();
        config.server.site_root = PathBuf::new();
        assert!(matches!(validate_config(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_index_file_with_directory() {
        let mut config = Config::default();
        config.server.index_file = "pages/index.html".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_shutdown_timeout() {
        let mut config = Config::default();
        config.server.shutdown_timeout = Duration::ZERO;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_marker_header() {
        let mut config = Config::default();
        config.compression.marker_header = Some("bad header".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_exempt_extension() {
        let mut config = Config::default();
        config.compression.exempt_extensions = vec!["img/jpg".to_string()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_relative_critical_resource() {
        let mut config = Config::default();
        config.assets.critical_resources = vec!["css/critical.css".to_string()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_safelist_pattern() {
        let mut config = Config::default();
        config.css.purge.safelist_patterns = vec!["^owl-(".to_string()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_minify_target() {
        let mut config = Config::default();
        config.css.minify = vec![beacon_css::MinifyTarget::new("", "out.css")];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_log_level() {
        let mut config = Config::default();
        config.logging.level = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }
}
