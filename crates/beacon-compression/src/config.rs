//! Configuration for response compression

use crate::encoding::ContentEncoding;
use beacon_core::{Error, Result};
use http::header::{HeaderMap, HeaderName, ACCEPT_ENCODING};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Compression configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompressionConfig {
    /// Enable compression
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Path extensions that are never compressed (already-compressed media)
    #[serde(default = "default_exempt_extensions")]
    pub exempt_extensions: Vec<String>,

    /// Diagnostic header set to `true` on compressed responses
    #[serde(default = "default_marker_header")]
    pub marker_header: Option<String>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            exempt_extensions: default_exempt_extensions(),
            marker_header: default_marker_header(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_exempt_extensions() -> Vec<String> {
    [
        ".jpg", ".jpeg", ".png", ".gif", ".webp", ".ico", ".mp4", ".webm",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}

fn default_marker_header() -> Option<String> {
    Some("x-compression-enabled".to_string())
}

/// Immutable, validated form of [`CompressionConfig`]
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct CompressionPolicy {
    enabled: bool,
    exempt: HashSet<String>,
    marker: Option<HeaderName>,
}

impl CompressionPolicy {
    /// Validate a configuration and compile it into a policy
    pub fn from_config(config: &CompressionConfig) -> Result<Self> {
        let exempt = config
            .exempt_extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .collect::<Result<HashSet<_>>>()?;

        let marker = config
            .marker_header
            .as_deref()
            .map(|name| {
                HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| {
                    Error::Config(format!("Invalid compression marker header '{name}': {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            enabled: config.enabled,
            exempt,
            marker,
        })
    }

    /// Whether compression is enabled at all
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Diagnostic header name, if configured
    pub fn marker_header(&self) -> Option<&HeaderName> {
        self.marker.as_ref()
    }

    /// Check whether a request path points at an exempt file type
    pub fn is_exempt(&self, path: &str) -> bool {
        extension_of(path).is_some_and(|ext| self.exempt.contains(&ext))
    }

    /// Decide the encoding for a request, `None` meaning passthrough
    pub fn select(&self, path: &str, request_headers: &HeaderMap) -> Option<ContentEncoding> {
        if !self.enabled || self.is_exempt(path) {
            return None;
        }

        let accept = request_headers
            .get_all(ACCEPT_ENCODING)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join(", ");

        ContentEncoding::negotiate(&accept)
    }
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            exempt: default_exempt_extensions().into_iter().collect(),
            marker: Some(HeaderName::from_static("x-compression-enabled")),
        }
    }
}

fn normalize_extension(ext: &str) -> Result<String> {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() || trimmed.contains(['/', '.', '?']) {
        return Err(Error::Config(format!(
            "Invalid exempt extension: '{ext}'"
        )));
    }
    Ok(format!(".{}", trimmed.to_ascii_lowercase()))
}

/// Lower-cased extension (with leading dot) of the last path segment
///
/// Query and fragment are ignored.
pub fn extension_of(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        // Dotfiles such as `/.htaccess` have no extension
        Some(0) | None => None,
        Some(idx) => Some(file[idx..].to_ascii_lowercase()),
    }
}
