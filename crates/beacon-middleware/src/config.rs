//! Configuration for the site middleware

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Asset handling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetsConfig {
    /// Resources that gate the largest contentful paint
    ///
    /// Local paths are matched against request paths; absolute URLs only
    /// appear in preload hints.
    #[serde(default = "default_critical_resources")]
    pub critical_resources: Vec<String>,

    /// Critical CSS file, relative to the site root
    #[serde(default = "default_critical_css")]
    pub critical_css: PathBuf,

    /// Emit `Priority`, `X-LCP-Resource` and preload `Link` headers
    #[serde(default = "default_true")]
    pub priority_hints: bool,

    /// Inline the critical CSS into the index page
    #[serde(default = "default_true")]
    pub inline_critical_css: bool,

    /// Serve `*.min.css` in place of `*.css` when available
    #[serde(default = "default_true")]
    pub rewrite_minified_css: bool,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            critical_resources: default_critical_resources(),
            critical_css: default_critical_css(),
            priority_hints: true,
            inline_critical_css: true,
            rewrite_minified_css: true,
        }
    }
}

fn default_critical_resources() -> Vec<String> {
    [
        "/css/critical.css",
        "/img/bg-circle.webp",
        "/img/bg-triangle.webp",
        "/img/bg-bottom.webp",
        "https://fonts.gstatic.com/s/jost/v14/92zatBhPNqw73oDd4iYl.woff2",
        "https://fonts.gstatic.com/s/heebo/v21/NGS6v5_NC0k9P9H0TbFzsQ.woff2",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_critical_css() -> PathBuf {
    PathBuf::from("css/critical.css")
}

fn default_true() -> bool {
    true
}

/// Cache-Control configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Set Cache-Control headers
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Freshness of critical resources
    #[serde(default = "default_day", with = "humantime_serde")]
    pub critical_max_age: Duration,

    /// Stale-while-revalidate window of critical resources
    #[serde(default = "default_week", with = "humantime_serde")]
    pub critical_stale_while_revalidate: Duration,

    /// Freshness of images
    #[serde(default = "default_week", with = "humantime_serde")]
    pub image_max_age: Duration,

    /// Freshness of stylesheets and scripts
    #[serde(default = "default_day", with = "humantime_serde")]
    pub asset_max_age: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            critical_max_age: default_day(),
            critical_stale_while_revalidate: default_week(),
            image_max_age: default_week(),
            asset_max_age: default_day(),
        }
    }
}

fn default_day() -> Duration {
    Duration::from_secs(86_400)
}

fn default_week() -> Duration {
    Duration::from_secs(604_800)
}
