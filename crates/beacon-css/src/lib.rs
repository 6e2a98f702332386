//! # Beacon CSS
//!
//! Build-time stylesheet tooling:
//! - Minification with rule merging, built on `lightningcss`
//! - Purging of selectors not referenced by the site's HTML
//! - Critical CSS placeholder management and `<head>` injection

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod critical;
pub mod minify;
pub mod purge;

pub use minify::{minify, minify_file, minify_targets, MinifyReport, MinifySummary, MinifyTarget};
pub use purge::{PurgeConfig, PurgeReport, Purger, Safelist};

use serde::{Deserialize, Serialize};

/// Stylesheet build configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CssConfig {
    /// Files minified by `minify-css`
    #[serde(default = "default_minify_targets")]
    pub minify: Vec<MinifyTarget>,

    /// Purge settings used by `purge-css`
    #[serde(default)]
    pub purge: PurgeConfig,
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            minify: default_minify_targets(),
            purge: PurgeConfig::default(),
        }
    }
}

fn default_minify_targets() -> Vec<MinifyTarget> {
    vec![
        MinifyTarget::new("css/style.css", "css/style.min.css"),
        MinifyTarget::new(
            "css/optimized/bootstrap.min.css",
            "css/optimized/bootstrap.min.css",
        ),
        MinifyTarget::new(
            "css/optimized/animate.min.css",
            "css/optimized/animate.min.css",
        ),
        MinifyTarget::new(
            "lib/owlcarousel/assets/owl.carousel.min.css",
            "lib/owlcarousel/assets/owl.carousel.min.css",
        ),
    ]
}
