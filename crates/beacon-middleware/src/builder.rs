//! Middleware chain builder
//!
//! This module provides a builder pattern for constructing middleware chains.

use crate::*;
use beacon_compression::{CompressionConfig, CompressionMiddleware};
use beacon_core::Result;
use std::path::Path;
use std::sync::Arc;

/// Middleware chain builder
#[derive(Debug, Default)]
pub struct MiddlewareBuilder {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareBuilder {
    /// Create a new middleware builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Assemble the standard site chain
    ///
    /// Order, outermost first: request logging, compression, priority hints,
    /// cache control, critical CSS inlining, minified CSS rewrite.
    pub fn site(
        site_root: &Path,
        request_log: &RequestLogConfig,
        compression: &CompressionConfig,
        assets: &AssetsConfig,
        cache: &CacheConfig,
    ) -> Result<Self> {
        let mut builder = Self::new()
            .with_logging(request_log.clone())
            .with_compression(compression)?;

        if assets.priority_hints {
            builder = builder.with_priority_hints(&assets.critical_resources)?;
        }
        if cache.enabled {
            builder = builder.with_cache_control(cache, &assets.critical_resources)?;
        }
        if assets.inline_critical_css {
            builder = builder.with_critical_css(site_root.join(&assets.critical_css));
        }
        if assets.rewrite_minified_css {
            builder = builder.with_minified_css(site_root);
        }

        Ok(builder)
    }

    /// Add request logging middleware
    #[must_use]
    pub fn with_logging(mut self, config: RequestLogConfig) -> Self {
        self.middlewares
            .push(Arc::new(RequestLogger::with_config(config)));
        self
    }

    /// Add Compression middleware
    pub fn with_compression(mut self, config: &CompressionConfig) -> Result<Self> {
        self.middlewares
            .push(Arc::new(CompressionMiddleware::from_config(config)?));
        Ok(self)
    }

    /// Add Priority hints middleware
    pub fn with_priority_hints(mut self, critical_resources: &[String]) -> Result<Self> {
        self.middlewares
            .push(Arc::new(PriorityHints::new(critical_resources)?));
        Ok(self)
    }

    /// Add Cache-Control middleware
    pub fn with_cache_control(
        mut self,
        config: &CacheConfig,
        critical_resources: &[String],
    ) -> Result<Self> {
        self.middlewares
            .push(Arc::new(CacheControl::new(config, critical_resources)?));
        Ok(self)
    }

    /// Add Critical CSS inlining middleware
    #[must_use]
    pub fn with_critical_css(mut self, css_path: impl Into<std::path::PathBuf>) -> Self {
        self.middlewares
            .push(Arc::new(CriticalCssInliner::new(css_path)));
        self
    }

    /// Add Minified CSS rewrite middleware
    #[must_use]
    pub fn with_minified_css(mut self, site_root: impl Into<std::path::PathBuf>) -> Self {
        self.middlewares
            .push(Arc::new(MinifiedCssRewrite::new(site_root)));
        self
    }

    /// Add custom middleware
    #[must_use]
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Build the middleware chain
    ///
    /// Returns an `Arc<[Arc<dyn Middleware>]>` for efficient sharing.
    #[must_use]
    pub fn build(self) -> Arc<[Arc<dyn Middleware>]> {
        self.middlewares.into()
    }

    /// Get the number of middlewares in the chain
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if the chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}
