//! # Beacon Middleware
//!
//! Site middleware collection:
//! - Request logging
//! - Priority hints and preload links for LCP-critical resources
//! - Cache-Control by resource type
//! - Critical CSS inlining into the index page
//! - Minified stylesheet rewriting
//!
//! Response compression lives in `beacon-compression` and is placed in the
//! chain by [`MiddlewareBuilder`].

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod builder;
pub mod cache_control;
pub mod config;
pub mod critical_css;
pub mod css_rewrite;
pub mod logging;
pub mod priority_hints;

pub use builder::MiddlewareBuilder;
pub use cache_control::CacheControl;
pub use config::{AssetsConfig, CacheConfig};
pub use critical_css::CriticalCssInliner;
pub use css_rewrite::MinifiedCssRewrite;
pub use logging::{RequestLogConfig, RequestLogger};
pub use priority_hints::PriorityHints;

// Re-export core middleware types from beacon-core
pub use beacon_core::middleware::{Middleware, Next};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::builder::MiddlewareBuilder;
    pub use crate::config::{AssetsConfig, CacheConfig};
    pub use crate::logging::{RequestLogConfig, RequestLogger};
    pub use beacon_compression::{CompressionConfig, CompressionMiddleware};
    pub use beacon_core::middleware::{Middleware, Next};
}
