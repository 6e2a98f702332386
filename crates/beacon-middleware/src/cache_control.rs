//! Cache-Control headers by resource type

use crate::config::CacheConfig;
use async_trait::async_trait;
use beacon_compression::extension_of;
use beacon_core::{Body, Error, Middleware, Next, Result};
use http::header::{HeaderValue, CACHE_CONTROL};
use http::{Request, Response};
use std::collections::HashSet;

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".ico"];
const ASSET_EXTENSIONS: &[&str] = &[".css", ".js"];

/// Cache-Control middleware
///
/// Critical resources get a short freshness with a long revalidation window,
/// images and static assets are cached publicly, HTML is never cached.
#[derive(Debug, Clone)]
pub struct CacheControl {
    critical: HashSet<String>,
    critical_value: HeaderValue,
    image_value: HeaderValue,
    asset_value: HeaderValue,
}

impl CacheControl {
    /// Create the middleware
    pub fn new(config: &CacheConfig, critical_resources: &[String]) -> Result<Self> {
        Ok(Self {
            critical: critical_resources.iter().cloned().collect(),
            critical_value: header_value(format!(
                "public, max-age={}, stale-while-revalidate={}",
                config.critical_max_age.as_secs(),
                config.critical_stale_while_revalidate.as_secs()
            ))?,
            image_value: header_value(public_max_age(config.image_max_age.as_secs()))?,
            asset_value: header_value(public_max_age(config.asset_max_age.as_secs()))?,
        })
    }

    /// Cache-Control value for a request path, `None` to leave it unset
    pub fn policy_for(&self, path: &str) -> Option<HeaderValue> {
        if self.critical.contains(path) {
            return Some(self.critical_value.clone());
        }

        let ext = extension_of(path)?;
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(self.image_value.clone())
        } else if ASSET_EXTENSIONS.contains(&ext.as_str()) {
            Some(self.asset_value.clone())
        } else if ext == ".html" {
            Some(HeaderValue::from_static("no-cache, no-store, must-revalidate"))
        } else {
            None
        }
    }
}

fn public_max_age(secs: u64) -> String {
    format!("public, max-age={secs}")
}

fn header_value(value: String) -> Result<HeaderValue> {
    HeaderValue::try_from(value)
        .map_err(|e| Error::Config(format!("Invalid Cache-Control value: {e}")))
}

#[async_trait]
impl Middleware for CacheControl {
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>> {
        let policy = self.policy_for(req.uri().path());
        let mut response = next.run(req).await?;

        // Error pages are not worth caching
        if let Some(value) = policy.filter(|_| response.status().is_success()) {
            response.headers_mut().insert(CACHE_CONTROL, value);
        }

        Ok(response)
    }
}
