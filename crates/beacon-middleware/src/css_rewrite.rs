//! Serve minified stylesheets in place of their sources

use async_trait::async_trait;
use beacon_core::{Body, Error, Middleware, Next, Result};
use http::uri::PathAndQuery;
use http::{Request, Response, Uri};
use std::path::PathBuf;
use tracing::info;

/// Rewrites `*.css` requests to `*.min.css` when the minified file exists
#[derive(Debug, Clone)]
pub struct MinifiedCssRewrite {
    site_root: PathBuf,
}

impl MinifiedCssRewrite {
    /// Create the middleware for files under `site_root`
    pub fn new(site_root: impl Into<PathBuf>) -> Self {
        Self {
            site_root: site_root.into(),
        }
    }

    /// Minified candidate for a request path, if the path is an unminified
    /// stylesheet
    pub fn minified_path(path: &str) -> Option<String> {
        if path.ends_with(".min.css") || path.contains("..") {
            return None;
        }
        path.strip_suffix(".css").map(|stem| format!("{stem}.min.css"))
    }

    async fn exists(&self, path: &str) -> bool {
        let file = self.site_root.join(path.trim_start_matches('/'));
        tokio::fs::metadata(&file)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }
}

/// Replace the path of `uri`, keeping its query
fn with_path(uri: &Uri, path: &str) -> Result<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        path_and_query
            .parse::<PathAndQuery>()
            .map_err(|e| Error::InvalidRequest(format!("Invalid rewritten path: {e}")))?,
    );
    Uri::from_parts(parts).map_err(|e| Error::InvalidRequest(format!("Invalid rewritten URI: {e}")))
}

#[async_trait]
impl Middleware for MinifiedCssRewrite {
    async fn call(&self, mut req: Request<Body>, next: Next) -> Result<Response<Body>> {
        if let Some(minified) = Self::minified_path(req.uri().path()) {
            if self.exists(&minified).await {
                info!(
                    original = req.uri().path(),
                    minified = %minified,
                    "Serving minified CSS"
                );
                let uri = with_path(req.uri(), &minified)?;
                *req.uri_mut() = uri;
            }
        }

        next.run(req).await
    }
}
