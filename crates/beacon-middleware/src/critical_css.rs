//! Critical CSS inlining for the index page

use async_trait::async_trait;
use beacon_core::{Body, Middleware, Next, Result};
use beacon_css::critical::{inject_lcp_monitor, inline_critical_css, HEAD_CLOSE};
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_LENGTH};
use http::{Request, Response};
use http_body_util::BodyExt;
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Inlines the critical stylesheet and the LCP monitor into the index page
#[derive(Debug, Clone)]
pub struct CriticalCssInliner {
    css_path: PathBuf,
}

impl CriticalCssInliner {
    /// Create the inliner reading the stylesheet from `css_path`
    pub fn new(css_path: impl Into<PathBuf>) -> Self {
        Self {
            css_path: css_path.into(),
        }
    }

    /// Whether a request path addresses the index page
    pub fn applies_to(path: &str) -> bool {
        path == "/" || path.ends_with("index.html")
    }

    async fn read_css(&self) -> io::Result<String> {
        match tokio::fs::read_to_string(&self.css_path).await {
            Ok(css) => Ok(css),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Middleware for CriticalCssInliner {
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>> {
        if !Self::applies_to(req.uri().path()) {
            return next.run(req).await;
        }

        let response = next.run(req).await?;
        if !response.status().is_success() {
            return Ok(response);
        }

        let (mut parts, body) = response.into_parts();
        let bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        let html = match std::str::from_utf8(&bytes) {
            Ok(html) if html.contains(HEAD_CLOSE) => html,
            _ => return Ok(Response::from_parts(parts, Body::from(bytes))),
        };

        let css = match self.read_css().await {
            Ok(css) => css,
            Err(e) => {
                warn!(
                    path = %self.css_path.display(),
                    error = %e,
                    "Failed to read critical CSS, serving page unchanged"
                );
                return Ok(Response::from_parts(parts, Body::from(bytes)));
            }
        };

        let html = inline_critical_css(html, &css).unwrap_or_else(|| html.to_string());
        let html = inject_lcp_monitor(&html).unwrap_or(html);
        debug!(
            css_bytes = css.len(),
            page_bytes = html.len(),
            "Inlined critical CSS"
        );

        parts
            .headers
            .insert(CONTENT_LENGTH, HeaderValue::from(html.len()));
        Ok(Response::from_parts(parts, Body::from(Bytes::from(html))))
    }
}
