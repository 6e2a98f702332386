//! Resource prioritization hints
//!
//! Marks critical resources with `Priority: u=1, i` and `X-LCP-Resource`, and
//! advertises them as preloads on HTML pages.

use async_trait::async_trait;
use beacon_core::{Body, Error, Middleware, Next, Result};
use http::header::{HeaderName, HeaderValue, LINK};
use http::{Request, Response};
use std::collections::HashSet;

const PRIORITY: HeaderName = HeaderName::from_static("priority");
const LCP_RESOURCE: HeaderName = HeaderName::from_static("x-lcp-resource");

/// Priority hints middleware
#[derive(Debug, Clone)]
pub struct PriorityHints {
    critical: HashSet<String>,
    preload: Option<HeaderValue>,
}

impl PriorityHints {
    /// Create the middleware for a list of critical resources
    pub fn new(critical_resources: &[String]) -> Result<Self> {
        let preload = if critical_resources.is_empty() {
            None
        } else {
            let links = critical_resources
                .iter()
                .map(|resource| preload_link(resource))
                .collect::<Vec<_>>()
                .join(", ");
            Some(HeaderValue::from_str(&links).map_err(|e| {
                Error::Config(format!("Invalid critical resource in preload list: {e}"))
            })?)
        };

        Ok(Self {
            critical: critical_resources.iter().cloned().collect(),
            preload,
        })
    }

    /// The preload `Link` value sent with HTML pages
    pub fn preload_header(&self) -> Option<&HeaderValue> {
        self.preload.as_ref()
    }
}

/// Build one `Link` entry for `resource`
pub fn preload_link(resource: &str) -> String {
    let kind = if resource.contains(".woff2") {
        "font"
    } else if resource.contains(".webp") {
        "image"
    } else {
        "style"
    };

    if kind == "font" {
        format!("<{resource}>; rel=preload; as={kind}; crossorigin")
    } else {
        format!("<{resource}>; rel=preload; as={kind}")
    }
}

#[async_trait]
impl Middleware for PriorityHints {
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>> {
        let path = req.uri().path();
        let is_critical = path == "/" || self.critical.contains(path);
        let is_page = path == "/" || path.ends_with(".html");

        let mut response = next.run(req).await?;
        let headers = response.headers_mut();

        if is_critical {
            headers.insert(PRIORITY, HeaderValue::from_static("u=1, i"));
            headers.insert(LCP_RESOURCE, HeaderValue::from_static("true"));
        }
        if is_page {
            if let Some(preload) = &self.preload {
                headers.insert(LINK, preload.clone());
            }
        }

        Ok(response)
    }
}
