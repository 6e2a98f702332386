//! Compression middleware: runs the interceptor over downstream responses

use crate::config::{CompressionConfig, CompressionPolicy};
use crate::interceptor::CompressionInterceptor;
use crate::sink::{BufferedResponse, ResponseSink};
use async_trait::async_trait;
use beacon_core::middleware::{Body, Middleware, Next};
use beacon_core::Result;
use http::{header, Request, Response};
use http_body_util::BodyExt;
use std::sync::Arc;
use tracing::debug;

/// Compression middleware
#[derive(Debug, Clone)]
pub struct CompressionMiddleware {
    policy: Arc<CompressionPolicy>,
}

impl CompressionMiddleware {
    /// Create a new compression middleware
    pub fn new(policy: CompressionPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    /// Validate `config` and create the middleware
    pub fn from_config(config: &CompressionConfig) -> Result<Self> {
        Ok(Self::new(CompressionPolicy::from_config(config)?))
    }

    /// The policy applied to every request
    pub fn policy(&self) -> &CompressionPolicy {
        &self.policy
    }
}

impl Default for CompressionMiddleware {
    fn default() -> Self {
        Self::new(CompressionPolicy::default())
    }
}

#[async_trait]
impl Middleware for CompressionMiddleware {
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>> {
        if !self.policy.is_enabled() {
            return next.run(req).await;
        }

        let path = req.uri().path().to_string();
        let request_headers = req.headers().clone();

        let response = next.run(req).await?;

        // Downstream already encoded the body
        if response.headers().contains_key(header::CONTENT_ENCODING) {
            debug!(path = %path, "Response already encoded, skipping compression");
            return Ok(response);
        }

        let (parts, body) = response.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        let mut interceptor = CompressionInterceptor::new(
            BufferedResponse::new(parts),
            &self.policy,
            &path,
            &request_headers,
        );
        interceptor.end(Some(body)).await?;
        interceptor.into_inner().into_response()
    }
}
