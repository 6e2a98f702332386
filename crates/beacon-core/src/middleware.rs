//! Middleware chain: `Middleware` layers wrapped around a terminal `Endpoint`

use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Body type alias
///
/// Bodies are fully buffered: every layer sees the complete payload.
pub type Body = Full<Bytes>;

/// Middleware trait for request/response processing
#[async_trait]
pub trait Middleware: Send + Sync + fmt::Debug {
    /// Process a request
    ///
    /// # Arguments
    ///
    /// * `req` - The incoming HTTP request
    /// * `next` - The rest of the chain, ending in the endpoint
    ///
    /// # Returns
    ///
    /// Returns the HTTP response or an error
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>>;
}

/// Terminal handler at the end of a middleware chain
#[async_trait]
pub trait Endpoint: Send + Sync + fmt::Debug {
    /// Produce the response for a request that made it through every layer
    async fn serve(&self, req: Request<Body>) -> Result<Response<Body>>;
}

/// Endpoint backed by an async closure, see [`endpoint_fn`]
pub struct FnEndpoint<F> {
    f: F,
}

impl<F> fmt::Debug for FnEndpoint<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEndpoint").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Endpoint for FnEndpoint<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Body>>> + Send,
{
    async fn serve(&self, req: Request<Body>) -> Result<Response<Body>> {
        (self.f)(req).await
    }
}

/// Wrap an async closure as an [`Endpoint`]
pub fn endpoint_fn<F, Fut>(f: F) -> Arc<dyn Endpoint>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<Body>>> + Send + 'static,
{
    Arc::new(FnEndpoint { f })
}

/// Represents the next middleware or the endpoint in the chain
pub struct Next {
    stack: Arc<[Arc<dyn Middleware>]>,
    index: usize,
    endpoint: Option<Arc<dyn Endpoint>>,
}

impl Next {
    /// Create a chain that ends in `endpoint`
    pub fn new(stack: Arc<[Arc<dyn Middleware>]>, endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            stack,
            index: 0,
            endpoint: Some(endpoint),
        }
    }

    /// Create a chain with no endpoint
    ///
    /// Running past the last middleware is an error.
    pub fn without_endpoint(stack: Arc<[Arc<dyn Middleware>]>) -> Self {
        Self {
            stack,
            index: 0,
            endpoint: None,
        }
    }

    /// Run the next middleware or the endpoint
    pub async fn run(self, req: Request<Body>) -> Result<Response<Body>> {
        match self.stack.get(self.index) {
            Some(middleware) => {
                let middleware = Arc::clone(middleware);
                let next = Self {
                    stack: Arc::clone(&self.stack),
                    index: self.index + 1,
                    endpoint: self.endpoint,
                };
                middleware.call(req, next).await
            }
            None => match self.endpoint {
                Some(endpoint) => endpoint.serve(req).await,
                None => Err(Error::Internal(
                    "Middleware chain completed without endpoint".to_string(),
                )),
            },
        }
    }
}

impl Clone for Next {
    fn clone(&self) -> Self {
        Self {
            stack: Arc::clone(&self.stack),
            index: self.index,
            endpoint: self.endpoint.clone(),
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("remaining", &(self.stack.len().saturating_sub(self.index)))
            .field("has_endpoint", &self.endpoint.is_some())
            .finish()
    }
}
