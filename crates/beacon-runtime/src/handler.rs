//! HTTP request handler

use beacon_core::{Body, Endpoint, Error, Middleware, Next};
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Method, Request, Response};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// HTTP request handler
///
/// Runs every request through the middleware chain and the endpoint at its
/// end. Errors escaping the chain become plain-text error responses.
#[derive(Clone)]
pub struct RequestHandler {
    middleware_chain: Arc<[Arc<dyn Middleware>]>,
    endpoint: Arc<dyn Endpoint>,
    request_count: Arc<AtomicUsize>,
    active_requests: Arc<AtomicUsize>,
}

impl std::fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandler")
            .field("request_count", &self.request_count)
            .field("active_requests", &self.active_requests)
            .field("middleware_count", &self.middleware_chain.len())
            .finish()
    }
}

/// Decrements the active request gauge when the request finishes or is dropped
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RequestHandler {
    /// Create a new request handler
    pub fn new(middleware_chain: Arc<[Arc<dyn Middleware>]>, endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            middleware_chain,
            endpoint,
            request_count: Arc::new(AtomicUsize::new(0)),
            active_requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Total requests handled
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Requests currently in flight
    pub fn active_requests(&self) -> usize {
        self.active_requests.load(Ordering::SeqCst)
    }

    /// Handle an incoming HTTP request (from Hyper with Incoming body)
    pub async fn handle(&self, req: Request<Incoming>) -> Response<Body> {
        let (parts, body) = req.into_parts();
        let body_bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                let error = Error::InvalidRequest(format!("Failed to read request body: {e}"));
                return error_response(&error);
            }
        };

        self.dispatch(Request::from_parts(parts, Full::new(body_bytes)))
            .await
    }

    /// Run a buffered request through the chain
    ///
    /// HEAD requests travel the chain like GET so that every header is
    /// computed over the real body; the body is dropped afterwards.
    pub async fn dispatch(&self, req: Request<Body>) -> Response<Body> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let _active = ActiveGuard::enter(&self.active_requests);

        let method = req.method().clone();
        let path = req.uri().path().to_string();

        debug!(
            method = %method,
            path = %path,
            middleware_count = self.middleware_chain.len(),
            "Handling request"
        );

        let next = Next::new(
            Arc::clone(&self.middleware_chain),
            Arc::clone(&self.endpoint),
        );

        let response = match next.run(req).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    method = %method,
                    path = %path,
                    error = %e,
                    "Request handler error"
                );
                error_response(&e)
            }
        };

        if method == Method::HEAD {
            let (parts, _) = response.into_parts();
            return Response::from_parts(parts, Body::default());
        }

        response
    }
}

/// Create an error response
fn error_response(error: &Error) -> Response<Body> {
    let status = error.to_status_code();
    let message = status.canonical_reason().unwrap_or("Error");

    let mut response = Response::new(Full::new(Bytes::from(message)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
