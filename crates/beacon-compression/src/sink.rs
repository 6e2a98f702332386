//! Response transports: the write/finalize capability an interceptor wraps

use async_trait::async_trait;
use beacon_core::{Body, Error, Result};
use bytes::{Bytes, BytesMut};
use http::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::response::Parts;
use http::Response;

/// Write side of an HTTP response
///
/// A response is written as zero or more `write` calls followed by exactly
/// one `end`. Headers must be in place before the first body byte.
#[async_trait]
pub trait ResponseSink: Send {
    /// Response headers, still mutable until body bytes are sent
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Send a body chunk
    async fn write(&mut self, chunk: Bytes) -> Result<()>;

    /// Finalize the response, optionally sending one last chunk
    async fn end(&mut self, chunk: Option<Bytes>) -> Result<()>;
}

/// In-memory transport that materializes into an [`http::Response`]
#[derive(Debug)]
pub struct BufferedResponse {
    parts: Parts,
    body: BytesMut,
    writes: usize,
    finished: bool,
}

impl BufferedResponse {
    /// Start a response from already-built head parts
    pub fn new(parts: Parts) -> Self {
        Self {
            parts,
            body: BytesMut::new(),
            writes: 0,
            finished: false,
        }
    }

    /// Response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Body bytes received so far
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Number of non-empty `write` calls received
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Build the final response, fixing up the framing headers
    pub fn into_response(self) -> Result<Response<Body>> {
        if !self.finished {
            return Err(Error::Internal(
                "Response body was never finalized".to_string(),
            ));
        }

        let mut parts = self.parts;
        let body = self.body.freeze();

        parts
            .headers
            .insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        // Body is sent with a known length
        parts.headers.remove(TRANSFER_ENCODING);

        Ok(Response::from_parts(parts, Body::from(body)))
    }
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self::new(Response::new(()).into_parts().0)
    }
}

#[async_trait]
impl ResponseSink for BufferedResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        if self.finished {
            return Err(Error::ResponseFinished);
        }
        if !chunk.is_empty() {
            self.writes += 1;
            self.body.extend_from_slice(&chunk);
        }
        Ok(())
    }

    async fn end(&mut self, chunk: Option<Bytes>) -> Result<()> {
        if self.finished {
            return Err(Error::ResponseFinished);
        }
        if let Some(chunk) = chunk {
            self.body.extend_from_slice(&chunk);
        }
        self.finished = true;
        Ok(())
    }
}
