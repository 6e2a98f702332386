//! Per-request compression decorator

use crate::compressor::Compressor;
use crate::config::CompressionPolicy;
use crate::encoding::ContentEncoding;
use crate::sink::ResponseSink;
use async_trait::async_trait;
use beacon_core::{Error, Result};
use bytes::{Bytes, BytesMut};
use http::header::{HeaderMap, HeaderValue, CONTENT_ENCODING};
use std::fmt;
use tracing::{debug, trace};

enum Mode {
    /// Writes go straight to the inner transport
    Passthrough,
    /// Writes are buffered until `end`
    Compress {
        encoding: ContentEncoding,
        buffer: Vec<Bytes>,
    },
}

/// Response transport decorator that compresses the whole body on finalize
///
/// One instance per request. Eligibility and negotiation happen once in
/// [`CompressionInterceptor::new`]; after that the interceptor is either a
/// transparent passthrough or a buffer that is compressed and flushed to the
/// inner transport when [`ResponseSink::end`] is called.
pub struct CompressionInterceptor<S> {
    inner: S,
    mode: Mode,
    finished: bool,
}

impl<S: ResponseSink> CompressionInterceptor<S> {
    /// Wrap `inner` for a request to `path` with the given request headers
    ///
    /// When an encoding is negotiated, `Content-Encoding` and the policy's
    /// marker header are set on `inner` right away.
    pub fn new(
        mut inner: S,
        policy: &CompressionPolicy,
        path: &str,
        request_headers: &HeaderMap,
    ) -> Self {
        let mode = match policy.select(path, request_headers) {
            Some(encoding) => {
                let headers = inner.headers_mut();
                headers.insert(
                    CONTENT_ENCODING,
                    HeaderValue::from_static(encoding.as_str()),
                );
                if let Some(marker) = policy.marker_header() {
                    headers.insert(marker.clone(), HeaderValue::from_static("true"));
                }
                trace!(path, algorithm = encoding.as_str(), "Compression negotiated");
                Mode::Compress {
                    encoding,
                    buffer: Vec::new(),
                }
            }
            None => {
                trace!(path, "Compression skipped, passing through");
                Mode::Passthrough
            }
        };

        Self {
            inner,
            mode,
            finished: false,
        }
    }

    /// Negotiated encoding, `None` when passing through
    pub fn encoding(&self) -> Option<ContentEncoding> {
        match self.mode {
            Mode::Passthrough => None,
            Mode::Compress { encoding, .. } => Some(encoding),
        }
    }

    /// Bytes currently held in the response buffer
    pub fn buffered_len(&self) -> usize {
        match &self.mode {
            Mode::Passthrough => 0,
            Mode::Compress { buffer, .. } => buffer.iter().map(Bytes::len).sum(),
        }
    }

    /// Inner transport
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwrap the inner transport
    pub fn into_inner(self) -> S {
        self.inner
    }

    async fn flush_compressed(&mut self, encoding: ContentEncoding, buffer: Vec<Bytes>) -> Result<()> {
        let body = concat(buffer);
        let original_size = body.len();

        let output = tokio::task::spawn_blocking(move || Compressor::new(encoding).compress(&body))
            .await
            .map_err(|e| Error::Internal(format!("Compression task failed: {e}")))?
            .map_err(|e| Error::Compression(format!("{encoding} encoder failed: {e}")))?;

        let compressed_size: usize = output.iter().map(Bytes::len).sum();
        let chunks = output.len();

        for chunk in output {
            self.inner.write(chunk).await?;
        }
        self.inner.end(None).await?;

        debug!(
            algorithm = encoding.as_str(),
            original_size,
            compressed_size,
            chunks,
            "Response compressed"
        );
        Ok(())
    }
}

fn concat(mut buffer: Vec<Bytes>) -> Bytes {
    if buffer.len() == 1 {
        return buffer.remove(0);
    }
    let total = buffer.iter().map(Bytes::len).sum();
    let mut body = BytesMut::with_capacity(total);
    for chunk in &buffer {
        body.extend_from_slice(chunk);
    }
    body.freeze()
}

#[async_trait]
impl<S: ResponseSink> ResponseSink for CompressionInterceptor<S> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        if self.finished {
            return Err(Error::ResponseFinished);
        }
        match &mut self.mode {
            Mode::Passthrough => self.inner.write(chunk).await,
            Mode::Compress { buffer, .. } => {
                if !chunk.is_empty() {
                    buffer.push(chunk);
                }
                Ok(())
            }
        }
    }

    async fn end(&mut self, chunk: Option<Bytes>) -> Result<()> {
        if self.finished {
            return Err(Error::ResponseFinished);
        }
        self.finished = true;

        let (encoding, buffer) = match &mut self.mode {
            Mode::Passthrough => return self.inner.end(chunk).await,
            Mode::Compress { encoding, buffer } => {
                if let Some(chunk) = chunk.filter(|c| !c.is_empty()) {
                    buffer.push(chunk);
                }
                (*encoding, std::mem::take(buffer))
            }
        };

        if buffer.is_empty() {
            debug!(algorithm = encoding.as_str(), "Empty body, nothing to compress");
            return self.inner.end(None).await;
        }

        self.flush_compressed(encoding, buffer).await
    }
}

impl<S> fmt::Debug for CompressionInterceptor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (encoding, buffered_chunks) = match &self.mode {
            Mode::Passthrough => (None, 0),
            Mode::Compress { encoding, buffer } => (Some(*encoding), buffer.len()),
        };
        f.debug_struct("CompressionInterceptor")
            .field("encoding", &encoding)
            .field("buffered_chunks", &buffered_chunks)
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::testing::decode;
    use crate::config::CompressionConfig;
    use http::header::ACCEPT_ENCODING;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Write { bytes: Bytes, encoded: bool },
        End(Option<Bytes>),
    }

    /// Transport that records every call and the header state at that time
    #[derive(Debug, Default)]
    struct RecordingSink {
        headers: HeaderMap,
        events: Vec<Event>,
        fail_writes: bool,
    }

    impl RecordingSink {
        fn written(&self) -> Vec<u8> {
            let mut out = Vec::new();
            for event in &self.events {
                match event {
                    Event::Write { bytes, .. } => out.extend_from_slice(bytes),
                    Event::End(Some(bytes)) => out.extend_from_slice(bytes),
                    Event::End(None) => {}
                }
            }
            out
        }

        fn end_count(&self) -> usize {
            self.events
                .iter()
                .filter(|e| matches!(e, Event::End(_)))
                .count()
        }
    }

    #[async_trait]
    impl ResponseSink for RecordingSink {
        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        async fn write(&mut self, chunk: Bytes) -> Result<()> {
            if self.fail_writes {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "client went away",
                )));
            }
            let encoded = self.headers.contains_key(CONTENT_ENCODING);
            self.events.push(Event::Write {
                bytes: chunk,
                encoded,
            });
            Ok(())
        }

        async fn end(&mut self, chunk: Option<Bytes>) -> Result<()> {
            self.events.push(Event::End(chunk));
            Ok(())
        }
    }

    fn request_headers(accept: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_str(accept).unwrap());
        headers
    }

    fn interceptor(path: &str, accept: &str) -> CompressionInterceptor<RecordingSink> {
        CompressionInterceptor::new(
            RecordingSink::default(),
            &CompressionPolicy::default(),
            path,
            &request_headers(accept),
        )
    }

    #[tokio::test]
    async fn test_gzip_html_scenario() {
        let mut response = interceptor("/index.html", "gzip");
        response.write(Bytes::from("<html>")).await.unwrap();
        response.write(Bytes::from("</html>")).await.unwrap();
        response.end(Some(Bytes::from(""))).await.unwrap();

        let sink = response.into_inner();
        assert_eq!(sink.headers[CONTENT_ENCODING], "gzip");
        assert_eq!(sink.headers["x-compression-enabled"], "true");
        assert_eq!(sink.end_count(), 1);
        assert_eq!(sink.events.last(), Some(&Event::End(None)));
        assert_eq!(
            decode(ContentEncoding::Gzip, &sink.written()),
            b"<html></html>"
        );
    }

    #[tokio::test]
    async fn test_each_encoding_roundtrips() {
        let cases = [
            ("br", ContentEncoding::Brotli),
            ("gzip", ContentEncoding::Gzip),
            ("deflate", ContentEncoding::Deflate),
            ("gzip, br", ContentEncoding::Brotli),
        ];
        let chunks = ["body { margin: 0 }\n", ".hero { color: #fff }\n", "h1 { }"];

        for (accept, expected) in cases {
            let mut response = interceptor("/css/style.css", accept);
            assert_eq!(response.encoding(), Some(expected));

            for chunk in &chunks[..2] {
                response.write(Bytes::from(*chunk)).await.unwrap();
            }
            response.end(Some(Bytes::from(chunks[2]))).await.unwrap();

            let sink = response.into_inner();
            assert_eq!(sink.headers[CONTENT_ENCODING], expected.as_str());
            assert_eq!(decode(expected, &sink.written()), chunks.concat().as_bytes());
        }
    }

    #[tokio::test]
    async fn test_nothing_forwarded_before_end() {
        let mut response = interceptor("/app.js", "br");
        response.write(Bytes::from("let a = 1;")).await.unwrap();
        response.write(Bytes::from("let b = 2;")).await.unwrap();

        assert!(response.get_ref().events.is_empty());
        assert_eq!(response.buffered_len(), 20);
    }

    #[tokio::test]
    async fn test_headers_set_before_first_body_byte() {
        let mut response = interceptor("/", "deflate");
        // Set during negotiation, before any write
        assert!(response.get_ref().headers.contains_key(CONTENT_ENCODING));

        response.write(Bytes::from("hello")).await.unwrap();
        response.end(None).await.unwrap();

        let sink = response.into_inner();
        assert!(sink.events.iter().all(|event| match event {
            Event::Write { encoded, .. } => *encoded,
            Event::End(_) => true,
        }));
    }

    #[tokio::test]
    async fn test_exempt_path_passes_through() {
        let mut response = interceptor("/img/bg-bottom.webp", "gzip, br");
        assert_eq!(response.encoding(), None);

        response.write(Bytes::from_static(b"RIFF")).await.unwrap();
        response.end(Some(Bytes::from_static(b"WEBP"))).await.unwrap();

        let sink = response.into_inner();
        assert!(!sink.headers.contains_key(CONTENT_ENCODING));
        assert!(!sink.headers.contains_key("x-compression-enabled"));
        assert_eq!(
            sink.events,
            vec![
                Event::Write {
                    bytes: Bytes::from_static(b"RIFF"),
                    encoded: false
                },
                Event::End(Some(Bytes::from_static(b"WEBP"))),
            ]
        );
    }

    #[tokio::test]
    async fn test_unsupported_encoding_passes_through() {
        let mut response = interceptor("/index.html", "identity");
        response.write(Bytes::from("<p>plain</p>")).await.unwrap();
        response.end(None).await.unwrap();

        let sink = response.into_inner();
        assert!(!sink.headers.contains_key(CONTENT_ENCODING));
        assert_eq!(sink.written(), b"<p>plain</p>");
    }

    #[tokio::test]
    async fn test_empty_body_ends_without_writes() {
        let mut response = interceptor("/index.html", "br");
        response.write(Bytes::new()).await.unwrap();
        response.end(Some(Bytes::new())).await.unwrap();

        let sink = response.into_inner();
        assert_eq!(sink.events, vec![Event::End(None)]);
    }

    #[tokio::test]
    async fn test_calls_after_end_are_rejected() {
        let mut response = interceptor("/index.html", "gzip");
        response.end(Some(Bytes::from("done"))).await.unwrap();

        assert!(matches!(
            response.write(Bytes::from("late")).await,
            Err(Error::ResponseFinished)
        ));
        assert!(matches!(
            response.end(None).await,
            Err(Error::ResponseFinished)
        ));
        assert_eq!(response.get_ref().end_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let sink = RecordingSink {
            fail_writes: true,
            ..Default::default()
        };
        let mut response = CompressionInterceptor::new(
            sink,
            &CompressionPolicy::default(),
            "/index.html",
            &request_headers("gzip"),
        );
        response.write(Bytes::from("<html></html>")).await.unwrap();

        let result = response.end(None).await;
        assert!(matches!(result, Err(Error::Io(_))));
        // Finalize never reached the transport
        assert_eq!(response.get_ref().end_count(), 0);
    }

    #[tokio::test]
    async fn test_marker_header_can_be_disabled() {
        let config = CompressionConfig {
            marker_header: None,
            ..Default::default()
        };
        let policy = CompressionPolicy::from_config(&config).unwrap();
        let response = CompressionInterceptor::new(
            RecordingSink::default(),
            &policy,
            "/index.html",
            &request_headers("br"),
        );

        let sink = response.into_inner();
        assert_eq!(sink.headers[CONTENT_ENCODING], "br");
        assert!(!sink.headers.contains_key("x-compression-enabled"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn encoding_strategy() -> impl Strategy<Value = ContentEncoding> {
            prop_oneof![
                Just(ContentEncoding::Brotli),
                Just(ContentEncoding::Gzip),
                Just(ContentEncoding::Deflate),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn test_compressed_output_decodes_to_written_bytes(
                encoding in encoding_strategy(),
                chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..256), 0..8),
                last in prop::option::of(prop::collection::vec(any::<u8>(), 0..64)),
            ) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();

                let sink = runtime.block_on(async {
                    let mut response = interceptor("/page.html", encoding.as_str());
                    for chunk in &chunks {
                        response.write(Bytes::from(chunk.clone())).await.unwrap();
                    }
                    response.end(last.clone().map(Bytes::from)).await.unwrap();
                    response.into_inner()
                });

                let mut expected: Vec<u8> = chunks.concat();
                if let Some(last) = &last {
                    expected.extend_from_slice(last);
                }

                prop_assert_eq!(sink.end_count(), 1);
                if expected.is_empty() {
                    prop_assert_eq!(&sink.events, &vec![Event::End(None)]);
                } else {
                    prop_assert_eq!(decode(encoding, &sink.written()), expected);
                }
            }
        }
    }
}
