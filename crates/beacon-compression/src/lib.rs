//! Response compression for Beacon
//!
//! Compresses eligible response bodies with:
//! - brotli (preferred, quality 11, text mode)
//! - gzip (level 9)
//! - deflate (zlib framing, level 9)
//!
//! The [`CompressionInterceptor`] is a decorator over a [`ResponseSink`]: it
//! buffers every write, and on finalize compresses the whole body as one unit
//! before forwarding the encoder output to the transport it wraps. Requests for
//! pre-compressed media (images, video) and clients that accept none of the
//! supported encodings pass straight through.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod compressor;
pub mod config;
pub mod encoding;
pub mod interceptor;
pub mod middleware;
pub mod sink;

pub use compressor::Compressor;
pub use config::{extension_of, CompressionConfig, CompressionPolicy};
pub use encoding::ContentEncoding;
pub use interceptor::CompressionInterceptor;
pub use middleware::CompressionMiddleware;
pub use sink::{BufferedResponse, ResponseSink};
