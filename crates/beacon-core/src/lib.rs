//! # Beacon Core
//!
//! Foundational abstractions shared by every Beacon crate:
//! - Error type and `Result` alias
//! - The buffered response body type
//! - `Middleware` and `Endpoint` traits with the `Next` chain runner

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod middleware;

pub use error::{Error, Result};
pub use middleware::{endpoint_fn, Body, Endpoint, Middleware, Next};

// Re-export commonly used HTTP types
pub use bytes::Bytes;
pub use http::{Method, Request, Response, StatusCode};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::middleware::{endpoint_fn, Body, Endpoint, Middleware, Next};
}
