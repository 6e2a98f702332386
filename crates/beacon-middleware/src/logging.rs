//! Request/Response logging middleware

use async_trait::async_trait;
use beacon_core::{Body, Middleware, Next, Result};
use http::header::{HeaderName, CONTENT_ENCODING, CONTENT_LENGTH, USER_AGENT};
use http::{Request, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{warn, Level};

/// Request logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestLogConfig {
    /// Level for request and response events
    #[serde(default = "default_log_level", with = "level_name")]
    pub log_level: Level,

    /// Whether to log request headers
    #[serde(default)]
    pub log_headers: bool,

    /// Headers whose values are never logged
    #[serde(default = "default_sensitive_headers")]
    pub sensitive_headers: Vec<String>,
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_headers: false,
            sensitive_headers: default_sensitive_headers(),
        }
    }
}

fn default_log_level() -> Level {
    Level::INFO
}

fn default_sensitive_headers() -> Vec<String> {
    vec![
        "authorization".to_string(),
        "cookie".to_string(),
        "set-cookie".to_string(),
    ]
}

/// `tracing::Level` as its lower-case name
mod level_name {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use tracing::Level;

    pub(super) fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&level.as_str().to_ascii_lowercase())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse()
            .map_err(|_| de::Error::custom(format!("unknown log level '{name}'")))
    }
}

/// Emit an event at a level chosen at runtime
macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            Level::TRACE => tracing::trace!($($arg)+),
            Level::DEBUG => tracing::debug!($($arg)+),
            Level::INFO => tracing::info!($($arg)+),
            Level::WARN => tracing::warn!($($arg)+),
            Level::ERROR => tracing::error!($($arg)+),
        }
    };
}

/// Request/Response logging middleware
///
/// Logs every request and its outcome with structured fields.
#[derive(Clone)]
pub struct RequestLogger {
    config: RequestLogConfig,
}

impl RequestLogger {
    /// Create a new RequestLogger with default config
    pub fn new() -> Self {
        Self::with_config(RequestLogConfig::default())
    }

    /// Create a new RequestLogger with custom config
    pub fn with_config(config: RequestLogConfig) -> Self {
        Self { config }
    }

    fn should_redact(&self, header_name: &str) -> bool {
        self.config
            .sensitive_headers
            .iter()
            .any(|h| h.eq_ignore_ascii_case(header_name))
    }

    fn redact_value(&self, header_name: &str, value: &str) -> String {
        if self.should_redact(header_name) {
            "[REDACTED]".to_string()
        } else {
            value.to_string()
        }
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogger")
            .field("log_level", &self.config.log_level)
            .field("log_headers", &self.config.log_headers)
            .finish()
    }
}

#[async_trait]
impl Middleware for RequestLogger {
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>> {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let version = req.version();
        let level = self.config.log_level;

        if self.config.log_headers {
            let headers: Vec<String> = req
                .headers()
                .iter()
                .map(|(name, value)| {
                    let value = value.to_str().unwrap_or("[invalid UTF-8]");
                    format!("{}: {}", name, self.redact_value(name.as_str(), value))
                })
                .collect();
            event_at!(level, method = %method, uri = %uri, version = ?version, headers = ?headers, "Incoming request");
        } else {
            let user_agent = req
                .headers()
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();
            event_at!(level, method = %method, uri = %uri, version = ?version, user_agent = %user_agent, "Incoming request");
        }

        let start = Instant::now();
        let response = next.run(req).await;
        let duration = start.elapsed();

        match &response {
            Ok(resp) => {
                let header = |name: HeaderName| {
                    resp.headers()
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-")
                        .to_string()
                };
                let encoding = header(CONTENT_ENCODING);
                let length = header(CONTENT_LENGTH);
                event_at!(
                    level,
                    method = %method,
                    uri = %uri,
                    status = resp.status().as_u16(),
                    content_encoding = %encoding,
                    content_length = %length,
                    duration_ms = duration.as_millis(),
                    "Request completed"
                );
            }
            Err(e) => {
                warn!(
                    method = %method,
                    uri = %uri,
                    error = %e,
                    duration_ms = duration.as_millis(),
                    "Request failed"
                );
            }
        }

        response
    }
}
