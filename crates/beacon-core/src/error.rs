//! Error types for Beacon

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for Beacon
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection-level HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// Invalid HTTP request
    #[error("Invalid HTTP request: {0}")]
    InvalidRequest(String),

    /// Requested file does not exist under the site root
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encoder failure while compressing a response body
    #[error("Compression error: {0}")]
    Compression(String),

    /// Write or finalize attempted on a response that was already finalized
    #[error("Response already finalized")]
    ResponseFinished,

    /// CSS processing error
    #[error("CSS error in '{file}': {message}")]
    Css {
        /// File being processed
        file: String,
        /// Error message
        message: String,
    },

    /// Runtime error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response construction error
    #[error("HTTP error: {0}")]
    HttpError(#[from] http::Error),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert error to HTTP status code
    pub fn to_status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Http(_) | Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a CSS processing error
    pub fn css(file: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Css {
            file: file.into(),
            message: message.into(),
        }
    }
}
