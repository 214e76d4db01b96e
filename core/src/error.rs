use std::fmt;
use thiserror::Error;

/// The error type for azsign operations
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The shared key is malformed and no HMAC can be built from it.
    InvalidKey,

    /// A token credential was used over a transport other than HTTPS.
    UnsupportedTransport,

    /// The identity endpoint could not be reached or returned an unusable response.
    TokenFetch,

    /// Request input that can't be canonicalized deterministically.
    Canonicalization,

    /// Configuration error (missing fields, invalid values)
    ConfigInvalid,

    /// Request cannot be signed (missing authority, etc.)
    RequestInvalid,

    /// Unexpected errors
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Check if an external retry policy may try the failed call again.
    ///
    /// Only token fetches are retryable; everything else is a programming
    /// or configuration error that will fail the same way next time.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::TokenFetch)
    }
}

// Convenience constructors
impl Error {
    /// Create an invalid key error
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidKey, message)
    }

    /// Create an unsupported transport error
    pub fn unsupported_transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedTransport, message)
    }

    /// Create a token fetch error
    pub fn token_fetch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenFetch, message)
    }

    /// Create a canonicalization error
    pub fn canonicalization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Canonicalization, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidKey => write!(f, "invalid key"),
            ErrorKind::UnsupportedTransport => write!(f, "unsupported transport"),
            ErrorKind::TokenFetch => write!(f, "token fetch failed"),
            ErrorKind::Canonicalization => write!(f, "canonicalization failed"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

// Header text that is not visible ASCII can't be rendered into a string to sign.
impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::canonicalization(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::token_fetch(err.to_string()).with_source(anyhow::Error::from(err))
    }
}
