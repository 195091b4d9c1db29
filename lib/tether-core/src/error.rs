//! Error types for tether.
//!
//! Every failure of an invocation, whatever layer it comes from, is one of
//! these variants and is delivered through the invocation's single outcome.

use derive_more::{Display, Error, From};

/// Main error type for tether operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// The endpoint or client configuration is malformed.
    #[display("invalid configuration: {_0}")]
    #[from(skip)]
    InvalidConfiguration(#[error(not(source))] String),

    /// A required invocation argument is missing or empty.
    #[display("invalid argument: {_0}")]
    #[from(skip)]
    InvalidArgument(#[error(not(source))] String),

    /// A filter broke the continuation contract (called `next` twice or panicked).
    #[display("filter protocol violation: {_0}")]
    #[from(skip)]
    FilterProtocolViolation(#[error(not(source))] String),

    /// HTTP-level errors (status 400 and above).
    #[display("HTTP error {status}: {message}")]
    #[from(skip)]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
        /// Response body, if available.
        #[error(not(source))]
        body: Option<bytes::Bytes>,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The transport abandoned the request.
    #[display("request cancelled")]
    #[from(skip)]
    Cancelled,

    /// The transport could not encode the request.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON decoding error with path context.
    #[display("JSON decode error at '{path}': {message}")]
    #[from(skip)]
    Decode {
        /// JSON path to the error (e.g., "user.userId").
        path: String,
        /// Error message.
        message: String,
        /// Body that failed to decode, when it came from a response.
        #[error(not(source))]
        body: Option<bytes::Bytes>,
    },

    /// The identity provider rejected the login.
    #[display("authentication failed: {_0}")]
    #[from(skip)]
    Auth(#[error(not(source))] String),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Create an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a filter protocol violation.
    #[must_use]
    pub fn filter_protocol_violation(message: impl Into<String>) -> Self {
        Self::FilterProtocolViolation(message.into())
    }

    /// Create an HTTP error from status code and message.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: None,
        }
    }

    /// Create an HTTP error with body.
    #[must_use]
    pub fn http_with_body(status: u16, message: impl Into<String>, body: bytes::Bytes) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: Some(body),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a decode error with path context.
    #[must_use]
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
            body: None,
        }
    }

    /// Attach the raw response body to an HTTP or decode error.
    ///
    /// Other kinds are returned unchanged.
    #[must_use]
    pub fn with_body(self, bytes: bytes::Bytes) -> Self {
        match self {
            Self::Http {
                status, message, ..
            } => Self::Http {
                status,
                message,
                body: Some(bytes),
            },
            Self::Decode { path, message, .. } => Self::Decode {
                path,
                message,
                body: Some(bytes),
            },
            other => other,
        }
    }

    /// Create an authentication error.
    #[must_use]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` for errors raised by the transport itself.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Tls(_) | Self::Timeout | Self::Cancelled
        )
    }

    /// Returns `true` if a filter broke the continuation contract.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::FilterProtocolViolation(_))
    }

    /// Returns the HTTP status code if this is an HTTP error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }

    /// Returns the response body carried by an HTTP or decode error.
    #[must_use]
    pub fn body(&self) -> Option<&bytes::Bytes> {
        match self {
            Self::Http { body, .. } | Self::Decode { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Try to decode the HTTP error body as JSON.
    ///
    /// Returns `None` if the error carries no body.
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        self.body().map(|body| crate::from_json(body))
    }
}
