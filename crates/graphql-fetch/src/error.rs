//! Error types for GraphQL request execution.

use thiserror::Error;

/// Errors that can occur while executing a GraphQL request.
///
/// The `Display` output of each variant is the exact string placed in
/// [`Response::error`](crate::Response::error) when a call fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The query document was empty or whitespace only.
    #[error("GraphQL query must not be empty")]
    EmptyQuery,

    /// The document describes an operation this client does not execute.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Invalid endpoint URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid header name or value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Connection refused or failed (including DNS resolution).
    #[error("Connection error: {0}")]
    Connection(String),

    /// Any other transport failure.
    #[error("HTTP request error: {0}")]
    Request(String),

    /// The request did not complete before the timeout elapsed.
    #[error("Request Timeout")]
    Timeout,

    /// The caller's cancellation token fired.
    #[error("Request was aborted")]
    Cancelled,

    /// JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Non-2xx status whose body was not a GraphQL response.
    #[error("HTTP {status}{}", status_suffix(.message))]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
        /// The response body, if one could be read.
        message: Option<String>,
    },

    /// The server reported a GraphQL error; carries the first error's message.
    #[error("{0}")]
    GraphQL(String),

    /// The response had no errors but also no usable data.
    #[error("No data in GraphQL response: {0}")]
    MissingData(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

fn status_suffix(message: &Option<String>) -> String {
    match message {
        Some(msg) => format!(": {msg}"),
        None => String::new(),
    }
}

impl FetchError {
    /// Whether this error came from the timeout or the caller's token.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Timeout | Self::Cancelled)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::Json(err.to_string())
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<toml::de::Error> for FetchError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for FetchError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for FetchError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

/// A specialized Result type for GraphQL fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
