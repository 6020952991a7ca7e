//! Client error types

use serde_json::Value;
use thiserror::Error;

/// Classification of a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operation name is not registered
    UnknownEndpoint,
    /// Transport-level failure, no HTTP status
    Network,
    /// 400/422 with recognizable field or message errors
    Validation,
    /// 401, the session has been terminated
    Auth,
    /// Any other failure status, or an unrecognized error body
    Server,
    /// Body could not be decoded
    Decode,
    /// Client misconfiguration
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownEndpoint => "unknown_endpoint",
            Self::Network => "network",
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::Server => "server",
            Self::Decode => "decode",
            Self::Config => "config",
        }
    }
}

/// Failed HTTP exchange: status, classification and the parsed body
#[derive(Debug, Clone)]
pub struct Failure {
    pub status: u16,
    pub kind: ErrorKind,
    pub body: Value,
}

impl Failure {
    /// Best human-readable message carried by the body
    pub fn message(&self) -> Option<&str> {
        ["message", "error", "errorDesc"]
            .iter()
            .find_map(|key| self.body.get(key).and_then(Value::as_str))
    }
}

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Programmer error: operation name not registered
    #[error("API endpoint \"{0}\" not found")]
    UnknownEndpoint(String),

    /// HTTP transport failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport failed without a reqwest error (custom transports)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a failure status
    #[error("Request failed with status {}: {}", .0.status, .0.message().unwrap_or("no message"))]
    Failure(Failure),

    /// Response body is not valid JSON
    #[error("Malformed response body (status {status}): {source}")]
    MalformedBody {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// Successful response with an unexpected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Login or registration rejected inside a successful response
    #[error("{0}")]
    Rejected(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownEndpoint(_) => ErrorKind::UnknownEndpoint,
            Self::Http(_) | Self::Network(_) => ErrorKind::Network,
            Self::Failure(failure) => failure.kind,
            Self::Rejected(_) => ErrorKind::Validation,
            Self::Config(_) => ErrorKind::Config,
            Self::MalformedBody { .. } | Self::InvalidResponse(_) | Self::Serialization(_) => {
                ErrorKind::Decode
            }
        }
    }

    /// HTTP status, when the backend answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Failure(failure) => Some(failure.status),
            Self::MalformedBody { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
