//! Error types for the request builder and dispatch pipeline.
//!
//! # Design
//! Argument errors are returned synchronously from the builder method that
//! received the bad input, before any network activity. Everything else
//! surfaces from `dispatch()`. Transport failures keep the collaborator's
//! original error as their source instead of being re-described.

use std::time::Duration;

use crate::http::HttpResponse;

/// Error produced by a `Transport`, passed through to the caller unchanged.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = FetchError> = std::result::Result<T, E>;

/// Errors returned by `FluentRequest` builder methods and by dispatch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The caller passed structurally invalid input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A URL could not be parsed or updated.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A registered ok-check rejected the response.
    #[error("response rejected: {} {}", .response.status_text, .response.url)]
    ResponseRejected { response: Box<HttpResponse> },

    /// The transport did not settle within the configured duration.
    #[error("timeout after {} ms", .duration.as_millis())]
    Timeout { duration: Duration },

    /// The transport failed (DNS, refused connection, ...).
    #[error(transparent)]
    Transport(TransportError),

    /// The request body could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A response body could not be decoded into the requested type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The backing listener could not be started.
    #[error("local server: {0}")]
    Server(#[from] std::io::Error),
}

impl FetchError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        FetchError::InvalidArgument(msg.into())
    }

    /// The response carried by a `ResponseRejected` error.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            FetchError::ResponseRejected { response } => Some(response),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::InvalidUrl(err.to_string())
    }
}
