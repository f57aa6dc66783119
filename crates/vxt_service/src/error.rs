//! Error types for data-service requests.

use thiserror::Error;

/// Result alias used by every [`DataService`](crate::DataService) operation.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors that can occur while talking to the data service.
///
/// The review core never treats these as fatal; each one is logged and
/// replaced by an empty or previous-safe value at the call site.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The request could not complete (connection refused, timeout, 5xx, ...)
    #[error("Network failure: {0}")]
    Network(String),

    /// The requested sequence, timeseries, subset or frame does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The service answered with an unexpected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ServiceError {
    /// Create a network failure error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a malformed response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Short category name, used in status text.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Network(_) => "network failure",
            ServiceError::NotFound(_) => "not found",
            ServiceError::MalformedResponse(_) => "malformed response",
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::MalformedResponse(err.to_string());
        }
        match err.status() {
            Some(reqwest::StatusCode::NOT_FOUND) => Self::NotFound(err.to_string()),
            _ => Self::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}
