//! Error types for the API client

use reqwest::StatusCode;
use thiserror::Error;

use crate::models::BlockId;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API base URL is not configured")]
    BaseUrlMissing,

    #[error("Invalid request path")]
    InvalidPath,

    /// Placeholder ids never reach the server
    #[error("Block '{id}' has not been created on the server yet")]
    TransientId { id: BlockId },

    /// Transport failure (connect, timeout, TLS)
    #[error("Request failed: {message}")]
    Request { message: String },

    #[error("Failed to read response body: {message}")]
    Read { message: String },

    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    /// Malformed event stream
    #[error("Event stream error: {message}")]
    Stream { message: String },
}

impl ApiError {
    pub fn request(error: impl std::fmt::Display) -> Self {
        Self::Request {
            message: error.to_string(),
        }
    }

    pub fn decode(error: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: error.to_string(),
        }
    }

    pub fn transient_id(id: &BlockId) -> Self {
        Self::TransientId { id: id.clone() }
    }

    /// Whether another attempt could succeed
    ///
    /// Transport failures, 5xx and 429 are retriable. Other 4xx responses,
    /// decode errors and configuration errors are not.
    pub fn is_retriable(&self) -> bool {
        match self {
            ApiError::Request { .. } | ApiError::Read { .. } => true,
            ApiError::Http { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Http { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Build an `Http` error from a non-success response body
pub fn format_http_error(status: StatusCode, body: &[u8]) -> ApiError {
    let body = String::from_utf8_lossy(body).trim().to_string();
    let body = if body.is_empty() {
        "<empty>".to_string()
    } else {
        body
    };
    ApiError::Http { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        assert!(ApiError::request("connection reset").is_retriable());
        assert!(format_http_error(StatusCode::BAD_GATEWAY, b"").is_retriable());
        assert!(format_http_error(StatusCode::TOO_MANY_REQUESTS, b"slow down").is_retriable());

        assert!(!format_http_error(StatusCode::UNPROCESSABLE_ENTITY, b"bad").is_retriable());
        assert!(!ApiError::decode("expected value").is_retriable());
        assert!(!ApiError::transient_id(&BlockId::transient()).is_retriable());
    }

    #[test]
    fn test_empty_body_is_labelled() {
        let err = format_http_error(StatusCode::INTERNAL_SERVER_ERROR, b"  \n");
        assert_eq!(err.to_string(), "HTTP 500 Internal Server Error: <empty>");
    }

    #[test]
    fn test_not_found() {
        assert!(format_http_error(StatusCode::NOT_FOUND, b"gone").is_not_found());
        assert!(!format_http_error(StatusCode::GONE, b"gone").is_not_found());
    }
}
