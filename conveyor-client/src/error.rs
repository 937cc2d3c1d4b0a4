//! Error types for the Conveyor client

use conveyor_core::dto::ErrorBody;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Conveyor client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Machine readable kind reported by the orchestrator, if any
        kind: Option<String>,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl ClientError {
    /// Create an API error from a status code and a raw response body
    ///
    /// Bodies in the orchestrator's `{error, kind}` shape are unpacked; anything
    /// else is kept verbatim as the message.
    pub fn api_error(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();

        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => Self::ApiError {
                status,
                kind: Some(parsed.kind),
                message: parsed.error,
            },
            Err(_) => Self::ApiError {
                status,
                kind: None,
                message: body,
            },
        }
    }

    /// Error kind reported by the orchestrator (e.g. "already_running")
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::ApiError { kind, .. } => kind.as_deref(),
            _ => None,
        }
    }

    /// Check if the orchestrator refused the request because of the run state
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ApiError { status: 409, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_unpacks_error_body() {
        let err = ClientError::api_error(
            409,
            r#"{"error": "pipeline is already running", "kind": "already_running"}"#,
        );

        assert_eq!(err.kind(), Some("already_running"));
        assert!(err.is_conflict());
        assert!(err.is_client_error());
        assert_eq!(
            err.to_string(),
            "API error (status 409): pipeline is already running"
        );
    }

    #[test]
    fn test_api_error_keeps_plain_body() {
        let err = ClientError::api_error(502, "Bad Gateway");

        assert_eq!(err.kind(), None);
        assert!(err.is_server_error());
        assert!(!err.is_conflict());
        assert_eq!(err.to_string(), "API error (status 502): Bad Gateway");
    }
}
