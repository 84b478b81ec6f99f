//! Client error taxonomy
//!
//! Typed failures for the REST boundary, with the user-facing messages the
//! UI shows as toasts.

use thiserror::Error;

/// Failures surfaced by the REST client.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Session token missing or rejected; the caller must re-authenticate
    #[error("unauthorized")]
    Unauthorized,

    /// Non-success HTTP status, with the server's error message when it sent one
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection or protocol failure below HTTP
    #[error("network error: {0}")]
    Network(String),

    /// Response body was not the JSON we expected
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Malformed base URL in configuration
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    /// Message suitable for a transient toast.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Unauthorized | ClientError::Status { status: 401, .. } => {
                "Please sign in first".to_string()
            }
            ClientError::Status { status: 403, .. } => "Permission denied".to_string(),
            ClientError::Status { status: 404, .. } => "Resource not found".to_string(),
            ClientError::Status { status: 408, .. } => {
                "Request timed out, please retry".to_string()
            }
            ClientError::Status { status: 429, .. } => {
                "Too many requests, please slow down".to_string()
            }
            ClientError::Status { status: 500.., .. } => "Server error".to_string(),
            ClientError::Status { message, .. } if !message.is_empty() => message.clone(),
            _ => "Request failed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_follow_status() {
        assert_eq!(
            ClientError::Unauthorized.user_message(),
            "Please sign in first"
        );
        assert_eq!(
            ClientError::Status {
                status: 404,
                message: String::new()
            }
            .user_message(),
            "Resource not found"
        );
        assert_eq!(
            ClientError::Status {
                status: 503,
                message: "upstream".to_string()
            }
            .user_message(),
            "Server error"
        );
        assert_eq!(
            ClientError::Status {
                status: 400,
                message: "name required".to_string()
            }
            .user_message(),
            "name required"
        );
        assert_eq!(
            ClientError::Status {
                status: 418,
                message: String::new()
            }
            .user_message(),
            "Request failed"
        );
        assert_eq!(
            ClientError::Network("connection refused".to_string()).user_message(),
            "Request failed"
        );
    }
}
