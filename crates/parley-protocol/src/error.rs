//! Error types for parley-protocol

use thiserror::Error;

/// Result type alias using parley-protocol Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to a chat server
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with a non-success status
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Requested conversation does not exist
    #[error("Conversation not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a status error from a code and response body
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Whether the server reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Status { status: 404, .. })
    }

    /// Short message suitable for a transient notification
    pub fn user_message(&self) -> String {
        match self {
            Error::Status { status, message } if message.trim().is_empty() => {
                format!("Request failed with status {}", status)
            }
            Error::Status { message, .. } => message.clone(),
            Error::Http(e) if e.is_connect() => "Could not reach the server".to_string(),
            Error::Http(e) if e.is_timeout() => "The server took too long to respond".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(Error::NotFound("c1".into()).is_not_found());
        assert!(Error::status(404, "missing").is_not_found());
        assert!(!Error::status(500, "missing").is_not_found());
    }

    #[test]
    fn test_user_message_empty_body() {
        assert_eq!(
            Error::status(502, "  ").user_message(),
            "Request failed with status 502"
        );
        assert_eq!(Error::status(401, "expired token").user_message(), "expired token");
    }
}
