//! Error types for identity provider operations.

use thiserror::Error;

/// Result type alias using the identity provider error type.
pub type Result<T> = std::result::Result<T, IdpError>;

/// Message fragments that mark an uncategorized error as connection-level.
///
/// Errors that reach us without a usable category (no status code, no
/// timeout/connect flag) are matched against this vocabulary; a hit means the
/// failure happened below the application layer and is worth retrying.
const TRANSIENT_FRAGMENTS: &[&str] = &[
    "network",
    "timeout",
    "timed out",
    "connect",
    "connection",
    "socket",
    "dns",
    "unreachable",
];

/// Error type for identity provider operations.
#[derive(Debug, Clone, Error)]
pub enum IdpError {
    /// The provider rejected the credential (HTTP 401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The operation was canceled by the caller.
    #[error("Operation canceled")]
    Canceled,

    /// Connectivity failure: the request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    /// The request timed out waiting for the provider.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The provider failed internally (HTTP 5xx).
    #[error("Provider error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        message: String,
    },

    /// The provider refused the request (HTTP 4xx other than 401).
    #[error("Rejected request ({status}): {message}")]
    Client {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (unusable base URL, client build failure, etc.).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Uncategorized error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdpError {
    /// Classify an HTTP status code and response body into an error.
    ///
    /// 401 always maps to [`IdpError::Unauthorized`] before any other rule is
    /// considered, so a credential rejection can never be mistaken for a
    /// transient provider failure.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::Unauthorized(message),
            500..=599 => Self::Server { status, message },
            _ => Self::Client { status, message },
        }
    }

    /// Returns true if this error is worth retrying.
    ///
    /// The classification is a fixed decision table:
    /// 1. `Unauthorized` is never retried; the same credential cannot become
    ///    acceptable by repetition.
    /// 2. `Canceled` is never retried.
    /// 3. `Network` (no response at all) is retried.
    /// 4. `Server` (5xx) is retried.
    /// 5. `Timeout` is retried.
    /// 6. `Client` (other 4xx) is not retried.
    /// 7. `Internal` is retried only when its message matches the
    ///    connection-level vocabulary.
    /// 8. Everything else is not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unauthorized(_) => false,
            Self::Canceled => false,
            Self::Network(_) => true,
            Self::Server { .. } => true,
            Self::Timeout(_) => true,
            Self::Client { .. } => false,
            Self::Internal(message) => message_looks_transient(message),
            Self::Serialization(_) | Self::Config(_) => false,
        }
    }
}

/// Case-insensitive scan for connection-level vocabulary.
fn message_looks_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_FRAGMENTS
        .iter()
        .any(|fragment| lower.contains(fragment))
}

impl From<reqwest::Error> for IdpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IdpError::Timeout(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            IdpError::Network(format!("Connection failed: {}", err))
        } else if let Some(status) = err.status() {
            IdpError::from_status(status.as_u16(), err.to_string())
        } else {
            IdpError::Internal(err.to_string())
        }
    }
}

impl From<serde_json::Error> for IdpError {
    fn from(err: serde_json::Error) -> Self {
        IdpError::Serialization(err.to_string())
    }
}

/// Check if an error is retryable.
///
/// Connectivity failures, timeouts, and provider-side 5xx responses are
/// retryable. Credential rejections and client-side mistakes are not.
pub fn is_retryable(error: &IdpError) -> bool {
    error.is_retryable()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_never_retryable() {
        assert!(!is_retryable(&IdpError::Unauthorized("bad token".to_string())));
        assert!(!is_retryable(&IdpError::from_status(401, "expired")));
        // Even when the body text screams "network", a 401 stays terminal.
        assert!(!is_retryable(&IdpError::from_status(
            401,
            "network gateway rejected the token"
        )));
    }

    #[test]
    fn test_canceled_not_retryable() {
        assert!(!is_retryable(&IdpError::Canceled));
    }

    #[test]
    fn test_network_and_timeout_retryable() {
        assert!(is_retryable(&IdpError::Network("no route to host".to_string())));
        assert!(is_retryable(&IdpError::Timeout("deadline exceeded".to_string())));
    }

    #[test]
    fn test_server_errors_retryable() {
        for status in [500, 502, 503, 504] {
            assert!(
                is_retryable(&IdpError::from_status(status, "boom")),
                "status {} should be retryable",
                status
            );
        }
    }

    #[test]
    fn test_client_errors_not_retryable() {
        for status in [400, 403, 404, 422, 429] {
            assert!(
                !is_retryable(&IdpError::from_status(status, "nope")),
                "status {} should not be retryable",
                status
            );
        }
    }

    #[test]
    fn test_internal_vocabulary_scan() {
        assert!(is_retryable(&IdpError::Internal(
            "Connection reset by peer".to_string()
        )));
        assert!(is_retryable(&IdpError::Internal(
            "error sending request: socket hang up".to_string()
        )));
        assert!(is_retryable(&IdpError::Internal(
            "DNS resolution failed".to_string()
        )));
        assert!(!is_retryable(&IdpError::Internal(
            "invalid payload shape".to_string()
        )));
    }

    #[test]
    fn test_config_and_serialization_not_retryable() {
        assert!(!is_retryable(&IdpError::Config("bad base url".to_string())));
        assert!(!is_retryable(&IdpError::Serialization(
            "missing field `id`".to_string()
        )));
    }

    #[test]
    fn test_from_status_branches() {
        assert!(matches!(
            IdpError::from_status(401, "x"),
            IdpError::Unauthorized(_)
        ));
        assert!(matches!(
            IdpError::from_status(503, "x"),
            IdpError::Server { status: 503, .. }
        ));
        assert!(matches!(
            IdpError::from_status(404, "x"),
            IdpError::Client { status: 404, .. }
        ));
    }
}
