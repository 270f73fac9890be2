// Errors raised by statistics providers

use std::time::Duration;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure of a call against the statistics provider.
///
/// These are expected, recoverable conditions: callers receive them as data,
/// never as a transport-level failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// The provider could not be reached (DNS, TLS, connection reset, ...)
    #[error("Failed to reach statistics provider: {0}")]
    Unreachable(String),

    /// No catalog node at the requested path
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// The selection names a dimension or value outside the table's domain
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Rate limited by statistics provider")]
    RateLimited,

    /// Any other non-success answer
    #[error("Provider error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Provider call timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_is_distinct() {
        let err = ProviderError::Timeout(Duration::from_secs(60));
        assert_eq!(err.to_string(), "Provider call timed out after 60s");
    }

    #[test]
    fn test_api_error_message() {
        let err = ProviderError::Api {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Provider error (status 503): Service Unavailable"
        );
    }
}
