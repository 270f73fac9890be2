//! Error types for the PxWeb client.

use scb_core::ProviderError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result type for client operations.
pub type PxWebResult<T> = Result<T, PxWebError>;

/// Error types that can occur when talking to a PxWeb API.
#[derive(Debug, thiserror::Error)]
pub enum PxWebError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request exceeded the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl PxWebError {
    /// Create an error from a non-success status code and response body.
    pub fn from_response(status: u16, url: &url::Url, body: &str) -> Self {
        match status {
            404 => Self::NotFound(url.path().to_string()),
            429 => Self::RateLimited,
            _ => {
                let message = match serde_json::from_str::<ErrorResponse>(body) {
                    Ok(error_response) => error_response.error,
                    Err(_) => summarize_body(body),
                };
                Self::Api { status, message }
            }
        }
    }
}

fn summarize_body(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "empty response".to_string();
    }
    let mut summary: String = body.chars().take(200).collect();
    if summary.len() < body.len() {
        summary.push_str("...");
    }
    summary
}

/// Error body some PxWeb installations answer with.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<PxWebError> for ProviderError {
    fn from(err: PxWebError) -> Self {
        match err {
            PxWebError::Http(e) if e.is_decode() => ProviderError::Malformed(e.to_string()),
            PxWebError::Http(e) => ProviderError::Unreachable(e.to_string()),
            PxWebError::Api {
                status: 400,
                message,
            } => ProviderError::InvalidSelection(message),
            PxWebError::Api { status, message } => ProviderError::Api { status, message },
            PxWebError::Json(e) => ProviderError::Malformed(e.to_string()),
            PxWebError::Timeout(after) => ProviderError::Timeout(after),
            PxWebError::NotFound(what) => ProviderError::NotFound(what),
            PxWebError::RateLimited => ProviderError::RateLimited,
            err @ (PxWebError::Config(_) | PxWebError::InvalidUrl(_)) => {
                ProviderError::Unreachable(err.to_string())
            }
        }
    }
}
