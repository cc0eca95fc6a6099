//! Internal error types for conversation API calls.
//!
//! These errors are internal to `debate-api` and are mapped to
//! `ApiPortError` at the port boundary.

use thiserror::Error;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors related to conversation API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("API request to {url} failed with status {status}")]
    Status {
        status: u16,
        url: String,
        /// Response body text, kept for error-body fallbacks
        body: String,
    },

    /// The request timed out after all retries.
    #[error("API request to {url} timed out")]
    Timeout { url: String },

    /// API returned an invalid or unexpected response.
    #[error("Invalid response from API: {message}")]
    InvalidResponse { message: String },

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON encoding or parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Base64 audio payload could not be decoded.
    #[error("Invalid base64 audio: {0}")]
    Base64(#[from] base64::DecodeError),
}
