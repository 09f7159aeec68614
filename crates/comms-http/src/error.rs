//! HTTP helper errors.

use thiserror::Error;

/// Failures of a JSON request.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a status other than 200.
    #[error("unexpected response status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The request body could not be encoded or the response body decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type for HTTP helpers.
pub type Result<T> = std::result::Result<T, HttpError>;
