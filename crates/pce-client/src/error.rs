//! PCE client errors

use thiserror::Error;

/// Errors that can occur when interacting with the PCE API
#[derive(Debug, Error)]
pub enum PceError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// PCE API returned an error
    #[error("PCE API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (bad credentials, expired session, no org)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., workload without href)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
