/// Error types for the results service
use thiserror::Error;

/// Main error type for results-service operations
#[derive(Error, Debug)]
pub enum ServiceError {
    /// HTTP request failed
    #[cfg(feature = "api")]
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Unexpected HTTP status {status} for {path}")]
    Status { status: u16, path: String },

    /// Failed to decode a JSON payload
    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The service could not answer this query
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Failed to read fixture data
    #[error("Failed to read fixture: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Results using ServiceError
pub type Result<T> = std::result::Result<T, ServiceError>;
