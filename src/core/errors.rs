use thiserror::Error;

/// Raw failures produced by transports and the kernel.
///
/// These are never handed to facade callers; the classifier turns them into an
/// [`ErrorKind`](crate::resilience::classifier::ErrorKind) and the fallback
/// layer absorbs them.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API error: {code} - {message}")]
    ApiError { code: i32, message: String },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Authentication required but no credentials configured")]
    AuthenticationRequired,

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Connection reset: {0}")]
    ConnectionReset(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),

    #[error("Other error: {0}")]
    Other(String),
}
