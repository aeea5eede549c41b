//! Error types for imgmirror

use thiserror::Error;

/// Result type alias for imgmirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

/// Errors raised while fetching a remote image.
///
/// These never escape the mirror: every variant degrades to keeping the
/// original URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Remote returned HTTP {0}")]
    Status(u16),

    #[error("Not an image (content-type: {0})")]
    NotAnImage(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Network("Failed to connect".to_string())
        } else if err.is_body() || err.is_decode() {
            FetchError::Body(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Image store errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Storage I/O error: {0}")]
    Io(String),
}

/// Content store (PostgREST) errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(
        "Content store not configured. Set SUPABASE_URL and SUPABASE_ANON_KEY or add a `store` section to the config."
    )]
    NotConfigured,

    #[error("Content store rejected the API key")]
    Unauthorized,

    #[error("Content store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid content store response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            StoreError::Network("Failed to connect to content store".to_string())
        } else {
            StoreError::Network(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
