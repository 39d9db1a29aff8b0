//! # Recipe API Error Types
//!
//! Structured errors for calls to the remote recipe catalog.

/// Errors returned by the TheMealDB client
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Connection, DNS or TLS failures
    Network(String),
    /// Request exceeded the configured timeout
    Timeout(String),
    /// Non-success HTTP status
    Status { code: u16, url: String },
    /// Response body was not the expected JSON shape
    Decode(String),
    /// Client could not be constructed
    Initialization(String),
    /// Too many recent failures; calls fail fast until the breaker resets
    CircuitOpen,
}

impl ApiError {
    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout(_) => true,
            ApiError::Status { code, .. } => *code == 429 || *code >= 500,
            ApiError::Decode(_) | ApiError::Initialization(_) | ApiError::CircuitOpen => false,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {msg}"),
            ApiError::Timeout(msg) => write!(f, "Timeout error: {msg}"),
            ApiError::Status { code, url } => write!(f, "HTTP {code} from {url}"),
            ApiError::Decode(msg) => write!(f, "Decode error: {msg}"),
            ApiError::Initialization(msg) => write!(f, "Initialization error: {msg}"),
            ApiError::CircuitOpen => write!(f, "Recipe API temporarily unavailable (circuit open)"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Status {
                code: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else if err.is_builder() {
            ApiError::Initialization(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
