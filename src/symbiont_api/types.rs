use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbiont SDK error type
///
/// Represents every failure the SDK reports: configuration problems, token
/// authentication failures, authorization failures and API errors.
#[derive(Debug)]
pub enum SymbiontError {
    /// Missing or invalid setup. Fatal to the operation and not retryable.
    Configuration {
        message: String,
        /// Configuration key that caused the error, when known
        key: Option<String>,
    },
    /// Bad signature, malformed token, or wrong token kind for the operation
    Authentication(String),
    /// Valid signature but the token is past its expiry.
    ///
    /// This is a distinguished form of authentication failure: the caller
    /// should refresh or re-authenticate.
    AuthenticationExpired(String),
    /// Authenticated but lacking a required permission
    PermissionDenied {
        message: String,
        required_permission: Option<String>,
    },
    /// API request failed (network, HTTP, or response parsing error)
    Api(ApiError),
}

impl SymbiontError {
    /// Configuration error without a specific key
    pub fn config(message: impl Into<String>) -> Self {
        SymbiontError::Configuration {
            message: message.into(),
            key: None,
        }
    }

    /// Configuration error attributed to a configuration key
    pub fn config_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        SymbiontError::Configuration {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// True for both plain and expired authentication failures
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            SymbiontError::Authentication(_) | SymbiontError::AuthenticationExpired(_)
        )
    }

    /// True when the failure is an expired token
    pub fn is_expired(&self) -> bool {
        matches!(self, SymbiontError::AuthenticationExpired(_))
    }

    /// HTTP-equivalent status code for this error, if it has one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SymbiontError::Configuration { .. } => None,
            SymbiontError::Authentication(_) | SymbiontError::AuthenticationExpired(_) => {
                Some(401)
            }
            SymbiontError::PermissionDenied { .. } => Some(403),
            SymbiontError::Api(err) => err.status_code(),
        }
    }
}

impl fmt::Display for SymbiontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbiontError::Configuration { message, key } => match key {
                Some(key) => write!(f, "Configuration error ({}): {}", key, message),
                None => write!(f, "Configuration error: {}", message),
            },
            SymbiontError::Authentication(msg) => write!(f, "Authentication error: {}", msg),
            SymbiontError::AuthenticationExpired(msg) => {
                write!(f, "Authentication expired: {}", msg)
            }
            SymbiontError::PermissionDenied {
                message,
                required_permission,
            } => match required_permission {
                Some(permission) => {
                    write!(f, "Permission denied: {} (requires '{}')", message, permission)
                }
                None => write!(f, "Permission denied: {}", message),
            },
            SymbiontError::Api(err) => write!(f, "API error: {}", err),
        }
    }
}

impl std::error::Error for SymbiontError {}

impl From<ApiError> for SymbiontError {
    fn from(err: ApiError) -> Self {
        SymbiontError::Api(err)
    }
}

/// API-specific errors
#[derive(Debug)]
pub enum ApiError {
    /// Network error (connection, timeout, etc.)
    Network(String),
    /// HTTP error with status code and the raw response text
    Http { status: u16, message: String },
    /// 404 response
    NotFound(String),
    /// 429 response
    RateLimited(String),
    /// Failed to parse response
    Parse(String),
    /// Request building failed
    Request(String),
}

impl ApiError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited(_) => Some(429),
            ApiError::Network(_) | ApiError::Parse(_) | ApiError::Request(_) => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Http { status, message } => {
                write!(f, "API request failed with status {}: {}", status, message)
            }
            ApiError::NotFound(msg) => write!(f, "Resource not found: {}", msg),
            ApiError::RateLimited(msg) => {
                write!(f, "Rate limit exceeded - too many requests: {}", msg)
            }
            ApiError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ApiError::Request(msg) => write!(f, "Request error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timeout".to_string())
        } else if err.is_connect() {
            ApiError::Network(format!("Connection failed: {}", err))
        } else if err.is_builder() {
            ApiError::Request(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Response from the runtime's health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uptime_seconds: Option<u64>,
}
