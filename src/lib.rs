//! Symbiont SDK
//!
//! A Rust library for integrating with the Symbiont agent runtime.
//!
//! This SDK provides:
//! - HS256 session tokens: paired access/refresh issuance, validation and refresh
//! - Role-based permissions derived from a configurable role registry
//! - Symbiont runtime API client with bearer authentication and typed errors
//! - Configuration from code, TOML files or `SYMBIONT_*` environment variables
//!
//! # Example
//!
//! ```no_run
//! use symbiont_sdk::{AuthUser, ClientConfig, SymbiontClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration (SYMBIONT_BASE_URL, SYMBIONT_AUTH_JWT_SECRET_KEY, ...)
//! let config = ClientConfig::from_env()?;
//! let mut client = SymbiontClient::new(config)?;
//!
//! // Credentials were verified elsewhere; start a session for the user
//! let registry = client.auth_manager().expect("JWT secret configured").registry().clone();
//! let user = AuthUser::new("alice", ["user"], &registry);
//! let tokens = client.login(user)?;
//! println!("Access token expires at {}", tokens.access.expires_at);
//!
//! // Requests now carry the access token
//! let health = client.health_check().await?;
//! println!("Runtime status: {}", health.status);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod symbiont_api;

// Re-export commonly used types and functions
pub use auth::{
    jwt::{extract_bearer_token, AuthFailure, Claims, Token, TokenCodec, TokenKind},
    manager::{AuthManager, TokenPair},
    roles::{AuthUser, Permission, Role, RoleRegistry},
};
pub use symbiont_api::{
    client::SymbiontClient,
    config::{AuthConfig, ClientConfig},
    types::{ApiError, HealthResponse, SymbiontError},
};
