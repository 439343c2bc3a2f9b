/// Symbiont runtime API integration module
///
/// This module provides the HTTP client, configuration loading and the error
/// types shared by the whole SDK.
///
/// ## Session Flow
///
/// 1. Caller verifies the user's credentials and builds an `AuthUser`
/// 2. `SymbiontClient::login` issues an access/refresh token pair
/// 3. Requests carry the access token as a bearer credential
/// 4. The runtime answers 401 once the token is stale; the caller refreshes
///    with `SymbiontClient::refresh_session` and retries
pub mod client;
pub mod config;
pub mod types;

pub use client::SymbiontClient;
pub use config::{AuthConfig, ClientConfig};
pub use types::{ApiError, HealthResponse, SymbiontError};
