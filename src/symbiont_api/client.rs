use crate::auth::jwt::Token;
use crate::auth::manager::{AuthManager, TokenPair};
use crate::auth::roles::AuthUser;
use crate::symbiont_api::config::ClientConfig;
use crate::symbiont_api::types::{ApiError, HealthResponse, SymbiontError};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Authenticated user and the tokens issued for them
#[derive(Debug, Clone)]
struct Session {
    user: AuthUser,
    tokens: TokenPair,
}

/// HTTP client for the Symbiont runtime API
///
/// Attaches a bearer credential to every request (the session access token
/// when logged in, otherwise the configured API key) and maps error statuses
/// onto [`SymbiontError`].
#[derive(Debug, Clone)]
pub struct SymbiontClient {
    config: ClientConfig,
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client for making requests
    client: reqwest::Client,
    /// Present only when a JWT secret is configured
    auth: Option<AuthManager>,
    session: Option<Session>,
}

impl SymbiontClient {
    /// Create a client from configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use symbiont_sdk::{ClientConfig, SymbiontClient};
    ///
    /// # async fn example() -> Result<(), symbiont_sdk::SymbiontError> {
    /// let client = SymbiontClient::new(ClientConfig::from_env()?)?;
    /// let health = client.health_check().await?;
    /// println!("Runtime status: {}", health.status);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self, SymbiontError> {
        config.validate()?;

        let auth = match config.auth.jwt_secret_key {
            Some(_) => Some(AuthManager::new(&config.auth, config.auth.role_registry())?),
            None => {
                tracing::debug!("No JWT secret configured, session login is unavailable");
                None
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                ApiError::Request(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        tracing::debug!("Creating SymbiontClient with base URL: {}", base_url);

        Ok(Self {
            config,
            base_url,
            client,
            auth,
            session: None,
        })
    }

    /// Get the base URL for this client
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The configuration this client was built from
    pub fn configuration(&self) -> &ClientConfig {
        &self.config
    }

    pub fn auth_manager(&self) -> Option<&AuthManager> {
        self.auth.as_ref()
    }

    pub fn current_user(&self) -> Option<&AuthUser> {
        self.session.as_ref().map(|s| &s.user)
    }

    /// Role names of the logged-in user; empty when logged out
    pub fn user_roles(&self) -> Vec<String> {
        self.current_user()
            .map(|user| user.roles().iter().map(|r| r.to_string()).collect())
            .unwrap_or_default()
    }

    /// Tokens of the active session
    pub fn tokens(&self) -> Option<&TokenPair> {
        self.session.as_ref().map(|s| &s.tokens)
    }

    /// Start a session for an already-verified user
    ///
    /// Issues a token pair; subsequent requests carry the access token.
    pub fn login(&mut self, user: AuthUser) -> Result<TokenPair, SymbiontError> {
        let auth = self.auth.as_ref().ok_or_else(|| {
            SymbiontError::config_key(
                "JWT secret key is required to start a session",
                "jwt_secret_key",
            )
        })?;

        let tokens = auth.generate_tokens(&user)?;
        tracing::info!(
            "Session started for user '{}' (access token valid for {}s)",
            user.user_id(),
            tokens.access.expires_in()
        );
        self.session = Some(Session {
            user,
            tokens: tokens.clone(),
        });
        Ok(tokens)
    }

    /// Replace the session access token using its refresh token
    pub fn refresh_session(&mut self) -> Result<Token, SymbiontError> {
        let auth = self.auth.as_ref().ok_or_else(|| {
            SymbiontError::config_key(
                "JWT secret key is required to refresh a session",
                "jwt_secret_key",
            )
        })?;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| SymbiontError::Authentication("no active session".to_string()))?;
        let refresh = session.tokens.refresh.as_ref().ok_or_else(|| {
            SymbiontError::Authentication("session has no refresh token".to_string())
        })?;
        if refresh.is_expired() {
            tracing::warn!(
                "Refresh token for user '{}' expired at {}",
                session.user.user_id(),
                refresh.expires_at
            );
            return Err(SymbiontError::AuthenticationExpired(format!(
                "session refresh token expired at {}, log in again",
                refresh.expires_at
            )));
        }

        let access = auth.refresh_access_token(&refresh.token)?;
        session.tokens.access = access.clone();
        Ok(access)
    }

    /// Forget the session; requests fall back to the API key
    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!("Session ended for user '{}'", session.user.user_id());
        }
    }

    /// Credential sent as `Authorization: Bearer ...`
    pub fn bearer_token(&self) -> Option<&str> {
        self.session
            .as_ref()
            .map(|s| s.tokens.access.token.as_str())
            .or(self.config.api_key.as_deref())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Make an HTTP request to the API
    ///
    /// `endpoint` is relative to the base URL; a leading slash is ignored.
    ///
    /// # Errors
    ///
    /// - [`SymbiontError::Authentication`] for 401 responses
    /// - [`ApiError::NotFound`] for 404 responses
    /// - [`ApiError::RateLimited`] for 429 responses
    /// - [`ApiError::Http`] for any other non-2xx response
    /// - [`ApiError::Network`] when the request cannot be sent
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, SymbiontError> {
        let url = self.url(endpoint);
        tracing::debug!("Sending {} request to: {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Content-Type", "application/json");

        if let Some(session) = &self.session {
            if session.tokens.access.is_expired() {
                tracing::warn!(
                    "Sending expired access token for user '{}'; refresh the session",
                    session.user.user_id()
                );
            }
        }
        if let Some(token) = self.bearer_token() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Failed to send {} request to {}: {}", method, url, e);
            ApiError::from(e)
        })?;

        let status = response.status();
        tracing::debug!("Received response with status: {}", status);

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        tracing::error!(
            "{} {} failed: HTTP {} - {}",
            method,
            url,
            status.as_u16(),
            error_body
        );

        Err(status_error(status, error_body))
    }

    /// GET `endpoint` and deserialize the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, SymbiontError> {
        let response = self.request(Method::GET, endpoint, None).await?;
        parse_json(response).await
    }

    /// POST a JSON body to `endpoint` and deserialize the JSON response
    pub async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, SymbiontError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(|e| {
            ApiError::Request(format!("Failed to serialize request body: {}", e))
        })?;
        let response = self.request(Method::POST, endpoint, Some(&body)).await?;
        parse_json(response).await
    }

    /// Check runtime health (`GET health`)
    pub async fn health_check(&self) -> Result<HealthResponse, SymbiontError> {
        self.get_json("health").await
    }
}

fn status_error(status: StatusCode, body: String) -> SymbiontError {
    match status {
        StatusCode::UNAUTHORIZED => SymbiontError::Authentication(format!(
            "Authentication failed - check your credentials: {}",
            body
        )),
        StatusCode::NOT_FOUND => ApiError::NotFound(body).into(),
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited(body).into(),
        _ => ApiError::Http {
            status: status.as_u16(),
            message: body,
        }
        .into(),
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, SymbiontError> {
    response.json::<T>().await.map_err(|e| {
        tracing::error!("Failed to parse response JSON: {}", e);
        ApiError::Parse(format!("Failed to parse response JSON: {}", e)).into()
    })
}
