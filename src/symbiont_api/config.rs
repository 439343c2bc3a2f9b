//! Client and authentication configuration.
//!
//! Configuration is an explicit value handed to constructors; nothing here is
//! process-global. A [`ClientConfig`] can be built in code, parsed from TOML,
//! or read from `SYMBIONT_*` environment variables (with a `.env` file loaded
//! first when present). Environment values override file values.

use crate::auth::jwt::MAX_LEEWAY_SECONDS;
use crate::auth::roles::RoleRegistry;
use crate::symbiont_api::types::SymbiontError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
/// 15 minutes
pub const DEFAULT_ACCESS_TTL_SECONDS: i64 = 900;
/// 7 days
pub const DEFAULT_REFRESH_TTL_SECONDS: i64 = 604_800;

pub const ENV_BASE_URL: &str = "SYMBIONT_BASE_URL";
pub const ENV_API_KEY: &str = "SYMBIONT_API_KEY";
pub const ENV_TIMEOUT_SECONDS: &str = "SYMBIONT_TIMEOUT_SECONDS";
pub const ENV_JWT_SECRET_KEY: &str = "SYMBIONT_AUTH_JWT_SECRET_KEY";
pub const ENV_ACCESS_TTL_SECONDS: &str = "SYMBIONT_AUTH_ACCESS_TTL_SECONDS";
pub const ENV_REFRESH_TTL_SECONDS: &str = "SYMBIONT_AUTH_REFRESH_TTL_SECONDS";
pub const ENV_ENABLE_REFRESH_TOKENS: &str = "SYMBIONT_AUTH_ENABLE_REFRESH_TOKENS";
pub const ENV_LEEWAY_SECONDS: &str = "SYMBIONT_AUTH_LEEWAY_SECONDS";

/// Settings for token issuance and validation
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Symmetric signing secret. Required to issue or validate tokens.
    pub jwt_secret_key: Option<String>,
    /// Lifetime of access tokens. Default: 900 seconds
    pub access_ttl_seconds: i64,
    /// Lifetime of refresh tokens. Default: 7 days
    pub refresh_ttl_seconds: i64,
    /// When false no refresh tokens are issued and refreshing always fails
    pub enable_refresh_tokens: bool,
    /// Clock-skew tolerance applied to `exp`. Valid range: 0-300 seconds.
    pub leeway_seconds: u64,
    /// Role name to permission mapping. When absent the built-in roles apply.
    pub roles: Option<BTreeMap<String, Vec<String>>>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret_key: None,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            enable_refresh_tokens: true,
            leeway_seconds: 0,
            roles: None,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret_key", &self.jwt_secret_key.as_ref().map(|_| "<redacted>"))
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .field("enable_refresh_tokens", &self.enable_refresh_tokens)
            .field("leeway_seconds", &self.leeway_seconds)
            .field("roles", &self.roles)
            .finish()
    }
}

impl AuthConfig {
    /// Default settings with the given signing secret
    pub fn new(jwt_secret_key: impl Into<String>) -> Self {
        Self {
            jwt_secret_key: Some(jwt_secret_key.into()),
            ..Self::default()
        }
    }

    /// Set access token lifetime (builder pattern)
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    /// Set refresh token lifetime (builder pattern)
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    /// Enable or disable refresh tokens (builder pattern)
    pub fn with_refresh_tokens(mut self, enabled: bool) -> Self {
        self.enable_refresh_tokens = enabled;
        self
    }

    /// Set leeway seconds (builder pattern)
    pub fn with_leeway_seconds(mut self, leeway: u64) -> Self {
        self.leeway_seconds = leeway;
        self
    }

    /// Set the role mapping (builder pattern)
    pub fn with_roles<I, R, P>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = (R, P)>,
        R: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let mapping: BTreeMap<String, Vec<String>> = roles
            .into_iter()
            .map(|(role, permissions)| {
                (role.into(), permissions.into_iter().map(Into::into).collect())
            })
            .collect();
        self.roles = Some(mapping);
        self
    }

    /// Registry built from `roles`, or the built-in roles when unset
    pub fn role_registry(&self) -> RoleRegistry {
        match &self.roles {
            Some(mapping) => RoleRegistry::new(
                mapping
                    .iter()
                    .map(|(role, permissions)| (role.as_str(), permissions.iter().map(String::as_str))),
            ),
            None => RoleRegistry::default(),
        }
    }

    /// Check the settings needed to issue and validate tokens
    pub fn validate(&self) -> Result<(), SymbiontError> {
        match self.jwt_secret_key.as_deref() {
            Some(secret) if !secret.trim().is_empty() => {}
            _ => {
                return Err(SymbiontError::config_key(
                    "JWT secret key is required for token authentication",
                    "jwt_secret_key",
                ))
            }
        }

        // Negative values are allowed and issue already-expired tokens
        if self.access_ttl_seconds == 0 {
            return Err(SymbiontError::config_key(
                "must not be zero",
                "access_ttl_seconds",
            ));
        }

        if self.enable_refresh_tokens && self.refresh_ttl_seconds <= 0 {
            return Err(SymbiontError::config_key(
                format!(
                    "must be positive when refresh tokens are enabled, got {}",
                    self.refresh_ttl_seconds
                ),
                "refresh_ttl_seconds",
            ));
        }

        if self.leeway_seconds > MAX_LEEWAY_SECONDS {
            return Err(SymbiontError::config_key(
                format!(
                    "must be between 0 and {} seconds, got {}",
                    MAX_LEEWAY_SECONDS, self.leeway_seconds
                ),
                "leeway_seconds",
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), SymbiontError> {
        if let Some(secret) = env_string(ENV_JWT_SECRET_KEY) {
            self.jwt_secret_key = Some(secret);
        }
        if let Some(ttl) = env_parse(ENV_ACCESS_TTL_SECONDS)? {
            self.access_ttl_seconds = ttl;
        }
        if let Some(ttl) = env_parse(ENV_REFRESH_TTL_SECONDS)? {
            self.refresh_ttl_seconds = ttl;
        }
        if let Some(enabled) = env_bool(ENV_ENABLE_REFRESH_TOKENS)? {
            self.enable_refresh_tokens = enabled;
        }
        if let Some(leeway) = env_parse(ENV_LEEWAY_SECONDS)? {
            self.leeway_seconds = leeway;
        }
        Ok(())
    }
}

/// Top-level SDK configuration
///
/// # Example
///
/// ```
/// use symbiont_sdk::ClientConfig;
///
/// let config = ClientConfig::from_toml_str(r#"
///     base_url = "https://runtime.example.com/api/v1"
///
///     [auth]
///     jwt_secret_key = "change-me"
///     access_ttl_seconds = 600
/// "#).unwrap();
///
/// assert_eq!(config.auth.access_ttl_seconds, 600);
/// assert!(config.auth.enable_refresh_tokens);
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the runtime API
    pub base_url: String,
    /// Static API key sent as a bearer credential when no session is active
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout_seconds: u64,
    pub auth: AuthConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            auth: AuthConfig::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_seconds", &self.timeout_seconds)
            .field("auth", &self.auth)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the API key (builder pattern)
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout (builder pattern)
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Set the auth settings (builder pattern)
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// Parse a TOML document; missing fields take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, SymbiontError> {
        toml::from_str(content).map_err(|e| {
            tracing::error!("Failed to parse client configuration: {}", e);
            SymbiontError::config(format!("invalid TOML configuration: {}", e))
        })
    }

    /// Read and parse a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SymbiontError> {
        let path = path.as_ref();
        tracing::debug!("Loading client configuration from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| {
            SymbiontError::config(format!(
                "failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by `SYMBIONT_*` environment variables
    pub fn from_env() -> Result<Self, SymbiontError> {
        Self::load(None::<&Path>)
    }

    /// Optional TOML file, then environment overrides, then validation of the
    /// general (non-auth) settings
    pub fn load(path: Option<impl AsRef<Path>>) -> Result<Self, SymbiontError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", env_file.display());
        }

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SYMBIONT_*` environment variables on top of the current values
    pub fn apply_env_overrides(&mut self) -> Result<(), SymbiontError> {
        if let Some(base_url) = env_string(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(api_key) = env_string(ENV_API_KEY) {
            self.api_key = Some(api_key);
        }
        if let Some(timeout) = env_parse(ENV_TIMEOUT_SECONDS)? {
            self.timeout_seconds = timeout;
        }
        self.auth.apply_env_overrides()
    }

    /// Check base URL and timeout
    ///
    /// Auth settings are checked separately by [`AuthConfig::validate`] because
    /// a client without a signing secret is still usable with an API key.
    pub fn validate(&self) -> Result<(), SymbiontError> {
        let url = url::Url::parse(&self.base_url).map_err(|e| {
            SymbiontError::config_key(format!("invalid URL '{}': {}", self.base_url, e), "base_url")
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SymbiontError::config_key(
                format!("unsupported scheme '{}', expected http or https", url.scheme()),
                "base_url",
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(SymbiontError::config_key(
                "must be at least 1 second",
                "timeout_seconds",
            ));
        }

        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>, SymbiontError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env_string(key) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            SymbiontError::config_key(format!("invalid value '{}': {}", raw, e), key)
        }),
        None => Ok(None),
    }
}

fn env_bool(key: &str) -> Result<Option<bool>, SymbiontError> {
    match env_string(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(SymbiontError::config_key(
                format!("invalid boolean '{}'", raw),
                key,
            )),
        },
        None => Ok(None),
    }
}
