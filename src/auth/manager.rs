use crate::auth::jwt::{extract_bearer_token, AuthFailure, Claims, Token, TokenCodec, TokenKind};
use crate::auth::roles::{AuthUser, RoleRegistry};
use crate::symbiont_api::config::AuthConfig;
use crate::symbiont_api::types::SymbiontError;

/// Access token plus, when refresh tokens are enabled, its paired refresh token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: Token,
    pub refresh: Option<Token>,
}

/// Issues and validates session tokens
///
/// The manager is a stateless factory/validator: it holds the codec, the
/// configured lifetimes and the role registry, none of which change after
/// construction. Tokens are bearer credentials; nothing about issued tokens is
/// remembered, so there is no revocation.
///
/// # Example
///
/// ```
/// use symbiont_sdk::{AuthConfig, AuthManager, AuthUser, RoleRegistry};
///
/// # fn main() -> Result<(), symbiont_sdk::SymbiontError> {
/// let config = AuthConfig::new("change-me").with_access_ttl_seconds(600);
/// let manager = AuthManager::new(&config, RoleRegistry::default())?;
///
/// let user = AuthUser::new("alice", ["user"], manager.registry());
/// let tokens = manager.generate_tokens(&user)?;
///
/// let authenticated = manager.authenticate_with_jwt(&tokens.access.token).unwrap();
/// assert_eq!(authenticated.user_id(), "alice");
/// assert!(authenticated.has_permission("read:data"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AuthManager {
    codec: TokenCodec,
    registry: RoleRegistry,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    enable_refresh_tokens: bool,
}

impl AuthManager {
    /// Build a manager from validated auth configuration
    ///
    /// # Errors
    ///
    /// Returns [`SymbiontError::Configuration`] when the configuration is
    /// invalid, most commonly a missing `jwt_secret_key`.
    pub fn new(config: &AuthConfig, registry: RoleRegistry) -> Result<Self, SymbiontError> {
        config.validate()?;

        let secret = config.jwt_secret_key.as_deref().unwrap_or_default();
        let codec = TokenCodec::new(secret, config.leeway_seconds)?;

        tracing::debug!(
            "AuthManager ready: access_ttl={}s refresh_ttl={}s refresh_enabled={}",
            config.access_ttl_seconds,
            config.refresh_ttl_seconds,
            config.enable_refresh_tokens
        );

        Ok(Self {
            codec,
            registry,
            access_ttl_seconds: config.access_ttl_seconds,
            refresh_ttl_seconds: config.refresh_ttl_seconds,
            enable_refresh_tokens: config.enable_refresh_tokens,
        })
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn refresh_tokens_enabled(&self) -> bool {
        self.enable_refresh_tokens
    }

    /// Issue an access token and, if enabled, a refresh token for `user`
    ///
    /// Both tokens carry the same subject and roles but different `kind`
    /// claims, so they never compare equal.
    pub fn generate_tokens(&self, user: &AuthUser) -> Result<TokenPair, SymbiontError> {
        let access = self.issue(user.user_id(), user.role_names(), TokenKind::Access)?;

        let refresh = if self.enable_refresh_tokens {
            Some(self.issue(user.user_id(), user.role_names(), TokenKind::Refresh)?)
        } else {
            None
        };

        tracing::info!(
            "Issued token pair for user '{}' (access expires at {}, refresh: {})",
            user.user_id(),
            access.expires_at,
            refresh.is_some()
        );

        Ok(TokenPair { access, refresh })
    }

    /// Validate a token and rebuild the identity it carries
    ///
    /// Tokens of either kind are accepted; callers that need an access token
    /// specifically should check with [`AuthManager::decode_kind`].
    /// Permissions are always recomputed from the current registry, never read
    /// from the token.
    pub fn authenticate(&self, token: &str) -> Result<AuthUser, AuthFailure> {
        let claims = self.codec.verify(token)?;
        Ok(AuthUser::new(claims.sub, claims.roles, &self.registry))
    }

    /// Permissive form of [`AuthManager::authenticate`]: any failure is `None`
    pub fn authenticate_with_jwt(&self, token: &str) -> Option<AuthUser> {
        match self.authenticate(token) {
            Ok(user) => Some(user),
            Err(failure) => {
                tracing::warn!("JWT authentication failed: {}", failure);
                None
            }
        }
    }

    /// Authenticate the value of an incoming `Authorization` header
    ///
    /// Same as [`AuthManager::authenticate_with_jwt`] once the bearer
    /// credential has been extracted; headers that are not `Bearer <token>`
    /// are `None`.
    pub fn authenticate_header(&self, header_value: &str) -> Option<AuthUser> {
        let authenticated =
            extract_bearer_token(header_value).and_then(|token| self.authenticate(token));
        match authenticated {
            Ok(user) => Some(user),
            Err(failure) => {
                tracing::warn!("Authorization header rejected: {}", failure);
                None
            }
        }
    }

    /// Decode a token and require it to be of `kind`
    pub fn decode_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, SymbiontError> {
        let claims = self.codec.decode(token)?;
        if claims.kind != kind {
            tracing::warn!(
                "Rejected {} token for user '{}' where a {} token was required",
                claims.kind,
                claims.sub,
                kind
            );
            return Err(SymbiontError::Authentication(format!(
                "expected {} token, got {} token",
                kind, claims.kind
            )));
        }
        Ok(claims)
    }

    /// Issue a new access token from a valid refresh token
    ///
    /// The new token has the refresh token's subject and roles with a fresh
    /// `iat`/`exp`. The refresh token itself is neither rotated nor
    /// invalidated.
    ///
    /// # Errors
    ///
    /// [`SymbiontError::Authentication`] when refresh tokens are disabled, the
    /// token is not a refresh token, or it fails verification;
    /// [`SymbiontError::AuthenticationExpired`] when it has expired.
    pub fn refresh_access_token(&self, refresh_token: &str) -> Result<Token, SymbiontError> {
        if !self.enable_refresh_tokens {
            tracing::warn!("Refusing token refresh: refresh tokens are disabled");
            return Err(SymbiontError::Authentication(
                "refresh tokens are disabled".to_string(),
            ));
        }

        let claims = self.decode_kind(refresh_token, TokenKind::Refresh)?;
        let access = self.issue(&claims.sub, claims.roles, TokenKind::Access)?;

        tracing::info!(
            "Refreshed access token for user '{}' (expires at {})",
            claims.sub,
            access.expires_at
        );

        Ok(access)
    }

    fn issue(&self, sub: &str, roles: Vec<String>, kind: TokenKind) -> Result<Token, SymbiontError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_seconds,
            TokenKind::Refresh => self.refresh_ttl_seconds,
        };
        if ttl == 0 {
            return Err(SymbiontError::config_key(
                format!("{} tokens cannot have a zero lifetime", kind),
                format!("{}_ttl_seconds", kind),
            ));
        }
        let claims = Claims::new(sub, roles, kind, ttl);
        let encoded = self.codec.encode(&claims)?;
        tracing::debug!("Signed {} token (length: {})", kind, encoded.len());
        Token::from_claims(encoded, &claims)
    }
}
