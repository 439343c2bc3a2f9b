use crate::symbiont_api::types::SymbiontError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signing algorithm for every session token. Tokens carrying any other `alg`
/// header are rejected.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Largest accepted clock-skew tolerance
pub const MAX_LEEWAY_SECONDS: u64 = 300;

/// Kind of a session token, bound into the signed claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived bearer credential for API calls
    Access,
    /// Long-lived credential used only to obtain new access tokens
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Claims embedded in every session token
///
/// The shape is fixed: decoding rejects payloads with unknown or missing
/// fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Claims {
    /// Subject - the user ID
    pub sub: String,
    /// Role names assigned to the user
    pub roles: Vec<String>,
    /// Access or refresh
    pub kind: TokenKind,
    /// Issued at (Unix timestamp, seconds)
    pub iat: i64,
    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,
}

impl Claims {
    /// Claims issued now and expiring `ttl_seconds` later
    pub fn new(
        sub: impl Into<String>,
        roles: Vec<String>,
        kind: TokenKind,
        ttl_seconds: i64,
    ) -> Self {
        let iat = Utc::now().timestamp();
        Self {
            sub: sub.into(),
            roles,
            kind,
            iat,
            exp: iat.saturating_add(ttl_seconds),
        }
    }

    /// Lifetime the token was issued with
    pub fn ttl_seconds(&self) -> i64 {
        self.exp.saturating_sub(self.iat)
    }

    /// Check if the token has expired, allowing `leeway_seconds` of clock skew
    pub fn is_expired(&self, leeway_seconds: u64) -> bool {
        let now = Utc::now().timestamp();
        let leeway = i64::try_from(leeway_seconds).unwrap_or(i64::MAX);
        self.exp.saturating_add(leeway) < now
    }
}

/// Why a presented token did not verify
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// Correct signature, `exp` already passed. A refresh may fix this.
    Expired,
    /// Signature does not match the configured secret
    BadSignature,
    /// Not a well-formed session token
    Malformed(String),
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::Expired => f.write_str("token has expired"),
            AuthFailure::BadSignature => f.write_str("token signature is invalid"),
            AuthFailure::Malformed(reason) => write!(f, "malformed token: {}", reason),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthFailure {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthFailure::Expired,
            ErrorKind::InvalidSignature => AuthFailure::BadSignature,
            _ => AuthFailure::Malformed(err.to_string()),
        }
    }
}

impl From<AuthFailure> for SymbiontError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::Expired => SymbiontError::AuthenticationExpired(failure.to_string()),
            other => SymbiontError::Authentication(other.to_string()),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for SymbiontError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthFailure::from(err).into()
    }
}

/// A signed token plus the metadata callers need without decoding it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The encoded JWT
    pub token: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub(crate) fn from_claims(token: String, claims: &Claims) -> Result<Self, SymbiontError> {
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or_else(|| {
            SymbiontError::config(format!(
                "token expiry {} is outside the representable range",
                claims.exp
            ))
        })?;

        Ok(Self {
            token,
            kind: claims.kind,
            expires_at,
        })
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Seconds until expiry, negative once expired
    pub fn expires_in(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }
}

/// Symmetric signer/verifier for session tokens
///
/// Holds only immutable key material after construction, so one codec can be
/// shared across threads.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &SIGNING_ALGORITHM)
            .field("leeway_seconds", &self.validation.leeway)
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec from the signing secret
    ///
    /// `leeway_seconds` is extra tolerance before `exp` counts as passed; it is
    /// capped at [`MAX_LEEWAY_SECONDS`].
    ///
    /// # Errors
    ///
    /// Returns [`SymbiontError::Configuration`] when the secret is empty or
    /// whitespace.
    pub fn new(secret: &str, leeway_seconds: u64) -> Result<Self, SymbiontError> {
        if secret.trim().is_empty() {
            return Err(SymbiontError::config_key(
                "a JWT signing secret is required",
                "jwt_secret_key",
            ));
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        // Validation defaults to 60s of leeway; only the configured amount applies
        validation.leeway = leeway_seconds.min(MAX_LEEWAY_SECONDS);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn leeway_seconds(&self) -> u64 {
        self.validation.leeway
    }

    /// Sign claims into a compact JWT
    pub fn encode(&self, claims: &Claims) -> Result<String, SymbiontError> {
        let header = Header::new(SIGNING_ALGORITHM);
        encode(&header, claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to sign {} token: {}", claims.kind, e);
            SymbiontError::config(format!("failed to sign token: {}", e))
        })
    }

    /// Verify a token and return its claims
    ///
    /// The signature is checked before anything else. A correctly signed token
    /// whose `exp` has passed fails with
    /// [`SymbiontError::AuthenticationExpired`]; every other problem (bad
    /// signature, wrong algorithm, malformed payload) fails with
    /// [`SymbiontError::Authentication`].
    pub fn decode(&self, token: &str) -> Result<Claims, SymbiontError> {
        self.verify(token).map_err(SymbiontError::from)
    }

    /// Same checks as [`TokenCodec::decode`], reporting the reason for failure
    pub fn verify(&self, token: &str) -> Result<Claims, AuthFailure> {
        tracing::debug!("Decoding session token (length: {})", token.len());

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!("Session token rejected: {}", e);
                AuthFailure::from(e)
            })?
            .claims;

        if claims.sub.is_empty() {
            return Err(AuthFailure::Malformed(
                "missing or empty subject (sub) claim".to_string(),
            ));
        }

        if claims.exp <= claims.iat {
            // A past expiry is reported as expired whatever the leeway
            if claims.exp <= Utc::now().timestamp() {
                return Err(AuthFailure::Expired);
            }
            return Err(AuthFailure::Malformed(format!(
                "expiry ({}) is not after issue time ({})",
                claims.exp, claims.iat
            )));
        }

        Ok(claims)
    }
}

/// Credential part of an `Authorization: Bearer <token>` header value
///
/// The scheme is matched case-insensitively; surrounding whitespace is
/// ignored.
pub fn extract_bearer_token(header_value: &str) -> Result<&str, AuthFailure> {
    let (scheme, credential) = header_value
        .trim()
        .split_once(char::is_whitespace)
        .ok_or_else(|| AuthFailure::Malformed("expected 'Bearer <token>'".to_string()))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthFailure::Malformed(format!(
            "unsupported authorization scheme '{}'",
            scheme
        )));
    }

    match credential.trim() {
        "" => Err(AuthFailure::Malformed("empty bearer credential".to_string())),
        token if token.contains(char::is_whitespace) => Err(AuthFailure::Malformed(
            "bearer credential contains whitespace".to_string(),
        )),
        token => Ok(token),
    }
}
