//! Session Token Tests
//!
//! End-to-end tests for token issuance, validation, refresh and permission
//! derivation through the public API.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Duration;
use symbiont_sdk::{
    AuthConfig, AuthFailure, AuthManager, AuthUser, Claims, Permission, RoleRegistry,
    SymbiontError, TokenKind,
};

const TEST_SECRET_KEY: &str = "your-test-secret-key";

fn registry() -> RoleRegistry {
    RoleRegistry::new([
        ("admin", vec!["read:data", "write:data"]),
        ("user", vec!["read:data"]),
    ])
}

fn manager_with(config: AuthConfig) -> AuthManager {
    AuthManager::new(&config, registry()).expect("valid auth config")
}

fn manager() -> AuthManager {
    manager_with(AuthConfig::new(TEST_SECRET_KEY))
}

fn flip_char(c: char) -> char {
    if c == 'A' {
        'B'
    } else {
        'A'
    }
}

// ============================================================================
// Issuance and Authentication
// ============================================================================

#[test]
fn test_jwt_creation_and_validation() {
    let manager = manager();
    let user = AuthUser::new("test-user", ["user"], manager.registry());
    let tokens = manager.generate_tokens(&user).unwrap();

    let validated = manager
        .authenticate_with_jwt(&tokens.access.token)
        .expect("access token should authenticate");
    assert_eq!(validated.user_id(), user.user_id());
    assert_eq!(validated.roles(), user.roles());
    assert!(validated.has_role("user"));
}

#[test]
fn test_roundtrip_preserves_multiple_roles() {
    let manager = manager();
    let user = AuthUser::new("multi", ["user", "admin", "ghost"], manager.registry());
    let tokens = manager.generate_tokens(&user).unwrap();

    let validated = manager.authenticate_with_jwt(&tokens.access.token).unwrap();
    assert_eq!(validated, user);
}

#[test]
fn test_access_ttl_is_encoded() {
    let manager = manager_with(AuthConfig::new(TEST_SECRET_KEY).with_access_ttl_seconds(3600));
    let user = AuthUser::new("u1", ["user"], manager.registry());
    let tokens = manager.generate_tokens(&user).unwrap();

    let claims = manager.codec().decode(&tokens.access.token).unwrap();
    assert_eq!(claims.exp - claims.iat, 3600);
    assert_eq!(claims.kind, TokenKind::Access);
    assert_eq!(claims.sub, "u1");
    assert_eq!(tokens.access.expires_at.timestamp(), claims.exp);
}

#[test]
fn test_refresh_ttl_is_independent() {
    let manager = manager_with(
        AuthConfig::new(TEST_SECRET_KEY)
            .with_access_ttl_seconds(60)
            .with_refresh_ttl_seconds(86_400),
    );
    let user = AuthUser::new("u1", ["user"], manager.registry());
    let tokens = manager.generate_tokens(&user).unwrap();

    let refresh = tokens.refresh.unwrap();
    let claims = manager.codec().decode(&refresh.token).unwrap();
    assert_eq!(claims.exp - claims.iat, 86_400);
    assert_eq!(claims.kind, TokenKind::Refresh);
}

#[test]
fn test_decoding_is_repeatable() {
    let manager = manager();
    let user = AuthUser::new("u1", ["admin"], manager.registry());
    let token = manager.generate_tokens(&user).unwrap().access.token;

    let first = manager.codec().decode(&token).unwrap();
    let second = manager.codec().decode(&token).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Expiry and Tampering
// ============================================================================

#[test]
fn test_expired_token_validation() {
    let manager = manager_with(AuthConfig::new(TEST_SECRET_KEY).with_access_ttl_seconds(-1));
    let user = AuthUser::new("test-user", ["user"], manager.registry());
    let tokens = manager.generate_tokens(&user).unwrap();

    assert!(manager.authenticate_with_jwt(&tokens.access.token).is_none());

    let err = manager.codec().decode(&tokens.access.token).unwrap_err();
    assert!(
        matches!(err, SymbiontError::AuthenticationExpired(_)),
        "expected expiry error, got {}",
        err
    );
}

#[test]
fn test_forged_token_is_not_expiry() {
    let forger = AuthManager::new(&AuthConfig::new("attacker-secret"), registry()).unwrap();
    let user = AuthUser::new("test-user", ["admin"], forger.registry());
    let forged = forger.generate_tokens(&user).unwrap().access.token;

    let manager = manager();
    assert!(manager.authenticate_with_jwt(&forged).is_none());

    let err = manager.codec().decode(&forged).unwrap_err();
    assert!(matches!(err, SymbiontError::Authentication(_)));
    assert_eq!(
        manager.authenticate(&forged).unwrap_err(),
        AuthFailure::BadSignature
    );
}

#[test]
fn test_tampered_signature_is_rejected() {
    let manager = manager();
    let user = AuthUser::new("test-user", ["user"], manager.registry());
    let token = manager.generate_tokens(&user).unwrap().access.token;

    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    assert_eq!(parts.len(), 3);
    let mut signature: Vec<char> = parts[2].chars().collect();
    signature[0] = flip_char(signature[0]);
    parts[2] = signature.into_iter().collect();
    let tampered = parts.join(".");

    let err = manager.codec().decode(&tampered).unwrap_err();
    assert!(matches!(err, SymbiontError::Authentication(_)));
    assert!(!err.is_expired());
}

#[test]
fn test_tampered_payload_is_rejected() {
    let manager = manager();
    let user = AuthUser::new("test-user", ["user"], manager.registry());
    let token = manager.generate_tokens(&user).unwrap().access.token;
    let parts: Vec<&str> = token.split('.').collect();

    // Swap in a payload that promotes the user to admin
    let claims = manager.codec().decode(&token).unwrap();
    let escalated = json!({
        "sub": claims.sub,
        "roles": ["admin"],
        "kind": "access",
        "iat": claims.iat,
        "exp": claims.exp,
    });
    let payload = URL_SAFE_NO_PAD.encode(escalated.to_string());
    let tampered = format!("{}.{}.{}", parts[0], payload, parts[2]);

    assert!(manager.authenticate_with_jwt(&tampered).is_none());
    assert_eq!(
        manager.authenticate(&tampered).unwrap_err(),
        AuthFailure::BadSignature
    );
}

#[test]
fn test_unsigned_token_is_rejected() {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({"sub": "u1", "roles": ["admin"], "kind": "access", "iat": 0, "exp": 9999999999i64})
            .to_string(),
    );
    let token = format!("{}.{}.", header, payload);

    let manager = manager();
    assert!(manager.authenticate_with_jwt(&token).is_none());
    assert!(matches!(
        manager.codec().decode(&token).unwrap_err(),
        SymbiontError::Authentication(_)
    ));
}

#[derive(Serialize)]
struct ExtendedClaims<'a> {
    sub: &'a str,
    roles: Vec<&'a str>,
    kind: &'a str,
    iat: i64,
    exp: i64,
    permissions: Vec<&'a str>,
}

#[test]
fn test_unknown_claims_are_rejected() {
    let now = chrono::Utc::now().timestamp();
    let claims = ExtendedClaims {
        sub: "u1",
        roles: vec!["user"],
        kind: "access",
        iat: now,
        exp: now + 600,
        permissions: vec!["write:data"],
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET_KEY.as_bytes()),
    )
    .unwrap();

    let manager = manager();
    assert!(matches!(
        manager.authenticate(&token).unwrap_err(),
        AuthFailure::Malformed(_)
    ));
}

#[test]
fn test_negative_ttl_is_expired_under_any_leeway() {
    let user_registry = registry();
    let user = AuthUser::new("u1", ["user"], &user_registry);

    let issuer = manager_with(AuthConfig::new(TEST_SECRET_KEY).with_access_ttl_seconds(-1));
    let token = issuer.generate_tokens(&user).unwrap().access.token;

    for leeway in [0, 30, 300] {
        let verifier = manager_with(AuthConfig::new(TEST_SECRET_KEY).with_leeway_seconds(leeway));
        assert_eq!(
            verifier.authenticate(&token).unwrap_err(),
            AuthFailure::Expired,
            "leeway {}",
            leeway
        );
        assert!(verifier.codec().decode(&token).unwrap_err().is_expired());
    }
}

#[test]
fn test_expiry_before_issue_time_is_malformed() {
    let manager = manager();
    let mut claims = Claims::new("u1", vec!["user".to_string()], TokenKind::Access, 60);
    claims.iat += 600;
    let token = manager.codec().encode(&claims).unwrap();

    assert!(matches!(
        manager.authenticate(&token).unwrap_err(),
        AuthFailure::Malformed(_)
    ));
}

// ============================================================================
// Refresh
// ============================================================================

#[test]
fn test_jwt_refresh() {
    let manager = manager();
    let user = AuthUser::new("test-user", ["user"], manager.registry());
    let tokens = manager.generate_tokens(&user).unwrap();
    let refresh = tokens.refresh.expect("refresh tokens enabled");

    let new_access = manager.refresh_access_token(&refresh.token).unwrap();
    assert_eq!(new_access.kind, TokenKind::Access);

    let validated = manager.authenticate_with_jwt(&new_access.token).unwrap();
    assert_eq!(validated.user_id(), "test-user");
    assert!(validated.has_role("user"));
}

#[test]
fn test_refresh_rejects_access_token() {
    let manager = manager();
    let user = AuthUser::new("test-user", ["user"], manager.registry());
    let tokens = manager.generate_tokens(&user).unwrap();

    let err = manager.refresh_access_token(&tokens.access.token).unwrap_err();
    assert!(matches!(err, SymbiontError::Authentication(_)));
}

#[test]
fn test_refresh_issues_later_token() {
    let manager = manager_with(AuthConfig::new(TEST_SECRET_KEY).with_access_ttl_seconds(3600));
    let user = AuthUser::new("u1", ["user"], manager.registry());
    let tokens = manager.generate_tokens(&user).unwrap();
    let original = manager.codec().decode(&tokens.access.token).unwrap();

    std::thread::sleep(Duration::from_millis(1100));

    let refreshed = manager
        .refresh_access_token(&tokens.refresh.unwrap().token)
        .unwrap();
    let claims = manager.codec().decode(&refreshed.token).unwrap();

    assert!(claims.iat > original.iat);
    assert_eq!(claims.exp - claims.iat, 3600);
    assert_ne!(refreshed.token, tokens.access.token);
}

#[test]
fn test_refresh_leaves_refresh_token_usable() {
    let manager = manager();
    let user = AuthUser::new("u1", ["user"], manager.registry());
    let refresh = manager.generate_tokens(&user).unwrap().refresh.unwrap();

    assert!(manager.refresh_access_token(&refresh.token).is_ok());
    assert!(manager.refresh_access_token(&refresh.token).is_ok());
}

#[test]
fn test_refresh_disabled() {
    let manager = manager_with(AuthConfig::new(TEST_SECRET_KEY).with_refresh_tokens(false));
    let user = AuthUser::new("u1", ["user"], manager.registry());
    let tokens = manager.generate_tokens(&user).unwrap();

    assert!(tokens.refresh.is_none());
    assert!(manager.refresh_access_token(&tokens.access.token).is_err());
}

// ============================================================================
// Permissions
// ============================================================================

#[test]
fn test_permission_derivation() {
    let registry = registry();

    let admin = AuthUser::new("a", ["admin"], &registry);
    let expected: BTreeSet<Permission> = ["read:data", "write:data"]
        .into_iter()
        .map(Permission::from)
        .collect();
    assert_eq!(admin.permissions(), &expected);

    let ghost = AuthUser::new("g", ["ghost"], &registry);
    assert!(ghost.permissions().is_empty());
}

#[test]
fn test_authenticated_user_permissions_come_from_registry() {
    let manager = manager();
    let user = AuthUser::new("a", ["admin"], manager.registry());
    let token = manager.generate_tokens(&user).unwrap().access.token;

    let validated = manager.authenticate_with_jwt(&token).unwrap();
    assert!(validated.require_permission("write:data").is_ok());

    let err = validated.require_permission("manage:users").unwrap_err();
    assert!(matches!(err, SymbiontError::PermissionDenied { .. }));
    assert_eq!(err.status_code(), Some(403));
}

#[test]
fn test_manager_is_shareable_across_threads() {
    let manager = std::sync::Arc::new(manager());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let manager = manager.clone();
            std::thread::spawn(move || {
                let user = AuthUser::new(format!("user-{}", i), ["user"], manager.registry());
                let tokens = manager.generate_tokens(&user).unwrap();
                manager
                    .authenticate_with_jwt(&tokens.access.token)
                    .map(|u| u.user_id().to_string())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Some(format!("user-{}", i)));
    }
}
