//! Session token issuance, validation and role-based permissions.
//!
//! - [`jwt`] signs and verifies HS256 session tokens with a shared secret
//! - [`manager`] issues access/refresh pairs and turns tokens back into users
//! - [`roles`] maps role names to permissions
//!
//! Tokens are stateless bearer credentials. Nothing about issued tokens is
//! stored, so a token stays valid until it expires.
pub mod jwt;
pub mod manager;
pub mod roles;

pub use jwt::{extract_bearer_token, AuthFailure, Claims, Token, TokenCodec, TokenKind};
pub use manager::{AuthManager, TokenPair};
pub use roles::{AuthUser, Permission, Role, RoleRegistry};
