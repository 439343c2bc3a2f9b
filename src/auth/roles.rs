use crate::symbiont_api::types::SymbiontError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Named bundle of permissions assigned to a user
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Atomic capability string, e.g. `read:data`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_newtype_impls {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl Borrow<str> for $ty {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_newtype_impls!(Role);
string_newtype_impls!(Permission);

/// Static mapping from role name to permission set
///
/// Loaded once at construction and never mutated afterwards, so a registry can
/// be shared freely between threads. Unknown role names resolve to the empty
/// permission set: a user holding only unknown roles is authenticated but
/// authorized for nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRegistry {
    roles: BTreeMap<Role, BTreeSet<Permission>>,
}

impl RoleRegistry {
    /// Build a registry from `(role, permissions)` pairs
    ///
    /// # Example
    ///
    /// ```
    /// use symbiont_sdk::RoleRegistry;
    ///
    /// let registry = RoleRegistry::new([
    ///     ("admin", vec!["read:data", "write:data"]),
    ///     ("viewer", vec!["read:data"]),
    /// ]);
    /// assert_eq!(registry.permissions_for("viewer").len(), 1);
    /// assert!(registry.permissions_for("ghost").is_empty());
    /// ```
    pub fn new<I, R, P>(mapping: I) -> Self
    where
        I: IntoIterator<Item = (R, P)>,
        R: Into<Role>,
        P: IntoIterator,
        P::Item: Into<Permission>,
    {
        let mut roles: BTreeMap<Role, BTreeSet<Permission>> = BTreeMap::new();
        for (role, permissions) in mapping {
            roles
                .entry(role.into())
                .or_default()
                .extend(permissions.into_iter().map(Into::into));
        }
        Self { roles }
    }

    /// Registry with no roles; every user resolves to no permissions
    pub fn empty() -> Self {
        Self {
            roles: BTreeMap::new(),
        }
    }

    /// Permissions granted to a single role (empty for unknown roles)
    pub fn permissions_for(&self, role: &str) -> BTreeSet<Permission> {
        self.roles.get(role).cloned().unwrap_or_default()
    }

    /// Union of the permissions of every role in `roles`
    pub fn resolve<'a, I>(&self, roles: I) -> BTreeSet<Permission>
    where
        I: IntoIterator<Item = &'a Role>,
    {
        let mut permissions = BTreeSet::new();
        for role in roles {
            match self.roles.get(role.as_str()) {
                Some(granted) => permissions.extend(granted.iter().cloned()),
                None => tracing::debug!("Role '{}' is not registered, grants nothing", role),
            }
        }
        permissions
    }

    pub fn contains_role(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(Role::as_str)
    }
}

/// Built-in roles used when no mapping is configured
impl Default for RoleRegistry {
    fn default() -> Self {
        Self::new([
            (
                "admin",
                vec![
                    "read:data",
                    "write:data",
                    "read:agents",
                    "write:agents",
                    "execute:agents",
                    "manage:users",
                ],
            ),
            (
                "user",
                vec!["read:data", "write:data", "read:agents", "execute:agents"],
            ),
            ("viewer", vec!["read:data", "read:agents"]),
        ])
    }
}

/// The authenticated identity
///
/// Permissions are derived from the roles through a [`RoleRegistry`] when the
/// user is constructed and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    user_id: String,
    roles: BTreeSet<Role>,
    permissions: BTreeSet<Permission>,
}

impl AuthUser {
    pub fn new<I, R>(user_id: impl Into<String>, roles: I, registry: &RoleRegistry) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        let roles: BTreeSet<Role> = roles.into_iter().map(Into::into).collect();
        let permissions = registry.resolve(&roles);
        Self {
            user_id: user_id.into(),
            roles,
            permissions,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn permissions(&self) -> &BTreeSet<Permission> {
        &self.permissions
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Fail with [`SymbiontError::PermissionDenied`] unless the user holds `permission`
    pub fn require_permission(&self, permission: &str) -> Result<(), SymbiontError> {
        if self.has_permission(permission) {
            return Ok(());
        }
        tracing::warn!(
            "User '{}' denied: missing permission '{}'",
            self.user_id,
            permission
        );
        Err(SymbiontError::PermissionDenied {
            message: format!("user '{}' lacks the required permission", self.user_id),
            required_permission: Some(permission.to_string()),
        })
    }

    /// Role names in sorted order, as embedded in token claims
    pub(crate) fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.as_str().to_string()).collect()
    }
}
