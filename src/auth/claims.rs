/// Identity claims and roles
///
/// `IdentityClaims` is what gets signed into a token. `TokenClaims` is the
/// JWT payload on the wire (RFC 7519 names plus our own fields).
/// `AuthenticatedIdentity` is the request-scoped result of a verification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::jwt::TokenKind;

/// Fixed role enumeration. No hierarchy: allow-lists name each role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Employee => "EMPLOYEE",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "MANAGER" => Ok(Role::Manager),
            "EMPLOYEE" => Ok(Role::Employee),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Identity payload embedded in every token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl IdentityClaims {
    pub fn new(user_id: Uuid, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
        }
    }
}

/// JWT payload
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Which secret signed this token
    pub token_use: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub iss: String,
}

impl TokenClaims {
    /// Build a payload that expires `lifetime_seconds` from now. A zero or
    /// negative lifetime produces an already-expired token.
    pub fn new(
        identity: &IdentityClaims,
        token_use: TokenKind,
        lifetime_seconds: i64,
        issuer: &str,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: identity.user_id.to_string(),
            email: identity.email.clone(),
            role: identity.role,
            token_use,
            iat: now,
            exp: now + lifetime_seconds,
            iss: issuer.to_string(),
        }
    }

    /// Recover the identity. `None` if the subject is not a UUID.
    pub fn identity(&self) -> Option<IdentityClaims> {
        let user_id = Uuid::parse_str(&self.sub).ok()?;
        Some(IdentityClaims::new(user_id, self.email.clone(), self.role))
    }
}

/// Verified identity for the current request only. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedIdentity {
    pub fn has_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role)
    }
}

impl From<IdentityClaims> for AuthenticatedIdentity {
    fn from(claims: IdentityClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
        }
    }
}
