/// Authentication coordinator
///
/// Combines the user lookup, password verification and token issuance for
/// login, registration and refresh. Hashing runs on the blocking pool.

use actix_web::web;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use crate::auth::claims::{AuthenticatedIdentity, Role};
use crate::auth::jwt::{TokenCodec, TokenKind, TokenPair};
use crate::auth::password::{hash_password_with_cost, verify_password};
use crate::error::{AppError, AuthError, ConfigError, DatabaseError};
use crate::users::{User, UserRepository};
use crate::validators::{is_valid_email, is_valid_name, validate_password_strength};

/// Login form. Transient, never stored.
#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Self-service sign-up form
#[derive(Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// A user together with the tokens just issued for them
pub struct SessionGrant {
    pub user: User,
    pub tokens: TokenPair,
}

pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    codec: Arc<TokenCodec>,
    hash_cost: u32,
    // verified against when the email is unknown, so both paths cost a bcrypt run
    dummy_hash: String,
}

impl Authenticator {
    /// # Errors
    /// `ConfigError` if `hash_cost` is outside bcrypt's 4..=31.
    pub fn new(
        users: Arc<dyn UserRepository>,
        codec: Arc<TokenCodec>,
        hash_cost: u32,
    ) -> Result<Self, AppError> {
        if !(4..=31).contains(&hash_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "password.hash_cost must be between 4 and 31, got {}",
                hash_cost
            ))
            .into());
        }

        let dummy_hash = hash_password_with_cost("trackshift-timing-equaliser", hash_cost)?;

        Ok(Self {
            users,
            codec,
            hash_cost,
            dummy_hash,
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Verify credentials and issue a token pair
    ///
    /// # Errors
    /// - `InvalidCredentials` for an unknown email or wrong password
    /// - `InactiveAccount` for a correct password on a non-active account
    /// - validation error for a malformed email
    pub async fn login(&self, credentials: &Credentials) -> Result<SessionGrant, AppError> {
        let email = is_valid_email(&credentials.email)?;
        let user = self.users.find_by_email(&email).await?;

        let stored_hash = match &user {
            Some(u) => u.password_hash.clone(),
            None => self.dummy_hash.clone(),
        };
        let password_valid = check_password(credentials.password.clone(), stored_hash).await?;

        let user = match user {
            Some(user) if password_valid => user,
            _ => return Err(AuthError::InvalidCredentials.into()),
        };

        if !user.is_active() {
            tracing::warn!(user_id = %user.id, "Login attempt on inactive account");
            return Err(AuthError::InactiveAccount.into());
        }

        let tokens = self.codec.issue_tokens(&user.claims())?;
        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok(SessionGrant { user, tokens })
    }

    /// Create an `EMPLOYEE` account and issue a token pair
    ///
    /// # Errors
    /// - validation errors for name, email or a weak password
    /// - `DatabaseError::UniqueConstraintViolation` if the email is taken
    pub async fn register(&self, registration: &Registration) -> Result<SessionGrant, AppError> {
        let email = is_valid_email(&registration.email)?;
        let name = is_valid_name(&registration.name)?;
        validate_password_strength(&registration.password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            )
            .into());
        }

        let password = registration.password.clone();
        let cost = self.hash_cost;
        let password_hash = web::block(move || hash_password_with_cost(&password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))??;

        let user = User::new(email, name, Role::Employee, password_hash);
        self.users.insert(&user).await?;

        let tokens = self.codec.issue_tokens(&user.claims())?;
        tracing::info!(user_id = %user.id, "User registered");

        Ok(SessionGrant { user, tokens })
    }

    /// Exchange a refresh token for a new pair carrying the user's current
    /// email and role
    ///
    /// # Errors
    /// - `ExpiredToken` / `InvalidToken` from refresh-token verification
    /// - `InvalidToken` if the user no longer exists
    /// - `InactiveAccount` if the user has been deactivated
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionGrant, AppError> {
        let claims = self.codec.verify(refresh_token, TokenKind::Refresh)?;

        let user = self
            .users
            .find_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !user.is_active() {
            return Err(AuthError::InactiveAccount.into());
        }

        let tokens = self.codec.issue_tokens(&user.claims())?;
        tracing::info!(user_id = %user.id, "Session refreshed");

        Ok(SessionGrant { user, tokens })
    }

    /// Load the stored user behind a verified identity
    ///
    /// # Errors
    /// `DatabaseError::NotFound` if the user is gone or no longer active
    pub async fn current_user(&self, identity: &AuthenticatedIdentity) -> Result<User, AppError> {
        match self.users.find_by_id(identity.user_id).await? {
            Some(user) if user.is_active() => Ok(user),
            _ => Err(DatabaseError::NotFound("User not found or inactive".to_string()).into()),
        }
    }
}

async fn check_password(password: String, stored_hash: String) -> Result<bool, AppError> {
    web::block(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))
}
