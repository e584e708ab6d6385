/// JWT Token Generation and Validation
///
/// HS256 tokens with two independent secrets and lifetimes: short-lived
/// access tokens and long-lived refresh tokens. A token only verifies
/// against the secret of its own kind. Expiry is checked with zero leeway.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::claims::{IdentityClaims, TokenClaims};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ConfigError};

const MIN_SECRET_LENGTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Freshly issued access + refresh tokens
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_seconds: i64,
}

impl SigningKeys {
    fn from_secret(secret: &str, lifetime_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_seconds,
        }
    }
}

/// Signs and verifies identity tokens
///
/// Built once at startup from `JwtSettings` and shared read-only.
pub struct TokenCodec {
    access: SigningKeys,
    refresh: SigningKeys,
    issuer: String,
}

impl TokenCodec {
    /// # Errors
    /// Returns `ConfigError` if a secret is missing or shorter than 32 bytes,
    /// the two secrets are equal, or a lifetime is not positive.
    pub fn new(config: &JwtSettings) -> Result<Self, ConfigError> {
        validate_secret("jwt.access_secret", &config.access_secret)?;
        validate_secret("jwt.refresh_secret", &config.refresh_secret)?;

        if config.access_secret == config.refresh_secret {
            return Err(ConfigError::InvalidValue(
                "jwt.access_secret and jwt.refresh_secret must differ".to_string(),
            ));
        }
        if config.access_token_expiry <= 0 || config.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "token lifetimes must be positive".to_string(),
            ));
        }
        if config.issuer.is_empty() {
            return Err(ConfigError::MissingRequired("jwt.issuer".to_string()));
        }

        Ok(Self {
            access: SigningKeys::from_secret(&config.access_secret, config.access_token_expiry),
            refresh: SigningKeys::from_secret(&config.refresh_secret, config.refresh_token_expiry),
            issuer: config.issuer.clone(),
        })
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Configured lifetime of a token kind, in seconds
    pub fn lifetime(&self, kind: TokenKind) -> i64 {
        self.keys(kind).lifetime_seconds
    }

    pub fn sign_access(&self, claims: &IdentityClaims) -> Result<String, AppError> {
        self.sign_with_lifetime(claims, TokenKind::Access, self.access.lifetime_seconds)
    }

    pub fn sign_refresh(&self, claims: &IdentityClaims) -> Result<String, AppError> {
        self.sign_with_lifetime(claims, TokenKind::Refresh, self.refresh.lifetime_seconds)
    }

    /// Issue both tokens for one identity
    pub fn issue_tokens(&self, claims: &IdentityClaims) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.sign_access(claims)?,
            refresh_token: self.sign_refresh(claims)?,
        })
    }

    /// Sign with an explicit lifetime. Zero or negative yields an expired token.
    pub fn sign_with_lifetime(
        &self,
        claims: &IdentityClaims,
        kind: TokenKind,
        lifetime_seconds: i64,
    ) -> Result<String, AppError> {
        let payload = TokenClaims::new(claims, kind, lifetime_seconds, &self.issuer);

        encode(&Header::new(Algorithm::HS256), &payload, &self.keys(kind).encoding)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Check signature, issuer, kind and expiry, then return the claims
    ///
    /// # Errors
    /// `ExpiredToken` for a correctly signed token past its expiry,
    /// `InvalidToken` for everything else (bad signature, wrong secret,
    /// malformed input, wrong kind).
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<IdentityClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);

        let data = decode::<TokenClaims>(token, &self.keys(kind).decoding, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => {
                    tracing::debug!(error = %e, token_kind = ?kind, "Token rejected");
                    AuthError::InvalidToken
                }
            },
        )?;

        // jsonwebtoken still accepts exp == now with zero leeway
        if data.claims.exp <= chrono::Utc::now().timestamp() {
            return Err(AuthError::ExpiredToken);
        }

        if data.claims.token_use != kind {
            tracing::warn!(token_kind = ?kind, "Token presented for the wrong purpose");
            return Err(AuthError::InvalidToken);
        }

        data.claims.identity().ok_or(AuthError::InvalidToken)
    }
}

fn validate_secret(name: &str, secret: &str) -> Result<(), ConfigError> {
    if secret.is_empty() {
        return Err(ConfigError::MissingRequired(name.to_string()));
    }
    if secret.len() < MIN_SECRET_LENGTH {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be at least {} bytes",
            name, MIN_SECRET_LENGTH
        )));
    }
    Ok(())
}
