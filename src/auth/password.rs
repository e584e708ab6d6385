/// Password Hashing and Verification
///
/// bcrypt with a fixed work factor. The stored string is self-describing
/// (`$2b$<cost>$<salt><digest>`), so verification needs nothing but the hash.

use bcrypt::{hash, verify};

use crate::error::{AppError, ValidationError};

/// Work factor used for new hashes unless configured otherwise
pub const HASH_COST: u32 = 10;

/// bcrypt ignores every byte past the 72nd
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password with the default work factor
///
/// # Errors
/// Returns a validation error for an empty password and an internal error
/// if bcrypt fails. Never returns a usable hash on failure.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash_password_with_cost(password, HASH_COST)
}

/// Hash a password with an explicit bcrypt cost (4..=31)
///
/// Passwords over 72 bytes are rejected rather than silently truncated.
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, AppError> {
    if password.is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "password".to_string(),
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_BYTES,
        )));
    }

    hash(password, cost).map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored hash
///
/// A malformed stored hash yields `false`, same as a mismatch, so callers
/// cannot tell the two apart. Digest comparison is constant-time.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    // could never have been hashed, and would be truncated into a collision
    if password.len() > MAX_PASSWORD_BYTES {
        return false;
    }
    match verify(password, stored_hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            false
        }
    }
}
