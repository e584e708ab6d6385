/// Authentication module
///
/// Password hashing, token signing/verification, session cookies and
/// request authorization.

mod authenticator;
mod authorizer;
mod claims;
mod jwt;
mod password;
mod session;

pub use authenticator::{Authenticator, Credentials, Registration, SessionGrant};
pub use authorizer::{require_role, Authorizer, ADMIN_OR_MANAGER};
pub use claims::{AuthenticatedIdentity, IdentityClaims, Role, TokenClaims};
pub use jwt::{TokenCodec, TokenKind, TokenPair};
pub use password::{
    hash_password, hash_password_with_cost, verify_password, HASH_COST, MAX_PASSWORD_BYTES,
};
pub use session::{SessionCarrier, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
