/// Request authorization
///
/// Resolves a request to an `AuthenticatedIdentity` and checks role
/// allow-lists. Stateless: every call only reads the shared codec.

use actix_web::HttpRequest;
use std::sync::Arc;

use crate::auth::claims::{AuthenticatedIdentity, Role};
use crate::auth::jwt::{TokenCodec, TokenKind};
use crate::auth::session::SessionCarrier;
use crate::error::AuthError;

/// Roles allowed on admin, shift-oversight and report endpoints
pub const ADMIN_OR_MANAGER: &[Role] = &[Role::Admin, Role::Manager];

#[derive(Clone)]
pub struct Authorizer {
    codec: Arc<TokenCodec>,
    carrier: SessionCarrier,
}

impl Authorizer {
    pub fn new(codec: Arc<TokenCodec>, carrier: SessionCarrier) -> Self {
        Self { codec, carrier }
    }

    /// Authenticate a request from its access token
    ///
    /// # Errors
    /// `MissingToken` when neither cookie nor bearer header is present,
    /// `ExpiredToken` or `InvalidToken` when verification fails.
    pub fn authenticate(&self, req: &HttpRequest) -> Result<AuthenticatedIdentity, AuthError> {
        let token = self
            .carrier
            .extract_access(req)
            .ok_or(AuthError::MissingToken)?;

        self.codec
            .verify(&token, TokenKind::Access)
            .map(AuthenticatedIdentity::from)
    }

    /// Authenticate, then apply a role gate
    ///
    /// # Errors
    /// As `authenticate`, plus `InsufficientRole` when the verified role is
    /// not in `allowed`.
    pub fn authorize(
        &self,
        req: &HttpRequest,
        allowed: &[Role],
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let identity = self.authenticate(req)?;
        if !require_role(&identity, allowed) {
            return Err(AuthError::InsufficientRole);
        }
        Ok(identity)
    }
}

/// Flat membership check. No role implies another.
pub fn require_role(identity: &AuthenticatedIdentity, allowed: &[Role]) -> bool {
    identity.has_role(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::IdentityClaims;
    use crate::auth::jwt::tests::get_test_config;
    use crate::auth::session::ACCESS_TOKEN_COOKIE;
    use actix_web::cookie::Cookie;
    use actix_web::http::header;
    use actix_web::test::TestRequest;
    use uuid::Uuid;

    fn authorizer() -> (Authorizer, Arc<TokenCodec>) {
        let codec = Arc::new(TokenCodec::new(&get_test_config()).unwrap());
        let carrier = SessionCarrier::new(false, 900, 604_800);
        (Authorizer::new(codec.clone(), carrier), codec)
    }

    fn identity_with(role: Role) -> AuthenticatedIdentity {
        AuthenticatedIdentity::from(IdentityClaims::new(Uuid::new_v4(), "u@example.com", role))
    }

    #[test]
    fn test_require_role() {
        assert!(!require_role(&identity_with(Role::Employee), ADMIN_OR_MANAGER));
        assert!(require_role(&identity_with(Role::Admin), ADMIN_OR_MANAGER));
        assert!(require_role(&identity_with(Role::Manager), ADMIN_OR_MANAGER));
    }

    #[test]
    fn test_admin_does_not_inherit_employee_only_gate() {
        assert!(!require_role(&identity_with(Role::Admin), &[Role::Employee]));
    }

    #[test]
    fn test_authenticate_missing_token() {
        let (authorizer, _) = authorizer();
        let req = TestRequest::default().to_http_request();

        assert_eq!(authorizer.authenticate(&req), Err(AuthError::MissingToken));
    }

    #[test]
    fn test_authenticate_from_cookie() {
        let (authorizer, codec) = authorizer();
        let claims = IdentityClaims::new(Uuid::new_v4(), "emp@example.com", Role::Employee);
        let token = codec.sign_access(&claims).unwrap();

        let req = TestRequest::default()
            .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, token))
            .to_http_request();

        let identity = authorizer.authenticate(&req).unwrap();
        assert_eq!(identity.user_id, claims.user_id);
        assert_eq!(identity.email, "emp@example.com");
        assert_eq!(identity.role, Role::Employee);
    }

    #[test]
    fn test_authenticate_from_bearer_header() {
        let (authorizer, codec) = authorizer();
        let claims = IdentityClaims::new(Uuid::new_v4(), "mgr@example.com", Role::Manager);
        let token = codec.sign_access(&claims).unwrap();

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_http_request();

        assert_eq!(authorizer.authenticate(&req).unwrap().role, Role::Manager);
    }

    #[test]
    fn test_authenticate_expired_token() {
        let (authorizer, codec) = authorizer();
        let token = codec
            .sign_with_lifetime(
                &IdentityClaims::new(Uuid::new_v4(), "e@example.com", Role::Employee),
                TokenKind::Access,
                -1,
            )
            .unwrap();

        let req = TestRequest::default()
            .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, token))
            .to_http_request();

        assert_eq!(authorizer.authenticate(&req), Err(AuthError::ExpiredToken));
    }

    #[test]
    fn test_authenticate_rejects_refresh_token() {
        let (authorizer, codec) = authorizer();
        let token = codec
            .sign_refresh(&IdentityClaims::new(Uuid::new_v4(), "e@example.com", Role::Admin))
            .unwrap();

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_http_request();

        assert_eq!(authorizer.authenticate(&req), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_authorize_distinguishes_forbidden_from_unauthenticated() {
        let (authorizer, codec) = authorizer();
        let token = codec
            .sign_access(&IdentityClaims::new(Uuid::new_v4(), "e@example.com", Role::Employee))
            .unwrap();

        let req = TestRequest::default()
            .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, token))
            .to_http_request();
        assert_eq!(
            authorizer.authorize(&req, ADMIN_OR_MANAGER),
            Err(AuthError::InsufficientRole)
        );

        let anonymous = TestRequest::default().to_http_request();
        assert_eq!(
            authorizer.authorize(&anonymous, ADMIN_OR_MANAGER),
            Err(AuthError::MissingToken)
        );
    }
}
