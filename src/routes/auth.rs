/// Authentication Routes
///
/// Registration, login, token refresh, logout and current user information.
/// Tokens travel only in the session cookies; response bodies carry the
/// user and the access-token lifetime.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::auth::{
    AuthenticatedIdentity, Authenticator, Authorizer, Credentials, Registration, SessionCarrier,
    SessionGrant, TokenKind,
};
use crate::error::{AppError, AuthError, ErrorContext};
use crate::users::User;

/// Public view of a user. Never includes the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub status: String,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.to_string(),
            status: user.status.to_string(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    /// Access-token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Serialize)]
struct CurrentUserResponse {
    user: UserResponse,
}

#[derive(Serialize)]
struct LogoutResponse {
    success: bool,
    message: &'static str,
}

fn session_response(
    mut builder: actix_web::HttpResponseBuilder,
    grant: &SessionGrant,
    authenticator: &Authenticator,
    carrier: &SessionCarrier,
) -> HttpResponse {
    carrier.attach(&mut builder, &grant.tokens);
    builder.json(AuthResponse {
        user: UserResponse::from(&grant.user),
        expires_in: authenticator.codec().lifetime(TokenKind::Access),
    })
}

/// POST /auth/register
///
/// Self-service sign-up. New accounts are always `EMPLOYEE`.
///
/// # Errors
/// - 400: invalid email/name or weak password
/// - 409: email already registered
pub async fn register(
    form: web::Json<Registration>,
    authenticator: web::Data<Authenticator>,
    carrier: web::Data<SessionCarrier>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let grant = authenticator.register(&form).await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %grant.user.id,
        "Registration completed"
    );

    Ok(session_response(
        HttpResponse::Created(),
        &grant,
        &authenticator,
        &carrier,
    ))
}

/// POST /auth/login
///
/// # Errors
/// - 400: malformed email
/// - 401: unknown email or wrong password (same body for both)
/// - 403: correct password on an inactive account
pub async fn login(
    form: web::Json<Credentials>,
    authenticator: web::Data<Authenticator>,
    carrier: web::Data<SessionCarrier>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let grant = authenticator.login(&form).await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %grant.user.id,
        "Login completed"
    );

    Ok(session_response(HttpResponse::Ok(), &grant, &authenticator, &carrier))
}

/// POST /auth/refresh
///
/// Reads the refresh cookie and answers with a fresh pair of cookies.
///
/// # Errors
/// - 401: refresh cookie missing, invalid or expired
/// - 403: account deactivated since the token was issued
pub async fn refresh(
    req: HttpRequest,
    authenticator: web::Data<Authenticator>,
    carrier: web::Data<SessionCarrier>,
) -> Result<HttpResponse, AppError> {
    let token = carrier
        .extract_refresh(&req)
        .ok_or(AuthError::MissingToken)?;

    let grant = authenticator.refresh(&token).await?;

    Ok(session_response(HttpResponse::Ok(), &grant, &authenticator, &carrier))
}

/// POST /auth/logout
///
/// Always succeeds and clears both cookies. Tokens already handed out stay
/// valid until they expire.
pub async fn logout(
    req: HttpRequest,
    authorizer: web::Data<Authorizer>,
    carrier: web::Data<SessionCarrier>,
) -> HttpResponse {
    let mut context = ErrorContext::new("user_logout");
    if let Ok(identity) = authorizer.authenticate(&req) {
        context = context.with_user_id(identity.user_id.to_string());
    }

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = ?context.user_id,
        "User logged out"
    );

    let mut response = HttpResponse::Ok();
    carrier.clear(&mut response);
    response.json(LogoutResponse {
        success: true,
        message: "Logged out successfully",
    })
}

/// GET /api/me
///
/// The identity is injected by `JwtMiddleware`.
///
/// # Errors
/// - 401: missing, invalid or expired access token (middleware)
/// - 404: user deleted or deactivated after the token was issued
pub async fn get_current_user(
    identity: web::ReqData<AuthenticatedIdentity>,
    authenticator: web::Data<Authenticator>,
) -> Result<HttpResponse, AppError> {
    let user = authenticator.current_user(&identity).await?;

    Ok(HttpResponse::Ok().json(CurrentUserResponse {
        user: UserResponse::from(&user),
    }))
}
