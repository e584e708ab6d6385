use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{
    Authenticator, Authorizer, SessionCarrier, TokenCodec, TokenKind, ADMIN_OR_MANAGER,
};
use crate::configuration::Settings;
use crate::error::AppError;
use crate::middleware::{JwtMiddleware, RequestLogger};
use crate::routes::{get_current_user, health_check, login, logout, refresh, register};
use crate::users::UserRepository;

/// Everything the HTTP layer shares across workers, built once from settings
pub struct AuthComponents {
    pub authenticator: Authenticator,
    pub authorizer: Authorizer,
    pub carrier: SessionCarrier,
}

impl AuthComponents {
    /// # Errors
    /// `ConfigError` for unusable JWT settings or hash cost. The process
    /// should not start serving in that case.
    pub fn build(users: Arc<dyn UserRepository>, settings: &Settings) -> Result<Self, AppError> {
        let codec = Arc::new(TokenCodec::new(&settings.jwt)?);
        let carrier = SessionCarrier::new(
            settings.application.environment.is_production(),
            codec.lifetime(TokenKind::Access),
            codec.lifetime(TokenKind::Refresh),
        );
        let authorizer = Authorizer::new(codec.clone(), carrier.clone());
        let authenticator = Authenticator::new(users, codec, settings.password.hash_cost)?;

        Ok(Self {
            authenticator,
            authorizer,
            carrier,
        })
    }
}

pub fn run(listener: TcpListener, components: AuthComponents) -> Result<Server, std::io::Error> {
    let authenticator = web::Data::new(components.authenticator);
    let authorizer = web::Data::new(components.authorizer);
    let carrier = web::Data::new(components.carrier);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(authenticator.clone())
            .app_data(authorizer.clone())
            .app_data(carrier.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::post().to(logout))
            // Staff-only routes; registered before `/api` so this scope matches first
            .service(
                web::scope("/api/admin")
                    .wrap(
                        JwtMiddleware::new(authorizer.get_ref().clone())
                            .require_roles(ADMIN_OR_MANAGER),
                    )
                    .route("/me", web::get().to(get_current_user)),
            )
            // Protected routes
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(authorizer.get_ref().clone()))
                    .route("/me", web::get().to(get_current_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
