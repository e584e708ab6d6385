/// Middleware module
///
/// Authentication and role gating for protected scopes, plus request logging.

mod jwt_middleware;
mod request_logger;

pub use jwt_middleware::JwtMiddleware;
pub use request_logger::RequestLogger;
