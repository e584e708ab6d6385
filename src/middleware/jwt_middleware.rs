/// JWT Authentication Middleware
///
/// Authenticates every request in its scope through the `Authorizer`
/// (access-token cookie or bearer header), optionally applies a role gate,
/// and injects the `AuthenticatedIdentity` into request extensions for
/// handlers to read with `web::ReqData`.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{Authorizer, Role};
use crate::error::AppError;

pub struct JwtMiddleware {
    authorizer: Authorizer,
    allowed_roles: Option<Rc<[Role]>>,
}

impl JwtMiddleware {
    /// Require a valid access token, any role
    pub fn new(authorizer: Authorizer) -> Self {
        Self {
            authorizer,
            allowed_roles: None,
        }
    }

    /// Additionally require one of `roles`. Rejections are 403, not 401.
    pub fn require_roles(mut self, roles: &[Role]) -> Self {
        self.allowed_roles = Some(Rc::from(roles));
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            authorizer: self.authorizer.clone(),
            allowed_roles: self.allowed_roles.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    authorizer: Authorizer,
    allowed_roles: Option<Rc<[Role]>>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let outcome = match &self.allowed_roles {
            Some(roles) => self.authorizer.authorize(req.request(), roles),
            None => self.authorizer.authenticate(req.request()),
        };

        match outcome {
            Ok(identity) => {
                tracing::debug!(
                    user_id = %identity.user_id,
                    role = %identity.role,
                    "Request authenticated"
                );
                req.extensions_mut().insert(identity);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                tracing::warn!(path = %req.path(), code = e.code(), "Request rejected");
                Box::pin(async move { Err(AppError::Auth(e).into()) })
            }
        }
    }
}
