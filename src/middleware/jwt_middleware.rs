/// JWT authentication middleware
///
/// Extracts the Bearer token from the Authorization header, validates it
/// with the access audience, and injects the claims into request
/// extensions for route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{Claims, JwtService, TokenAudience};
use crate::error::AppError;

pub struct JwtMiddleware {
    jwt: JwtService,
}

impl JwtMiddleware {
    pub fn new(jwt: JwtService) -> Self {
        Self { jwt }
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
            jwt: self.jwt.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    jwt: JwtService,
}

impl<S> JwtMiddlewareService<S> {
    /// Header -> validated access-token claims.
    fn authenticate(&self, req: &ServiceRequest) -> Result<Claims, AppError> {
        let header = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        let token = JwtService::extract_bearer(header)?;
        let claims = self.jwt.validate(token)?;
        claims.require_audience(TokenAudience::Api)?;
        Ok(claims)
    }
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
        match self.authenticate(&req) {
            Ok(claims) => {
                tracing::debug!(user_id = %claims.user_id, "Access token validated");
                req.extensions_mut().insert(claims);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(err) => {
                tracing::warn!(error = %err, "Request authentication failed");
                Box::pin(async move { Err(err.into()) })
            }
        }
    }
}
