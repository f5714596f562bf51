//! Bearer-token middleware for the admin API.
//!
//! Every request must carry `Authorization: Bearer <UPG_ADMIN_TOKEN>`. When no admin token is configured, the admin
//! API is switched off and every request is refused.

use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorForbidden, ErrorUnauthorized},
    http::header::AUTHORIZATION,
    Error,
};
use futures::future::{ok, Ready};
use log::{trace, warn};
use sha2::{Digest, Sha256};
use upg_common::Secret;

pub struct AdminAuthMiddlewareFactory {
    token: Option<Secret<String>>,
}

impl AdminAuthMiddlewareFactory {
    pub fn new(token: Option<Secret<String>>) -> Self {
        AdminAuthMiddlewareFactory { token }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminAuthMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminAuthMiddlewareService { token: self.token.clone(), service: Rc::new(service) })
    }
}

pub struct AdminAuthMiddlewareService<S> {
    token: Option<Secret<String>>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let token = self.token.clone();
        Box::pin(async move {
            let Some(token) = token else {
                warn!("💻️ Admin API request to {} refused. UPG_ADMIN_TOKEN is not set.", req.path());
                return Err(ErrorForbidden("The admin API is disabled."));
            };
            let presented = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim)
                .ok_or_else(|| ErrorUnauthorized("A bearer token is required."))?;
            if tokens_match(presented, token.reveal()) {
                trace!("💻️ Admin request to {} authorised", req.path());
                service.call(req).await
            } else {
                warn!("💻️ Admin API request to {} with an invalid token", req.path());
                Err(ErrorUnauthorized("Invalid bearer token."))
            }
        })
    }
}

/// Compares digests of the two tokens, so the time taken does not depend on where they first differ.
fn tokens_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
