//! HMAC middleware for Actix Web.
//!
//! The marketplace signs every webhook it sends with the app's API secret (`UPG_SHOPIFY_API_SECRET`). The signature
//! is the base64-encoded HMAC-SHA256 of the raw request body, and arrives in the `X-Shopify-Hmac-Sha256` header.
//!
//! Wrap the marketplace webhook scope with [`HmacMiddlewareFactory`] so that unsigned or tampered requests never reach
//! the handlers. The body is read in full to check it, and then handed back to the request untouched.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorUnauthorized},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use upg_common::Secret;

use crate::helpers::verify_hmac;

pub struct HmacMiddlewareFactory {
    hmac_header: String,
    key: Secret<String>,
    // When false, every request is let through unchecked
    enabled: bool,
}

impl HmacMiddlewareFactory {
    pub fn new(hmac_header: &str, key: Secret<String>, enabled: bool) -> Self {
        HmacMiddlewareFactory { hmac_header: hmac_header.into(), key, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = HmacMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HmacMiddlewareService {
            hmac_header: self.hmac_header.clone(),
            key: self.key.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct HmacMiddlewareService<S> {
    hmac_header: String,
    key: Secret<String>,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for HmacMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.key.clone();
        let hmac_header = self.hmac_header.clone();
        let enabled = self.enabled;
        Box::pin(async move {
            if !enabled {
                trace!("🔐️ HMAC checks are disabled. Allowing {}", req.path());
                return service.call(req).await;
            }
            let signature = req
                .headers()
                .get(hmac_header.as_str())
                .and_then(|v| v.to_str().ok())
                .map(String::from)
                .ok_or_else(|| {
                    warn!("🔐️ No HMAC signature on a request to {}. Denying access.", req.path());
                    ErrorUnauthorized("No HMAC signature found.")
                })?;
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to read the request body: {e:?}");
                ErrorBadRequest("Failed to read the request body.")
            })?;
            if verify_hmac(secret.reveal(), data.as_ref(), &signature) {
                trace!("🔐️ HMAC check for {} ✅️", req.path());
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid HMAC signature on a request to {}. Denying access.", req.path());
                Err(ErrorUnauthorized("Invalid HMAC signature."))
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
