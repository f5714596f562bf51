mod admin_auth;
mod hmac;

pub use admin_auth::{AdminAuthMiddlewareFactory, AdminAuthMiddlewareService};
pub use hmac::{HmacMiddlewareFactory, HmacMiddlewareService};
