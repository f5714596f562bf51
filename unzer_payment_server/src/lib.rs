//! # Unzer payment gateway server
//! This crate hosts the HTTP server for the Unzer payments app. It is responsible for:
//! * Taking payment, capture, refund and void session requests from the marketplace.
//! * Sending buyers to the gateway pay-page and back to the marketplace when they return.
//! * Receiving gateway notifications and reconciling them with the payment sessions.
//! * Receiving checkout, uninstall and compliance webhooks from the marketplace.
//! * Serving the admin API for shop configuration and the payments dashboard.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/payment_session`, `/capture_session`, `/refund_session`, `/void_session`: Marketplace session requests.
//! * `/app/processing/{id}`: Where buyers are sent, both from the marketplace and back from the pay-page.
//! * `/app/notifications`: Gateway webhooks.
//! * `/shopify/webhooks`: Marketplace webhooks. Requests must carry a valid HMAC signature.
//! * `/api/...`: The admin API. Requests must carry the admin bearer token.

pub mod cli;
pub mod config;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
