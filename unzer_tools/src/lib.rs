//! # Unzer tools
//!
//! A thin, typed client for the subset of the Unzer REST API used by the payments app: pay-pages, payments, charges,
//! cancels, customers, baskets, metadata, webhooks and keypair information.
//!
//! The client holds no per-merchant state. Every call takes the merchant's private key, so a single [`UnzerApi`]
//! instance can serve every shop.
mod api;
mod config;
mod error;
mod events;

pub mod data_objects;

pub use api::UnzerApi;
pub use config::UnzerConfig;
pub use data_objects::PayPageAction;
pub use error::{UnzerApiError, UnzerErrorDetail};
pub use events::{UnknownEventError, UnzerEvent};
