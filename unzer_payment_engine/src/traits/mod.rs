//! # Storage backends and external seams
//!
//! This module defines the interface contracts the payment engine needs from the outside world.
//!
//! ## Storage
//! * [`SessionStore`] keeps payment sessions, their capture, refund and void sessions, the gateway transaction
//!   mirrors and the cancel correlation rows. All the writes that must survive webhook redelivery are conditional
//!   inserts or guarded updates.
//! * [`PaymentLogStore`] is the append-only audit trail shown to merchants.
//! * [`CheckoutStore`] keeps the marketplace checkout snapshots used to build gateway baskets.
//! * [`ConfigurationStore`] holds per-shop gateway keys, pay-page branding and the marketplace access token.
//!
//! ## External services
//! * [`PaymentGateway`] is the subset of the gateway REST API the engine calls.
//! * [`MarketplaceSessions`] resolves, rejects and pends sessions with the marketplace.
//!
//! The `integrations` module implements the two service traits for the `unzer_tools` and `shopify_tools` clients.
mod configuration_store;
mod data_objects;
mod marketplace_sessions;
mod payment_gateway;
mod session_store;

pub use configuration_store::{ConfigurationStore, ConfigurationStoreError};
pub use data_objects::InsertResult;
pub use marketplace_sessions::{MarketplaceError, MarketplaceSessions, ShopCredentials};
pub use payment_gateway::{GatewayError, PaymentGateway};
pub use session_store::{CheckoutStore, PaymentLogStore, PaymentStore, SessionStore, SessionStoreError};
