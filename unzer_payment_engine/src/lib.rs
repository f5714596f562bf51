//! Unzer Payment Engine
//!
//! The Unzer Payment Engine lets a marketplace shop take payments through the Unzer gateway using the offsite
//! payments protocol. The marketplace asks the app to start, capture, refund or void a payment; the buyer is sent to
//! an Unzer pay-page; and the gateway reports the outcome back through webhooks.
//!
//! The library is divided into these sections:
//! 1. The storage and service contracts ([`mod@traits`]). Backends implement the store traits, and the gateway and
//!    marketplace clients are wrapped by [`PaymentGateway`] and [`MarketplaceSessions`]. The data types that cross
//!    these seams are in [`mod@db_types`].
//! 2. The SQLite backend ([`SqliteDatabase`]). You should never need to call it directly, other than to construct it.
//! 3. The public API ([`mod@upe_api`]). [`PaymentFlowApi`] drives payment sessions, [`WebhookApi`] reconciles gateway
//!    notifications, [`ConfigurationApi`] manages shops, [`DashboardApi`] serves the merchant dashboard and
//!    [`CheckoutApi`] keeps the checkout snapshots used to build baskets.
pub mod db_types;
pub mod helpers;
mod integrations;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;
pub mod upe_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(test)]
mod scenario_tests;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    CheckoutStore,
    ConfigurationStore,
    InsertResult,
    MarketplaceSessions,
    PaymentGateway,
    PaymentLogStore,
    PaymentStore,
    SessionStore,
    ShopCredentials,
};
pub use upe_api::{
    checkout_api::CheckoutApi,
    configuration_api::ConfigurationApi,
    dashboard_api::DashboardApi,
    errors::{ConfigurationApiError, DashboardApiError, PaymentFlowError, WebhookError},
    payment_flow_api::PaymentFlowApi,
    payment_logger::PaymentLogger,
    payment_objects,
    payment_objects::FlowSettings,
    webhook_api::WebhookApi,
};
