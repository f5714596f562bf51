//! # Unzer payment engine public API
//!
//! The `upe_api` module exposes the programmatic API of the payment engine. Each API is a small struct that is
//! created from the backends it needs, so that callers only pull in what they use.
//!
//! * [`payment_flow_api`] handles the marketplace session requests and the buyer returning from the pay-page.
//! * [`webhook_api`] reconciles gateway notifications with payment sessions and settles refunds and voids.
//! * [`configuration_api`] manages per-shop gateway keys, pay-page settings and the gateway webhook.
//! * [`dashboard_api`] provides read-only views for the merchant dashboard.
//! * [`checkout_api`] records marketplace checkouts, which are used to build gateway baskets.
//!
//! # API usage
//!
//! ```rust,ignore
//! use unzer_payment_engine::{FlowSettings, PaymentFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = PaymentFlowApi::new(db, unzer_api, payments_apps_api, FlowSettings::new(...));
//! let redirect = api.resume_payment("P1").await?;
//! ```
pub mod checkout_api;
pub mod configuration_api;
pub mod dashboard_api;
pub mod errors;
pub mod payment_flow_api;
pub mod payment_logger;
pub mod payment_objects;
pub mod webhook_api;
