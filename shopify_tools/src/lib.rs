mod api;
mod config;
mod error;
mod mutations;

pub mod data_objects;

pub use api::PaymentsAppsApi;
pub use config::ShopifyConfig;
pub use data_objects::{PendReason, RejectReason, SessionKind, SessionResolution, UserError};
pub use error::ShopifyApiError;
