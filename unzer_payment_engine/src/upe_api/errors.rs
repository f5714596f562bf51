use thiserror::Error;

use crate::{
    helpers::CustomerMappingError,
    traits::{ConfigurationStoreError, GatewayError, MarketplaceError, SessionStoreError},
};

#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("The cancel URL does not contain a checkout token: {0}")]
    MissingCheckoutToken(String),
    #[error("Payment session {0} does not exist")]
    PaymentSessionNotFound(String),
    #[error("Shop {0} has not configured its gateway keys")]
    MissingConfiguration(String),
    #[error("Shop {0} has no marketplace access token")]
    MissingAccessToken(String),
    #[error("Payment session {0} has not been sent to the gateway yet")]
    PaymentNotStarted(String),
    #[error("Payment session {0} has no {1} transaction to cancel")]
    NothingToCancel(String, &'static str),
    #[error("The customer details cannot be sent to the gateway. {0}")]
    InvalidCustomer(#[from] CustomerMappingError),
    #[error("The gateway response is missing {0}")]
    IncompleteGatewayResponse(&'static str),
    #[error("The marketplace response is missing a redirect URL")]
    MissingRedirect,
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Gateway error: {0}")]
    GatewayError(#[from] GatewayError),
    #[error("Marketplace error: {0}")]
    MarketplaceError(#[from] MarketplaceError),
}

impl From<SessionStoreError> for PaymentFlowError {
    fn from(e: SessionStoreError) -> Self {
        match e {
            SessionStoreError::PaymentSessionNotFound(id) => PaymentFlowError::PaymentSessionNotFound(id),
            e => PaymentFlowError::DatabaseError(e.to_string()),
        }
    }
}

impl From<ConfigurationStoreError> for PaymentFlowError {
    fn from(e: ConfigurationStoreError) -> Self {
        PaymentFlowError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    #[error("Malformed notification. {0}")]
    MalformedNotification(String),
    #[error("Unknown webhook event: {0}")]
    UnknownEvent(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Gateway error: {0}")]
    GatewayError(#[from] GatewayError),
}

impl From<SessionStoreError> for WebhookError {
    fn from(e: SessionStoreError) -> Self {
        WebhookError::DatabaseError(e.to_string())
    }
}

impl From<ConfigurationStoreError> for WebhookError {
    fn from(e: ConfigurationStoreError) -> Self {
        WebhookError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ConfigurationApiError {
    #[error("Shop {0} is not configured")]
    ShopNotFound(String),
    #[error("Shop {0} has not configured its gateway keys")]
    MissingKeys(String),
    #[error("Shop {0} has no marketplace access token")]
    MissingAccessToken(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The shop domain cannot be empty")]
    MissingShop,
    #[error("Gateway error: {0}")]
    GatewayError(#[from] GatewayError),
    #[error("Marketplace error: {0}")]
    MarketplaceError(#[from] MarketplaceError),
}

impl From<ConfigurationStoreError> for ConfigurationApiError {
    fn from(e: ConfigurationStoreError) -> Self {
        match e {
            ConfigurationStoreError::MissingShop => ConfigurationApiError::MissingShop,
            e => ConfigurationApiError::DatabaseError(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum DashboardApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid query: {0}")]
    QueryError(String),
}

impl From<SessionStoreError> for DashboardApiError {
    fn from(e: SessionStoreError) -> Self {
        DashboardApiError::DatabaseError(e.to_string())
    }
}
