use thiserror::Error;

use crate::db_types::{ConfigurationUpdate, ShopConfiguration};

#[derive(Debug, Clone, Error)]
pub enum ConfigurationStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The shop domain cannot be empty")]
    MissingShop,
}

impl From<sqlx::Error> for ConfigurationStoreError {
    fn from(e: sqlx::Error) -> Self {
        ConfigurationStoreError::DatabaseError(e.to_string())
    }
}

/// Per-shop configuration: gateway keys, excluded payment types, pay-page branding and the marketplace access token.
#[allow(async_fn_in_trait)]
pub trait ConfigurationStore: Clone {
    async fn fetch_configuration(&self, shop: &str) -> Result<Option<ShopConfiguration>, ConfigurationStoreError>;

    /// Applies the update on top of the current configuration, creating it if necessary. Fields that are `None` are
    /// left alone, and empty keys or tokens are cleared.
    async fn upsert_configuration(
        &self,
        update: ConfigurationUpdate,
    ) -> Result<ShopConfiguration, ConfigurationStoreError>;

    /// Forgets the marketplace access token and marks the shop as not ready. Returns `false` if the shop is unknown.
    async fn uninstall(&self, shop: &str) -> Result<bool, ConfigurationStoreError>;
}
