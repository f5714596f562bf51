use std::fmt::Debug;

use log::*;
use unzer_tools::data_objects::{find_app_webhook, Keypair, WebhookEventData};
use upg_common::Secret;

use crate::{
    db_types::{ConfigurationUpdate, ShopConfiguration},
    traits::{ConfigurationStore, MarketplaceSessions, PaymentGateway, ShopCredentials},
    upe_api::{errors::ConfigurationApiError, payment_objects::FlowSettings},
};

/// Per-shop setup: gateway keys, pay-page settings, the gateway webhook and the app's readiness with the marketplace.
pub struct ConfigurationApi<B, G, M> {
    db: B,
    gateway: G,
    marketplace: M,
    settings: FlowSettings,
}

impl<B, G, M> Debug for ConfigurationApi<B, G, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConfigurationApi")
    }
}

impl<B, G, M> ConfigurationApi<B, G, M> {
    pub fn new(db: B, gateway: G, marketplace: M, settings: FlowSettings) -> Self {
        Self { db, gateway, marketplace, settings }
    }
}

impl<B, G, M> ConfigurationApi<B, G, M>
where
    B: ConfigurationStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    pub async fn fetch(&self, shop: &str) -> Result<ShopConfiguration, ConfigurationApiError> {
        self.db.fetch_configuration(shop).await?.ok_or_else(|| ConfigurationApiError::ShopNotFound(shop.to_string()))
    }

    /// Saves the changes. If the update says whether the shop is ready, the marketplace is told first, and the flag
    /// is only stored once the marketplace has accepted it. A shop cannot be made ready without both gateway keys.
    pub async fn update(&self, mut update: ConfigurationUpdate) -> Result<ShopConfiguration, ConfigurationApiError> {
        let ready = update.ready.take();
        let config = self.db.upsert_configuration(update).await?;
        info!("🪛️ Configuration for {} updated", config.shop);
        let Some(ready) = ready else {
            return Ok(config);
        };
        if ready && config.gateway_keys().is_none() {
            return Err(ConfigurationApiError::MissingKeys(config.shop.clone()));
        }
        let creds = credentials(&config)?;
        self.marketplace.configure_app(&creds, Some(config.shop.clone()), ready).await?;
        info!("🪛️ {} told the marketplace it is {}ready", config.shop, if ready { "" } else { "not " });
        let update = ConfigurationUpdate { shop: config.shop.clone(), ready: Some(ready), ..Default::default() };
        let config = self.db.upsert_configuration(update).await?;
        Ok(config)
    }

    /// Makes sure the gateway sends its notifications to this app. Existing webhooks for the app are left alone.
    pub async fn install_webhook(&self, shop: &str) -> Result<Vec<WebhookEventData>, ConfigurationApiError> {
        let config = self.fetch(shop).await?;
        let key = private_key(&config)?;
        let url = self.settings.notifications_url();
        let existing = self.gateway.get_all_webhooks(key).await?;
        if find_app_webhook(&existing, &url) {
            debug!("🪛️ The gateway webhook for {shop} is already installed");
            return Ok(existing);
        }
        let created = self.gateway.create_webhook(key, &url).await?;
        info!("🪛️ Gateway webhook installed for {shop} at {url}");
        Ok(created)
    }

    pub async fn webhooks(&self, shop: &str) -> Result<Vec<WebhookEventData>, ConfigurationApiError> {
        let config = self.fetch(shop).await?;
        let webhooks = self.gateway.get_all_webhooks(private_key(&config)?).await?;
        Ok(webhooks)
    }

    pub async fn delete_webhook(&self, shop: &str, event_id: &str) -> Result<(), ConfigurationApiError> {
        let config = self.fetch(shop).await?;
        self.gateway.delete_webhook(private_key(&config)?, event_id).await?;
        info!("🪛️ Gateway webhook {event_id} deleted for {shop}");
        Ok(())
    }

    /// The payment types the shop's gateway keypair can offer.
    pub async fn payment_types(&self, shop: &str) -> Result<Keypair, ConfigurationApiError> {
        let config = self.fetch(shop).await?;
        let keypair = self.gateway.keypair(private_key(&config)?).await?;
        Ok(keypair)
    }

    /// Forgets the marketplace access token. Gateway keys and history are kept, in case the shop comes back.
    pub async fn uninstall(&self, shop: &str) -> Result<bool, ConfigurationApiError> {
        let found = self.db.uninstall(shop).await?;
        if found {
            info!("🪛️ {shop} uninstalled the app");
        } else {
            debug!("🪛️ {shop} uninstalled the app, but was never configured");
        }
        Ok(found)
    }
}

fn private_key(config: &ShopConfiguration) -> Result<&Secret<String>, ConfigurationApiError> {
    config.gateway_keys().map(|(key, _)| key).ok_or_else(|| ConfigurationApiError::MissingKeys(config.shop.clone()))
}

fn credentials(config: &ShopConfiguration) -> Result<ShopCredentials, ConfigurationApiError> {
    match &config.access_token {
        Some(token) if !token.reveal().is_empty() => Ok(ShopCredentials::new(&config.shop, token.clone())),
        _ => Err(ConfigurationApiError::MissingAccessToken(config.shop.clone())),
    }
}
