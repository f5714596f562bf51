use std::fmt::Debug;

use log::*;

use crate::{
    traits::{CheckoutStore, SessionStoreError},
    upe_api::payment_objects::CheckoutWebhook,
};

/// Keeps the latest checkout snapshot for every cart, so that the pay-page can show the buyer's basket.
pub struct CheckoutApi<B> {
    db: B,
}

impl<B> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B> CheckoutApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CheckoutApi<B>
where B: CheckoutStore
{
    /// Stores the checkout from a `checkouts/create` or `checkouts/update` webhook. Returns `false` if the payload
    /// had no cart token and was dropped.
    pub async fn record_checkout(&self, shop: &str, payload: CheckoutWebhook) -> Result<bool, SessionStoreError> {
        let Some(checkout) = payload.into_checkout(shop) else {
            debug!("🛒️ Checkout webhook from {shop} has no cart token. Ignoring it");
            return Ok(false);
        };
        let token = checkout.token.clone();
        self.db.upsert_checkout(checkout).await?;
        debug!("🛒️ Checkout for cart {token} stored");
        Ok(true)
    }
}
