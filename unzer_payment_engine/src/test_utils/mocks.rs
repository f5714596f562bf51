use chrono::{DateTime, Utc};
use mockall::mock;
use shopify_tools::{PendReason, RejectReason, SessionKind, SessionResolution};
use unzer_tools::{
    data_objects::{
        BasketData,
        CustomerData,
        Keypair,
        MetadataData,
        PayPage,
        PayPageRequest,
        PaymentData,
        TransactionData,
        WebhookEventData,
    },
    PayPageAction,
};
use upg_common::{Amount, Secret};

use crate::traits::{GatewayError, MarketplaceError, MarketplaceSessions, PaymentGateway, ShopCredentials};

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn fetch_transaction(&self, key: &Secret<String>, retrieve_url: &str) -> Result<TransactionData, GatewayError>;
        async fn get_payment(&self, key: &Secret<String>, pid: &str) -> Result<PaymentData, GatewayError>;
        async fn charge_authorized(&self, key: &Secret<String>, pid: &str, amount: Option<Amount>) -> Result<TransactionData, GatewayError>;
        async fn cancel_charge(&self, key: &Secret<String>, pid: &str, charge_id: &str, amount: Option<Amount>) -> Result<TransactionData, GatewayError>;
        async fn cancel_authorize(&self, key: &Secret<String>, pid: &str, authorize_id: &str) -> Result<TransactionData, GatewayError>;
        async fn create_customer(&self, key: &Secret<String>, customer: &CustomerData) -> Result<String, GatewayError>;
        async fn create_basket(&self, key: &Secret<String>, basket: &BasketData) -> Result<String, GatewayError>;
        async fn create_metadata(&self, key: &Secret<String>, metadata: &MetadataData) -> Result<String, GatewayError>;
        async fn create_pay_page(&self, key: &Secret<String>, action: PayPageAction, request: &PayPageRequest) -> Result<PayPage, GatewayError>;
        async fn get_all_webhooks(&self, key: &Secret<String>) -> Result<Vec<WebhookEventData>, GatewayError>;
        async fn create_webhook(&self, key: &Secret<String>, url: &str) -> Result<Vec<WebhookEventData>, GatewayError>;
        async fn delete_webhook(&self, key: &Secret<String>, event_id: &str) -> Result<(), GatewayError>;
        async fn keypair(&self, key: &Secret<String>) -> Result<Keypair, GatewayError>;
    }
}

mock! {
    pub Marketplace {}
    impl MarketplaceSessions for Marketplace {
        async fn resolve_session(&self, creds: &ShopCredentials, kind: SessionKind, gid: &str) -> Result<SessionResolution, MarketplaceError>;
        async fn reject_session(&self, creds: &ShopCredentials, kind: SessionKind, gid: &str, reason: &RejectReason) -> Result<SessionResolution, MarketplaceError>;
        async fn pend_session(&self, creds: &ShopCredentials, gid: &str, reason: PendReason, expires_at: DateTime<Utc>) -> Result<SessionResolution, MarketplaceError>;
        async fn configure_app(&self, creds: &ShopCredentials, external_handle: Option<String>, ready: bool) -> Result<(), MarketplaceError>;
    }
}
