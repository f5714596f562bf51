use thiserror::Error;
use upg_common::{Amount, Secret};
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

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The gateway could not be reached. {0}")]
    RequestFailed(String),
    #[error("The gateway rejected the request. {0}")]
    Rejected(String),
    #[error("Refusing to fetch a resource outside the gateway API: {0}")]
    UntrustedUrl(String),
}

/// The gateway operations the payment engine relies on.
///
/// Every call takes the merchant's private key, since a single gateway client serves every shop.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Fetches the transaction a webhook points to.
    async fn fetch_transaction(
        &self,
        key: &Secret<String>,
        retrieve_url: &str,
    ) -> Result<TransactionData, GatewayError>;

    async fn get_payment(&self, key: &Secret<String>, pid: &str) -> Result<PaymentData, GatewayError>;

    async fn charge_authorized(
        &self,
        key: &Secret<String>,
        pid: &str,
        amount: Option<Amount>,
    ) -> Result<TransactionData, GatewayError>;

    async fn cancel_charge(
        &self,
        key: &Secret<String>,
        pid: &str,
        charge_id: &str,
        amount: Option<Amount>,
    ) -> Result<TransactionData, GatewayError>;

    async fn cancel_authorize(
        &self,
        key: &Secret<String>,
        pid: &str,
        authorize_id: &str,
    ) -> Result<TransactionData, GatewayError>;

    /// Creates or updates the customer and returns its resource id.
    async fn create_customer(&self, key: &Secret<String>, customer: &CustomerData) -> Result<String, GatewayError>;

    async fn create_basket(&self, key: &Secret<String>, basket: &BasketData) -> Result<String, GatewayError>;

    async fn create_metadata(&self, key: &Secret<String>, metadata: &MetadataData) -> Result<String, GatewayError>;

    async fn create_pay_page(
        &self,
        key: &Secret<String>,
        action: PayPageAction,
        request: &PayPageRequest,
    ) -> Result<PayPage, GatewayError>;

    async fn get_all_webhooks(&self, key: &Secret<String>) -> Result<Vec<WebhookEventData>, GatewayError>;

    async fn create_webhook(&self, key: &Secret<String>, url: &str) -> Result<Vec<WebhookEventData>, GatewayError>;

    async fn delete_webhook(&self, key: &Secret<String>, event_id: &str) -> Result<(), GatewayError>;

    async fn keypair(&self, key: &Secret<String>) -> Result<Keypair, GatewayError>;
}
