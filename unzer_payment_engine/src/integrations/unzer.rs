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
    UnzerApi,
    UnzerApiError,
};

use crate::traits::{GatewayError, PaymentGateway};

impl From<UnzerApiError> for GatewayError {
    fn from(e: UnzerApiError) -> Self {
        match e {
            UnzerApiError::GatewayError(_) => GatewayError::Rejected(e.to_string()),
            UnzerApiError::UntrustedUrl(url) => GatewayError::UntrustedUrl(url),
            e => GatewayError::RequestFailed(e.to_string()),
        }
    }
}

impl PaymentGateway for UnzerApi {
    async fn fetch_transaction(
        &self,
        key: &Secret<String>,
        retrieve_url: &str,
    ) -> Result<TransactionData, GatewayError> {
        Ok(self.fetch_resource(key, retrieve_url).await?)
    }

    async fn get_payment(&self, key: &Secret<String>, pid: &str) -> Result<PaymentData, GatewayError> {
        Ok(UnzerApi::get_payment(self, key, pid).await?)
    }

    async fn charge_authorized(
        &self,
        key: &Secret<String>,
        pid: &str,
        amount: Option<Amount>,
    ) -> Result<TransactionData, GatewayError> {
        Ok(UnzerApi::charge_authorized(self, key, pid, amount).await?)
    }

    async fn cancel_charge(
        &self,
        key: &Secret<String>,
        pid: &str,
        charge_id: &str,
        amount: Option<Amount>,
    ) -> Result<TransactionData, GatewayError> {
        Ok(UnzerApi::cancel_charge(self, key, pid, charge_id, amount).await?)
    }

    async fn cancel_authorize(
        &self,
        key: &Secret<String>,
        pid: &str,
        authorize_id: &str,
    ) -> Result<TransactionData, GatewayError> {
        Ok(UnzerApi::cancel_authorize(self, key, pid, authorize_id).await?)
    }

    async fn create_customer(&self, key: &Secret<String>, customer: &CustomerData) -> Result<String, GatewayError> {
        Ok(self.create_or_update_customer(key, customer).await?)
    }

    async fn create_basket(&self, key: &Secret<String>, basket: &BasketData) -> Result<String, GatewayError> {
        Ok(UnzerApi::create_basket(self, key, basket).await?)
    }

    async fn create_metadata(&self, key: &Secret<String>, metadata: &MetadataData) -> Result<String, GatewayError> {
        Ok(UnzerApi::create_metadata(self, key, metadata).await?)
    }

    async fn create_pay_page(
        &self,
        key: &Secret<String>,
        action: PayPageAction,
        request: &PayPageRequest,
    ) -> Result<PayPage, GatewayError> {
        Ok(UnzerApi::create_pay_page(self, key, action, request).await?)
    }

    async fn get_all_webhooks(&self, key: &Secret<String>) -> Result<Vec<WebhookEventData>, GatewayError> {
        Ok(UnzerApi::get_all_webhooks(self, key).await?)
    }

    async fn create_webhook(&self, key: &Secret<String>, url: &str) -> Result<Vec<WebhookEventData>, GatewayError> {
        Ok(UnzerApi::create_webhook(self, key, url).await?)
    }

    async fn delete_webhook(&self, key: &Secret<String>, event_id: &str) -> Result<(), GatewayError> {
        Ok(UnzerApi::delete_webhook(self, key, event_id).await?)
    }

    async fn keypair(&self, key: &Secret<String>) -> Result<Keypair, GatewayError> {
        Ok(UnzerApi::keypair(self, key).await?)
    }
}
