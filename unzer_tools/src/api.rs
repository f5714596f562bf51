use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
    Url,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use upg_common::{Amount, Secret};

use crate::{
    config::UnzerConfig,
    data_objects::{
        AmountRequest,
        BasketData,
        CustomerData,
        Keypair,
        MetadataData,
        PayPage,
        PayPageAction,
        PayPageRequest,
        PaymentData,
        PaymentMethodTypes,
        ResourceId,
        TransactionData,
        TransactionRequest,
        WebhookEventData,
        WebhookEvents,
    },
    error::UnzerErrorDetail,
    UnzerApiError,
};

const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Attributes sent with every pay-page so that the buy-now-pay-later methods ask for a birthdate.
const PAY_PAGE_ATTRIBUTES: [(&str, &str); 3] = [
    ("customerFields.paylater-installment", "birthdate"),
    ("customerFields.paylater-invoice", "birthdate"),
    ("customerFields.paylater-direct-debit", "birthdate"),
];

#[derive(Clone)]
pub struct UnzerApi {
    config: UnzerConfig,
    client: Arc<Client>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    #[serde(default)]
    is_error: bool,
    #[serde(default)]
    errors: Vec<UnzerErrorDetail>,
}

impl UnzerApi {
    pub fn new(config: UnzerConfig) -> Result<Self, UnzerApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| UnzerApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &UnzerConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    /// Sends a request to the gateway and deserializes the response.
    ///
    /// The gateway reports failures with an `isError` flag in the body, sometimes with a 2xx status, so every
    /// response body is checked for it before it is mapped into `T`.
    ///
    /// Requests that could not be delivered (connection failures) are retried up to `max_retries` times for every
    /// method. Timeouts are only retried for GET and DELETE, since the gateway may already have acted on a POST.
    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        key: &Secret<String>,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<T, UnzerApiError> {
        let auth = HeaderValue::from_str(&basic_auth(key))
            .map_err(|e| UnzerApiError::RestRequestError(format!("Invalid private key. {e}")))?;
        let retry_timeouts = matches!(method, Method::GET | Method::DELETE);
        let mut attempt = 0;
        let response = loop {
            trace!("🏦️ Sending {method} {url} (attempt {})", attempt + 1);
            let mut req = self.client.request(method.clone(), url).header(AUTHORIZATION, auth.clone());
            if let Some(body) = body {
                req = req.json(body);
            }
            match req.send().await {
                Ok(response) => break response,
                Err(e) if attempt < self.config.max_retries && (e.is_connect() || (retry_timeouts && e.is_timeout())) => {
                    attempt += 1;
                    warn!("🏦️ Transient failure calling {url}. {e}. Retrying ({attempt}/{})", self.config.max_retries);
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                },
                Err(e) => return Err(UnzerApiError::RestResponseError(e.to_string())),
            }
        };
        let status = response.status();
        let text = response.text().await.map_err(|e| UnzerApiError::RestResponseError(e.to_string()))?;
        let value = if text.trim().is_empty() { Ok(Value::Null) } else { serde_json::from_str::<Value>(&text) };
        let value = value.map_err(|e| {
            if status.is_success() {
                UnzerApiError::JsonError(e.to_string())
            } else {
                UnzerApiError::QueryError { status: status.as_u16(), message: text.clone() }
            }
        })?;
        if let Ok(err) = serde_json::from_value::<ErrorResponse>(value.clone()) {
            if err.is_error {
                debug!("🏦️ Gateway returned an error for {url}: {:?}", err.errors);
                return Err(UnzerApiError::GatewayError(err.errors));
            }
        }
        if !status.is_success() {
            return Err(UnzerApiError::QueryError { status: status.as_u16(), message: text });
        }
        trace!("🏦️ {method} {url} successful. {status}");
        serde_json::from_value(value).map_err(|e| UnzerApiError::JsonError(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, key: &Secret<String>, path: &str) -> Result<T, UnzerApiError> {
        self.rest_query::<T, ()>(key, Method::GET, &self.url(path), None).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        key: &Secret<String>,
        path: &str,
        body: &B,
    ) -> Result<T, UnzerApiError> {
        self.rest_query::<T, B>(key, Method::POST, &self.url(path), Some(body)).await
    }

    /// Fetches a resource by the absolute URL given in a webhook's `retrieveUrl`.
    ///
    /// The URL must point at the configured gateway host, otherwise the private key would leak to a third party.
    pub async fn fetch_resource<T: DeserializeOwned>(
        &self,
        key: &Secret<String>,
        url: &str,
    ) -> Result<T, UnzerApiError> {
        self.check_trusted_url(url)?;
        self.rest_query::<T, ()>(key, Method::GET, url, None).await
    }

    fn check_trusted_url(&self, url: &str) -> Result<(), UnzerApiError> {
        let untrusted = || UnzerApiError::UntrustedUrl(url.to_string());
        let base = Url::parse(&self.config.api_url).map_err(|e| UnzerApiError::Initialization(e.to_string()))?;
        let target = Url::parse(url).map_err(|_| untrusted())?;
        let same_origin = base.scheme() == target.scheme() &&
            base.host_str() == target.host_str() &&
            base.port_or_known_default() == target.port_or_known_default();
        if same_origin {
            Ok(())
        } else {
            warn!("🏦️ Rejected retrieve URL {url}");
            Err(untrusted())
        }
    }

    pub async fn authorize(
        &self,
        key: &Secret<String>,
        request: &TransactionRequest,
    ) -> Result<TransactionData, UnzerApiError> {
        debug!("🏦️ Authorizing {} {}", request.amount, request.currency);
        self.post(key, "/v1/payments/authorize", request).await
    }

    pub async fn get_authorize(&self, key: &Secret<String>, unique_id: &str) -> Result<TransactionData, UnzerApiError> {
        let mut url = Url::parse(&self.url("/v1/payments/authorize"))
            .map_err(|e| UnzerApiError::RestRequestError(e.to_string()))?;
        url.query_pairs_mut().append_pair("uniqueId", unique_id);
        self.rest_query::<TransactionData, ()>(key, Method::GET, url.as_str(), None).await
    }

    pub async fn charge(
        &self,
        key: &Secret<String>,
        request: &TransactionRequest,
    ) -> Result<TransactionData, UnzerApiError> {
        debug!("🏦️ Charging {} {}", request.amount, request.currency);
        self.post(key, "/v1/payments/charges", request).await
    }

    /// Charges a previously authorized payment. Without an amount, the full authorized amount is charged.
    pub async fn charge_authorized(
        &self,
        key: &Secret<String>,
        payment_id: &str,
        amount: Option<Amount>,
    ) -> Result<TransactionData, UnzerApiError> {
        debug!("🏦️ Charging a previously authorized payment {payment_id}");
        let path = format!("/v1/payments/{payment_id}/charges");
        self.post(key, &path, &AmountRequest { amount }).await
    }

    pub async fn get_charge(&self, key: &Secret<String>, id: &str) -> Result<TransactionData, UnzerApiError> {
        self.get(key, &format!("/v1/payments/charges/{id}")).await
    }

    /// Cancels (refunds) a charge. Without an amount, the full charge is refunded.
    pub async fn cancel_charge(
        &self,
        key: &Secret<String>,
        payment_id: &str,
        charge_id: &str,
        amount: Option<Amount>,
    ) -> Result<TransactionData, UnzerApiError> {
        debug!("🏦️ Cancelling charge {charge_id} on payment {payment_id}");
        let path = format!("/v1/payments/{payment_id}/charges/{charge_id}/cancels");
        self.post(key, &path, &AmountRequest { amount }).await
    }

    /// Cancels (voids) an authorization.
    pub async fn cancel_authorize(
        &self,
        key: &Secret<String>,
        payment_id: &str,
        authorize_id: &str,
    ) -> Result<TransactionData, UnzerApiError> {
        debug!("🏦️ Cancelling authorization {authorize_id} on payment {payment_id}");
        let path = format!("/v1/payments/{payment_id}/authorize/{authorize_id}/cancels");
        self.post(key, &path, &AmountRequest::default()).await
    }

    /// Fetches a customer by resource id or by the merchant's customer id. A gateway error means the customer does
    /// not exist and yields `None`.
    pub async fn get_customer(
        &self,
        key: &Secret<String>,
        customer_id: &str,
    ) -> Result<Option<CustomerData>, UnzerApiError> {
        match self.get::<CustomerData>(key, &format!("/v1/customers/{customer_id}")).await {
            Ok(customer) => Ok(Some(customer)),
            Err(UnzerApiError::GatewayError(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Creates the customer, or updates it if a customer with the same email already exists. Returns the customer
    /// resource id.
    pub async fn create_or_update_customer(
        &self,
        key: &Secret<String>,
        customer: &CustomerData,
    ) -> Result<String, UnzerApiError> {
        debug!("🏦️ Checking if customer exists");
        let existing = self.get_customer(key, &customer.email).await?.and_then(|c| c.id);
        let result = match existing {
            Some(id) => {
                debug!("🏦️ Updating existing customer {id}");
                let path = format!("/v1/customers/{id}");
                self.rest_query::<ResourceId, CustomerData>(key, Method::PUT, &self.url(&path), Some(customer)).await?;
                id
            },
            None => {
                debug!("🏦️ Creating new customer");
                self.post::<ResourceId, _>(key, "/v1/customers", customer).await?.id
            },
        };
        info!("🏦️ Using customer {result}");
        Ok(result)
    }

    pub async fn create_basket(&self, key: &Secret<String>, basket: &BasketData) -> Result<String, UnzerApiError> {
        debug!("🏦️ Creating basket for order {}", basket.order_id);
        let result = self.post::<ResourceId, _>(key, "/v2/baskets", basket).await?;
        info!("🏦️ Basket {} created", result.id);
        Ok(result.id)
    }

    pub async fn get_basket(&self, key: &Secret<String>, basket_id: &str) -> Result<BasketData, UnzerApiError> {
        self.get(key, &format!("/v2/baskets/{basket_id}")).await
    }

    pub async fn create_metadata(&self, key: &Secret<String>, metadata: &MetadataData) -> Result<String, UnzerApiError> {
        debug!("🏦️ Creating metadata resource");
        let result = self.post::<ResourceId, _>(key, "/v1/metadata", metadata).await?;
        Ok(result.id)
    }

    pub async fn get_metadata(&self, key: &Secret<String>, metadata_id: &str) -> Result<MetadataData, UnzerApiError> {
        self.get(key, &format!("/v1/metadata/{metadata_id}")).await
    }

    pub async fn create_pay_page(
        &self,
        key: &Secret<String>,
        action: PayPageAction,
        request: &PayPageRequest,
    ) -> Result<PayPage, UnzerApiError> {
        debug!("🏦️ Creating {action} pay-page for {} {}", request.amount, request.currency);
        let mut request = request.clone();
        let attributes = PAY_PAGE_ATTRIBUTES.iter().map(|(k, v)| (k.to_string(), v.to_string()));
        request.additional_attributes.extend(attributes);
        let path = format!("/v1/paypage/{action}");
        let page = self.post::<PayPage, _>(key, &path, &request).await?;
        info!("🏦️ Pay-page {} created", page.id);
        Ok(page)
    }

    pub async fn get_payment(&self, key: &Secret<String>, payment_id: &str) -> Result<PaymentData, UnzerApiError> {
        debug!("🏦️ Fetching payment {payment_id}");
        self.get(key, &format!("/v1/payments/{payment_id}")).await
    }

    pub async fn get_all_webhooks(&self, key: &Secret<String>) -> Result<Vec<WebhookEventData>, UnzerApiError> {
        let events = self.get::<WebhookEvents>(key, "/v1/webhooks").await?;
        Ok(events.into_events())
    }

    /// Registers `url` for all webhook events.
    pub async fn create_webhook(
        &self,
        key: &Secret<String>,
        url: &str,
    ) -> Result<Vec<WebhookEventData>, UnzerApiError> {
        #[derive(Serialize)]
        struct NewWebhook<'a> {
            url: &'a str,
            event: &'a str,
        }
        debug!("🏦️ Creating webhook for {url}");
        let events = self.post::<WebhookEvents, _>(key, "/v1/webhooks", &NewWebhook { url, event: "all" }).await?;
        info!("🏦️ Webhook created for {url}");
        Ok(events.into_events())
    }

    pub async fn delete_webhook(&self, key: &Secret<String>, event_id: &str) -> Result<(), UnzerApiError> {
        debug!("🏦️ Deleting webhook {event_id}");
        let url = self.url(&format!("/v1/webhooks/{event_id}"));
        self.rest_query::<Value, ()>(key, Method::DELETE, &url, None).await?;
        info!("🏦️ Webhook {event_id} deleted");
        Ok(())
    }

    pub async fn keypair(&self, key: &Secret<String>) -> Result<Keypair, UnzerApiError> {
        self.get(key, "/v1/keypair").await
    }

    pub async fn available_payment_method_types(
        &self,
        key: &Secret<String>,
    ) -> Result<PaymentMethodTypes, UnzerApiError> {
        self.get(key, "/v1/keypair/types").await
    }
}

fn basic_auth(key: &Secret<String>) -> String {
    format!("Basic {}", base64::encode(format!("{}:", key.reveal())))
}
