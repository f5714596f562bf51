use std::sync::Arc;

use chrono::{DateTime, Utc};
use graphql_parser::parse_query;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use upg_common::Secret;

use crate::{
    config::ShopifyConfig,
    data_objects::PaymentsAppConfiguration,
    mutations,
    PendReason,
    RejectReason,
    SessionKind,
    SessionResolution,
    ShopifyApiError,
    UserError,
};

/// Client for the payments apps API. One instance serves every shop; the shop domain and its access token are
/// passed with each call.
#[derive(Clone)]
pub struct PaymentsAppsApi {
    config: ShopifyConfig,
    client: Arc<Client>,
}

impl PaymentsAppsApi {
    pub fn new(config: ShopifyConfig) -> Result<Self, ShopifyApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ShopifyApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, shop: &str) -> String {
        let origin = match &self.config.base_url_override {
            Some(url) => url.clone(),
            None => format!("https://{shop}"),
        };
        format!("{origin}/payments_apps/api/{}/graphql.json", self.config.api_version)
    }

    pub async fn graphql_query<T: DeserializeOwned>(
        &self,
        shop: &str,
        access_token: &Secret<String>,
        query: &str,
        variables: Option<Value>,
    ) -> Result<T, ShopifyApiError> {
        validate_shop_domain(shop)?;
        let query = parse_query::<String>(query).map_err(|e| ShopifyApiError::InvalidGraphQL(e.to_string()))?;
        let mut body = json!({ "query": query.to_string() });
        if let Some(vars) = variables {
            body["variables"] = vars;
        }
        let token = HeaderValue::from_str(access_token.reveal())
            .map_err(|e| ShopifyApiError::RestRequestError(format!("Invalid access token. {e}")))?;
        debug!("🛍️ Making request for shop: \"{shop}\", api: \"{}\"", self.config.api_version);
        let response = self
            .client
            .post(self.url(shop))
            .header("X-Shopify-Access-Token", token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ShopifyApiError::RestResponseError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ShopifyApiError::RestResponseError(e.to_string()))?;
            return Err(ShopifyApiError::QueryError { status, message });
        }
        let result = response.json::<Value>().await.map_err(|e| ShopifyApiError::JsonError(e.to_string()))?;
        if let Some(errors) = result["errors"].as_array() {
            let e = errors.iter().map(|e| e.to_string()).collect::<Vec<String>>().join(", ");
            return Err(ShopifyApiError::GraphQLError(e));
        }
        let data = result["data"].clone();
        trace!("🛍️ GraphQL response: {data}");
        if data.is_null() {
            return Err(ShopifyApiError::EmptyResponse);
        }
        serde_json::from_value(data).map_err(|e| ShopifyApiError::JsonError(e.to_string()))
    }

    /// Runs a session mutation and returns its payload, failing if the payload carries any `userErrors`.
    async fn session_mutation(
        &self,
        shop: &str,
        access_token: &Secret<String>,
        (name, document): (&str, &str),
        variables: Value,
    ) -> Result<Value, ShopifyApiError> {
        let mut data = self.graphql_query::<Value>(shop, access_token, document, Some(variables)).await?;
        let payload = data.get_mut(name).map(Value::take).unwrap_or(Value::Null);
        if payload.is_null() {
            return Err(ShopifyApiError::EmptyResponse);
        }
        check_user_errors(&payload)?;
        Ok(payload)
    }

    pub async fn resolve_session(
        &self,
        shop: &str,
        access_token: &Secret<String>,
        kind: SessionKind,
        gid: &str,
    ) -> Result<SessionResolution, ShopifyApiError> {
        info!("🛍️ Resolving {kind} session {gid}");
        let payload = self.session_mutation(shop, access_token, kind.resolve_mutation(), json!({ "id": gid })).await?;
        Ok(session_resolution(kind, &payload))
    }

    pub async fn reject_session(
        &self,
        shop: &str,
        access_token: &Secret<String>,
        kind: SessionKind,
        gid: &str,
        reason: &RejectReason,
    ) -> Result<SessionResolution, ShopifyApiError> {
        info!("🛍️ Rejecting {kind} session {gid}");
        let variables = json!({ "id": gid, "reason": reason });
        let payload = self.session_mutation(shop, access_token, kind.reject_mutation(), variables).await?;
        Ok(session_resolution(kind, &payload))
    }

    /// Marks a payment session as pending until `expires_at`. Only payment sessions can be pended.
    pub async fn pend_payment_session(
        &self,
        shop: &str,
        access_token: &Secret<String>,
        gid: &str,
        reason: PendReason,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionResolution, ShopifyApiError> {
        info!("🛍️ Pending payment session {gid} ({reason})");
        let variables = json!({
            "id": gid,
            "pendingExpiresAt": expires_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "reason": reason,
        });
        let mutation = ("paymentSessionPending", mutations::PAYMENT_SESSION_PENDING);
        let payload = self.session_mutation(shop, access_token, mutation, variables).await?;
        Ok(session_resolution(SessionKind::Payment, &payload))
    }

    /// Tells the marketplace whether the app is ready to process payments for the shop.
    pub async fn configure(
        &self,
        shop: &str,
        access_token: &Secret<String>,
        external_handle: Option<&str>,
        ready: bool,
    ) -> Result<PaymentsAppConfiguration, ShopifyApiError> {
        info!("🛍️ Configuring payments app for {shop}. Ready: {ready}");
        let variables = json!({ "externalHandle": external_handle, "ready": ready });
        let mutation = ("paymentsAppConfigure", mutations::PAYMENTS_APP_CONFIGURE);
        let mut payload = self.session_mutation(shop, access_token, mutation, variables).await?;
        let configuration = payload.get_mut("paymentsAppConfiguration").map(Value::take).unwrap_or(Value::Null);
        serde_json::from_value(configuration)
            .map_err(|e| ShopifyApiError::JsonError(e.to_string()))
    }
}

fn check_user_errors(payload: &Value) -> Result<(), ShopifyApiError> {
    let errors = match payload.get("userErrors") {
        Some(errors) if !errors.is_null() => serde_json::from_value::<Vec<UserError>>(errors.clone())
            .map_err(|e| ShopifyApiError::JsonError(e.to_string()))?,
        _ => vec![],
    };
    if errors.is_empty() {
        Ok(())
    } else {
        warn!("🛍️ Mutation returned user errors: {errors:?}");
        Err(ShopifyApiError::UserErrors(errors))
    }
}

fn session_resolution(kind: SessionKind, payload: &Value) -> SessionResolution {
    let session = &payload[format!("{kind}Session")];
    let session_id = session["id"].as_str().map(String::from);
    let redirect_url = session.pointer("/nextAction/context/redirectUrl").and_then(Value::as_str).map(String::from);
    SessionResolution { session_id, redirect_url }
}

/// Shop domains are used to build the request URL, so only hostname characters are accepted.
fn validate_shop_domain(shop: &str) -> Result<(), ShopifyApiError> {
    let valid = !shop.is_empty() &&
        shop.contains('.') &&
        shop.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ShopifyApiError::InvalidOperation(format!("Invalid shop domain: {shop}")))
    }
}
