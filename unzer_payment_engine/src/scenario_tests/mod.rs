//! End-to-end behaviour of the payment flows against a real SQLite store, with the gateway and marketplace mocked.
mod configuration;
mod sale_flow;
mod webhooks;

use serde_json::{json, Value};
use unzer_tools::data_objects::{PaymentData, TransactionData};
use upg_common::Secret;

use crate::{
    db_types::ConfigurationUpdate,
    test_utils::{
        mocks::{MockGateway, MockMarketplace},
        prepare_env::test_database,
    },
    upe_api::payment_objects::{FlowSettings, GatewayNotification, PaymentSessionRequest},
    ConfigurationStore,
    PaymentFlowApi,
    SqliteDatabase,
    WebhookApi,
};

pub const SHOP: &str = "test-shop.myshopify.com";
pub const PID: &str = "s-pay-1";
pub const PUBLIC_KEY: &str = "s-pub-1";

pub fn settings() -> FlowSettings {
    FlowSettings::new("https://upg.example/", vec![], "2024-07")
}

/// A fresh database with a fully configured shop.
pub async fn configured_db() -> SqliteDatabase {
    let db = test_database().await;
    let update = ConfigurationUpdate {
        shop: SHOP.to_string(),
        unzer_private_key: Some(Secret::new("s-priv-1".to_string())),
        unzer_public_key: Some(PUBLIC_KEY.to_string()),
        access_token: Some(Secret::new("shpat_1".to_string())),
        ..Default::default()
    };
    db.upsert_configuration(update).await.expect("Failed to configure the shop");
    db
}

pub fn payment_request(id: &str, kind: &str) -> PaymentSessionRequest {
    serde_json::from_value(json!({
        "id": id,
        "gid": format!("gid://shopify/PaymentSession/{id}"),
        "group": format!("group-{id}"),
        "amount": "10.00",
        "currency": "EUR",
        "test": true,
        "kind": kind,
        "customer": {
            "email": "buyer@example.com",
            "locale": "de-DE",
            "billing_address": {
                "given_name": "Erika",
                "family_name": "Mustermann",
                "line1": "Hauptstr. 1",
                "city": "Berlin",
                "postal_code": "10115",
                "country_code": "DE"
            }
        },
        "payment_method": { "type": "offsite" },
        "proposed_at": "2024-07-01T10:00:00Z",
        "cancel_url": format!("https://{SHOP}/checkouts/cn/tok-{id}/processing")
    }))
    .expect("Invalid payment session request")
}

pub fn gateway_payment(state: &str, total: &str, canceled: &str, transactions: Value) -> PaymentData {
    serde_json::from_value(json!({
        "id": PID,
        "state": { "id": 1, "name": state },
        "amount": { "total": total, "charged": total, "canceled": canceled, "remaining": "0" },
        "currency": "EUR",
        "resources": { "paymentId": PID },
        "transactions": transactions,
    }))
    .expect("Invalid gateway payment")
}

pub fn transaction(id: &str, amount: &str) -> TransactionData {
    serde_json::from_value(json!({
        "id": id,
        "isSuccess": true,
        "amount": amount,
        "currency": "EUR",
        "resources": { "paymentId": PID },
        "processing": { "uniqueId": format!("u-{id}"), "shortId": format!("short-{id}") }
    }))
    .expect("Invalid transaction")
}

pub fn notification(event: &str, retrieve_path: Option<&str>) -> GatewayNotification {
    let mut payload = json!({ "event": event, "publicKey": PUBLIC_KEY, "paymentId": PID });
    if let Some(path) = retrieve_path {
        payload["retrieveUrl"] = json!(format!("https://api.unzer.com/v1/payments/{PID}/{path}"));
    }
    GatewayNotification::parse(payload).expect("Invalid notification")
}

pub fn flow_api(
    db: &SqliteDatabase,
    gateway: MockGateway,
    marketplace: MockMarketplace,
) -> PaymentFlowApi<SqliteDatabase, MockGateway, MockMarketplace> {
    PaymentFlowApi::new(db.clone(), gateway, marketplace, settings())
}

pub fn webhook_api(
    db: &SqliteDatabase,
    gateway: MockGateway,
    marketplace: MockMarketplace,
) -> WebhookApi<SqliteDatabase, MockGateway, MockMarketplace> {
    WebhookApi::new(db.clone(), gateway, marketplace)
}
