use serde_json::json;
use shopify_tools::SessionResolution;
use upg_common::Amount;

use super::*;
use crate::{
    db_types::{CancelStatus, CancelTarget, NewUnzerCancel, PaymentSessionStatus, SessionStatus},
    test_utils::mocks::{MockGateway, MockMarketplace},
    traits::{GatewayError, MarketplaceError},
    upe_api::{errors::WebhookError, payment_objects::RefundSessionRequest},
    PaymentLogStore,
    SessionStore,
};

async fn paid_sale(db: &SqliteDatabase) {
    let api = flow_api(db, MockGateway::new(), MockMarketplace::new());
    api.create_payment_session(SHOP, payment_request("P1", "sale")).await.unwrap();
    db.assign_pid("P1", PID, PUBLIC_KEY).await.unwrap();
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_transaction().returning(|_, _| Ok(transaction("s-chg-1", "10.00")));
    let hooks = webhook_api(db, gateway, MockMarketplace::new());
    hooks.handle(&notification("charge.succeeded", Some("charges/s-chg-1"))).await.unwrap();
    hooks.handle(&notification("payment.completed", None)).await.unwrap();
}

/// A refund session whose gateway cancel has been requested.
async fn requested_refund(db: &SqliteDatabase) {
    let request: RefundSessionRequest = serde_json::from_value(json!({
        "id": "R1",
        "gid": "gid://shopify/RefundSession/R1",
        "amount": "4.00",
        "currency": "EUR",
        "payment_id": "P1",
        "proposed_at": "2024-07-02T10:00:00Z"
    }))
    .unwrap();
    let mut gateway = MockGateway::new();
    gateway.expect_cancel_charge().times(1).returning(|_, _, _, _| Ok(transaction("s-cnl-1", "4.00")));
    flow_api(db, gateway, MockMarketplace::new()).refund(request).await.unwrap();
}

#[tokio::test]
async fn unknown_payments_are_acknowledged() {
    let db = configured_db().await;
    let hooks = webhook_api(&db, MockGateway::new(), MockMarketplace::new());
    hooks.handle(&notification("charge.succeeded", Some("charges/s-chg-1"))).await.unwrap();
    let types = GatewayNotification::parse(json!({ "event": "types" })).unwrap();
    hooks.handle(&types).await.unwrap();
}

#[tokio::test]
async fn unconfigured_shops_are_logged() {
    let db = test_database().await;
    let api = flow_api(&db, MockGateway::new(), MockMarketplace::new());
    api.create_payment_session(SHOP, payment_request("P1", "sale")).await.unwrap();
    db.assign_pid("P1", PID, PUBLIC_KEY).await.unwrap();
    let hooks = webhook_api(&db, MockGateway::new(), MockMarketplace::new());
    hooks.handle(&notification("payment.completed", None)).await.unwrap();
    let session = db.fetch_payment_session("P1").await.unwrap().unwrap();
    assert_eq!(session.status, PaymentSessionStatus::Created);
    let logs = db.fetch_logs("P1").await.unwrap();
    assert!(logs.iter().any(|l| l.message == "Configuration for the store was not found"));
}

#[tokio::test]
async fn missing_retrieve_url_is_malformed() {
    let db = configured_db().await;
    paid_sale(&db).await;
    let hooks = webhook_api(&db, MockGateway::new(), MockMarketplace::new());
    let err = hooks.handle(&notification("authorize.succeeded", None)).await.unwrap_err();
    assert!(matches!(err, WebhookError::MalformedNotification(_)));
}

#[tokio::test]
async fn gateway_failures_are_returned_for_redelivery() {
    let db = configured_db().await;
    paid_sale(&db).await;
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_transaction().returning(|_, _| Err(GatewayError::RequestFailed("timeout".into())));
    let hooks = webhook_api(&db, gateway, MockMarketplace::new());
    let err = hooks.handle(&notification("charge.succeeded", Some("charges/s-chg-2"))).await.unwrap_err();
    assert!(matches!(err, WebhookError::GatewayError(GatewayError::RequestFailed(_))));
}

#[tokio::test]
async fn uncorrelated_cancels_do_not_touch_the_marketplace() {
    let db = configured_db().await;
    paid_sale(&db).await;
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_transaction().times(1).returning(|_, _| Ok(transaction("s-cnl-9", "4.00")));
    let payment = gateway_payment("completed", "10.00", "4.00", json!([]));
    gateway.expect_get_payment().times(1).returning(move |_, _| Ok(payment.clone()));
    let mut marketplace = MockMarketplace::new();
    marketplace.expect_resolve_session().never();
    let hooks = webhook_api(&db, gateway, marketplace);
    hooks.handle(&notification("charge.canceled", Some("charges/s-chg-1/cancels/s-cnl-9"))).await.unwrap();

    let logs = db.fetch_logs("P1").await.unwrap();
    assert!(logs.iter().any(|l| l.message == "Unzer Cancel not found!"));
    // The status is still derived from the gateway totals
    let session = db.fetch_payment_session("P1").await.unwrap().unwrap();
    assert_eq!(session.status, PaymentSessionStatus::PartiallyRefunded);
}

#[tokio::test]
async fn partial_refund() {
    let db = configured_db().await;
    paid_sale(&db).await;
    requested_refund(&db).await;
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_transaction().times(1).returning(|_, _| Ok(transaction("s-cnl-1", "4.00")));
    let payment = gateway_payment("completed", "10.00", "4.00", json!([]));
    gateway.expect_get_payment().times(1).returning(move |_, _| Ok(payment.clone()));
    let mut marketplace = MockMarketplace::new();
    marketplace.expect_resolve_session().times(1).returning(|_, _, _| Ok(SessionResolution::default()));
    let hooks = webhook_api(&db, gateway, marketplace);
    hooks.handle(&notification("charge.canceled", Some("charges/s-chg-1/cancels/s-cnl-1"))).await.unwrap();

    let refund = db.fetch_refund_session("R1").await.unwrap().unwrap();
    assert_eq!(refund.status, Some(SessionStatus::Resolve));
    assert_eq!(refund.amount, Amount::from_units(4));
    let session = db.fetch_payment_session("P1").await.unwrap().unwrap();
    assert_eq!(session.status, PaymentSessionStatus::PartiallyRefunded);
}

#[tokio::test]
async fn marketplace_failures_leave_the_refund_open() {
    let db = configured_db().await;
    paid_sale(&db).await;
    requested_refund(&db).await;
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_transaction().returning(|_, _| Ok(transaction("s-cnl-1", "4.00")));
    let payment = gateway_payment("completed", "10.00", "4.00", json!([]));
    gateway.expect_get_payment().returning(move |_, _| Ok(payment.clone()));
    let mut marketplace = MockMarketplace::new();
    marketplace.expect_resolve_session().times(1).returning(|_, _, _| Err(MarketplaceError::RequestFailed("503".into())));
    let hooks = webhook_api(&db, gateway, marketplace);
    hooks.handle(&notification("charge.canceled", Some("charges/s-chg-1/cancels/s-cnl-1"))).await.unwrap();

    let refund = db.fetch_refund_session("R1").await.unwrap().unwrap();
    assert!(refund.status.is_none());
    let cancels = db.fetch_cancels("P1").await.unwrap();
    assert_eq!(cancels[0].status, CancelStatus::Pending);
    let logs = db.fetch_logs("P1").await.unwrap();
    assert!(logs.iter().any(|l| l.message == "Could not resolve the refund session"));

    // Redelivery succeeds
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_transaction().returning(|_, _| Ok(transaction("s-cnl-1", "4.00")));
    let payment = gateway_payment("completed", "10.00", "4.00", json!([]));
    gateway.expect_get_payment().returning(move |_, _| Ok(payment.clone()));
    let mut marketplace = MockMarketplace::new();
    marketplace.expect_resolve_session().times(1).returning(|_, _, _| Ok(SessionResolution::default()));
    let hooks = webhook_api(&db, gateway, marketplace);
    hooks.handle(&notification("charge.canceled", Some("charges/s-chg-1/cancels/s-cnl-1"))).await.unwrap();
    let cancels = db.fetch_cancels("P1").await.unwrap();
    assert_eq!(cancels[0].status, CancelStatus::Resolved);
}

#[tokio::test]
async fn cancels_are_keyed_on_their_session() {
    let db = configured_db().await;
    paid_sale(&db).await;
    requested_refund(&db).await;
    let duplicate = NewUnzerCancel {
        payment_id: "P1".into(),
        pid: PID.into(),
        target: CancelTarget::Refund { refund_id: "R1".into(), charge_id: "s-chg-1".into() },
    };
    let result = db.insert_cancel(duplicate).await.unwrap();
    assert!(!result.is_inserted());
    assert_eq!(result.inner().cancel_id.as_deref(), Some("s-cnl-1"));
    assert!(db.fetch_cancel(PID, "s-cnl-1").await.unwrap().is_some());
    assert!(db.fetch_cancel("s-pay-other", "s-cnl-1").await.unwrap().is_none());
}
