use serde_json::json;
use shopify_tools::{SessionKind, SessionResolution};
use unzer_tools::{data_objects::PayPage, PayPageAction};
use upg_common::Amount;

use super::*;
use crate::{
    db_types::{PaymentSessionStatus, SessionStatus, TransactionKind},
    test_utils::mocks::{MockGateway, MockMarketplace},
    upe_api::{
        errors::PaymentFlowError,
        payment_objects::{CheckoutWebhook, RefundSessionRequest},
    },
    CheckoutApi,
    PaymentLogStore,
    SessionStore,
};

fn pay_page() -> PayPage {
    serde_json::from_value(json!({
        "id": "s-ppg-1",
        "redirectUrl": "https://payment.unzer.com/v1/paypage/s-ppg-1",
        "resources": { "paymentId": PID }
    }))
    .unwrap()
}

/// Creates the session and starts it with the gateway, leaving it as the buyer sees the pay-page.
async fn started_sale(db: &SqliteDatabase, id: &str) {
    let api = flow_api(db, MockGateway::new(), MockMarketplace::new());
    api.create_payment_session(SHOP, payment_request(id, "sale")).await.unwrap();
    assert!(db.assign_pid(id, PID, PUBLIC_KEY).await.unwrap());
    db.update_payment_status(id, PaymentSessionStatus::ChargePending).await.unwrap();
}

#[tokio::test]
async fn create_and_fetch_payment_session() {
    let db = configured_db().await;
    let api = flow_api(&db, MockGateway::new(), MockMarketplace::new());
    let created = api.create_payment_session(SHOP, payment_request("P1", "sale")).await.unwrap();
    assert_eq!(created.redirect_url, "https://upg.example/app/processing/P1");

    let session = db.fetch_payment_session("P1").await.unwrap().unwrap();
    assert_eq!(session.status, PaymentSessionStatus::Created);
    assert_eq!(session.checkout_token, "tok-P1");
    assert_eq!(session.amount, Amount::from_units(10));
    assert_eq!(session.shop, SHOP);
    assert!(session.pid.is_none());
    assert!(session.resolution.is_none());

    // A redelivered request changes nothing
    let again = api.create_payment_session(SHOP, payment_request("P1", "sale")).await.unwrap();
    assert_eq!(again, created);
    let (count, _) = db.list_payment_sessions(SHOP, 1, 10).await.unwrap();
    assert_eq!(count, 1);
    let logs = db.fetch_logs("P1").await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].message, "Payment Session created");
}

#[tokio::test]
async fn malformed_cancel_url_stores_nothing() {
    let db = configured_db().await;
    let api = flow_api(&db, MockGateway::new(), MockMarketplace::new());
    let mut request = payment_request("P1", "sale");
    request.cancel_url = format!("https://{SHOP}/cart");
    let err = api.create_payment_session(SHOP, request).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::MissingCheckoutToken(_)));
    assert!(db.fetch_payment_session("P1").await.unwrap().is_none());
    assert!(db.fetch_logs("P1").await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_payment_session_cannot_be_resumed() {
    let db = configured_db().await;
    let api = flow_api(&db, MockGateway::new(), MockMarketplace::new());
    let err = api.resume_payment("nope").await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::PaymentSessionNotFound(id) if id == "nope"));
}

#[tokio::test]
async fn sale_is_sent_to_the_pay_page_and_resolved_on_return() {
    let db = configured_db().await;
    let checkout: CheckoutWebhook = serde_json::from_value(json!({
        "cart_token": "tok-P1",
        "line_items": [{ "key": "k1", "quantity": 1, "variant_price": "10.00", "title": "Mug" }],
        "total_price": "10.00",
        "currency": "EUR"
    }))
    .unwrap();
    assert!(CheckoutApi::new(db.clone()).record_checkout(SHOP, checkout).await.unwrap());

    let mut gateway = MockGateway::new();
    gateway
        .expect_create_customer()
        .withf(|_, customer| customer.email == "buyer@example.com" && customer.lastname == "Mustermann")
        .times(1)
        .returning(|_, _| Ok("s-cst-1".to_string()));
    gateway
        .expect_create_basket()
        .withf(|_, basket| basket.order_id == "P1" && basket.basket_items.len() == 1)
        .times(1)
        .returning(|_, _| Ok("s-bsk-1".to_string()));
    gateway.expect_create_metadata().times(1).returning(|_, _| Ok("s-mtd-1".to_string()));
    gateway
        .expect_create_pay_page()
        .withf(|_, action, request| {
            *action == PayPageAction::Charge &&
                request.return_url == "https://upg.example/app/processing/P1" &&
                request.resources.basket_id.as_deref() == Some("s-bsk-1") &&
                request.amount == Amount::from_units(10)
        })
        .times(1)
        .returning(|_, _, _| Ok(pay_page()));
    let api = flow_api(&db, gateway, MockMarketplace::new());
    api.create_payment_session(SHOP, payment_request("P1", "sale")).await.unwrap();
    let redirect = api.resume_payment("P1").await.unwrap();
    assert_eq!(redirect, "https://payment.unzer.com/v1/paypage/s-ppg-1?locale=en-GB");
    let session = db.fetch_payment_session("P1").await.unwrap().unwrap();
    assert_eq!(session.pid.as_deref(), Some(PID));
    assert_eq!(session.public_key.as_deref(), Some(PUBLIC_KEY));
    assert_eq!(session.status, PaymentSessionStatus::ChargePending);

    // The buyer comes back after paying
    let mut gateway = MockGateway::new();
    let payment = gateway_payment("completed", "10.00", "0", json!([{ "type": "charge", "status": "success" }]));
    gateway.expect_get_payment().withf(|_, pid| pid == PID).times(1).returning(move |_, _| Ok(payment.clone()));
    let mut marketplace = MockMarketplace::new();
    marketplace
        .expect_resolve_session()
        .withf(|creds, kind, gid| {
            creds.shop == SHOP && *kind == SessionKind::Payment && gid == "gid://shopify/PaymentSession/P1"
        })
        .times(1)
        .returning(|_, _, _| {
            Ok(SessionResolution {
                session_id: Some("gid://shopify/PaymentSession/P1".into()),
                redirect_url: Some("https://shop.example/thank-you".into()),
            })
        });
    let api = flow_api(&db, gateway, marketplace);
    let redirect = api.resume_payment("P1").await.unwrap();
    assert_eq!(redirect, "https://shop.example/thank-you");

    // Reloading the processing page neither calls the gateway nor resolves twice
    let api = flow_api(&db, MockGateway::new(), MockMarketplace::new());
    let redirect = api.resume_payment("P1").await.unwrap();
    assert_eq!(redirect, "https://shop.example/thank-you");
    let session = db.fetch_payment_session("P1").await.unwrap().unwrap();
    assert_eq!(session.resolution, Some(SessionStatus::Resolve));
}

#[tokio::test]
async fn buyer_who_never_paid_goes_back_to_the_checkout() {
    let db = configured_db().await;
    started_sale(&db, "P1").await;
    let mut gateway = MockGateway::new();
    let payment = gateway_payment("create", "10.00", "0", json!([]));
    gateway.expect_get_payment().times(1).returning(move |_, _| Ok(payment.clone()));
    let mut marketplace = MockMarketplace::new();
    marketplace.expect_reject_session().never();
    marketplace.expect_resolve_session().never();
    let api = flow_api(&db, gateway, marketplace);
    let redirect = api.resume_payment("P1").await.unwrap();
    assert_eq!(redirect, format!("https://{SHOP}/checkouts/cn/tok-P1/processing"));
    let session = db.fetch_payment_session("P1").await.unwrap().unwrap();
    assert_eq!(session.status, PaymentSessionStatus::Canceled);
    assert!(session.resolution.is_none());
}

#[tokio::test]
async fn failed_payment_is_rejected() {
    let db = configured_db().await;
    started_sale(&db, "P1").await;
    let mut gateway = MockGateway::new();
    let payment = gateway_payment("canceled", "10.00", "0", json!([{ "type": "charge", "status": "error" }]));
    gateway.expect_get_payment().times(1).returning(move |_, _| Ok(payment.clone()));
    let mut marketplace = MockMarketplace::new();
    marketplace
        .expect_reject_session()
        .withf(|_, kind, _, reason| *kind == SessionKind::Payment && reason.code == "PROCESSING_ERROR")
        .times(1)
        .returning(|_, _, _, _| Ok(SessionResolution::default()));
    let api = flow_api(&db, gateway, marketplace);
    let cancel_url = format!("https://{SHOP}/checkouts/cn/tok-P1/processing");
    assert_eq!(api.resume_payment("P1").await.unwrap(), cancel_url);
    let session = db.fetch_payment_session("P1").await.unwrap().unwrap();
    assert_eq!(session.resolution, Some(SessionStatus::Reject));

    // A rejected session stays rejected
    let api = flow_api(&db, MockGateway::new(), MockMarketplace::new());
    assert_eq!(api.resume_payment("P1").await.unwrap(), cancel_url);
}

#[tokio::test]
async fn sale_is_refunded_in_full() {
    let db = configured_db().await;
    started_sale(&db, "P1").await;

    // Gateway reports the charge, then the completed payment
    let mut gateway = MockGateway::new();
    gateway
        .expect_fetch_transaction()
        .withf(|_, url| url.ends_with("/charges/s-chg-1"))
        .times(1)
        .returning(|_, _| Ok(transaction("s-chg-1", "10.00")));
    let hooks = webhook_api(&db, gateway, MockMarketplace::new());
    hooks.handle(&notification("charge.succeeded", Some("charges/s-chg-1"))).await.unwrap();
    hooks.handle(&notification("payment.completed", None)).await.unwrap();
    let session = db.fetch_payment_session("P1").await.unwrap().unwrap();
    assert_eq!(session.status, PaymentSessionStatus::Paid);
    let transactions = db.fetch_transactions("P1").await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].kind, TransactionKind::Charge);

    // The merchant refunds everything
    let request: RefundSessionRequest = serde_json::from_value(json!({
        "id": "R1",
        "gid": "gid://shopify/RefundSession/R1",
        "amount": "10.00",
        "currency": "EUR",
        "payment_id": "P1",
        "proposed_at": "2024-07-02T10:00:00Z"
    }))
    .unwrap();
    let mut gateway = MockGateway::new();
    gateway
        .expect_cancel_charge()
        .withf(|_, pid, charge_id, amount| {
            pid == PID && charge_id == "s-chg-1" && *amount == Some(Amount::from_units(10))
        })
        .times(1)
        .returning(|_, _, _, _| Ok(transaction("s-cnl-1", "10.00")));
    let mut marketplace = MockMarketplace::new();
    marketplace.expect_resolve_session().never();
    let api = flow_api(&db, gateway, marketplace);
    let refund = api.refund(request.clone()).await.unwrap();
    assert!(refund.status.is_none());
    let cancels = db.fetch_cancels("P1").await.unwrap();
    assert_eq!(cancels.len(), 1);
    assert_eq!(cancels[0].cancel_id.as_deref(), Some("s-cnl-1"));
    assert_eq!(cancels[0].refund_id.as_deref(), Some("R1"));

    // A redelivered refund request does not cancel twice
    let api = flow_api(&db, MockGateway::new(), MockMarketplace::new());
    api.refund(request).await.unwrap();
    assert_eq!(db.fetch_cancels("P1").await.unwrap().len(), 1);

    // The gateway confirms the cancel, then the canceled payment
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_transaction().times(1).returning(|_, _| Ok(transaction("s-cnl-1", "10.00")));
    let payment = gateway_payment("canceled", "10.00", "10.00", json!([]));
    gateway.expect_get_payment().times(2).returning(move |_, _| Ok(payment.clone()));
    let mut marketplace = MockMarketplace::new();
    marketplace
        .expect_resolve_session()
        .withf(|_, kind, gid| *kind == SessionKind::Refund && gid == "gid://shopify/RefundSession/R1")
        .times(1)
        .returning(|_, _, _| Ok(SessionResolution::default()));
    let hooks = webhook_api(&db, gateway, marketplace);
    hooks.handle(&notification("charge.canceled", Some("charges/s-chg-1/cancels/s-cnl-1"))).await.unwrap();
    let refund = db.fetch_refund_session("R1").await.unwrap().unwrap();
    assert_eq!(refund.status, Some(SessionStatus::Resolve));
    let session = db.fetch_payment_session("P1").await.unwrap().unwrap();
    assert_eq!(session.status, PaymentSessionStatus::Paid);

    hooks.handle(&notification("payment.canceled", None)).await.unwrap();
    let session = db.fetch_payment_session("P1").await.unwrap().unwrap();
    assert_eq!(session.status, PaymentSessionStatus::Refunded);
    let cancels = db.fetch_cancels("P1").await.unwrap();
    assert_eq!(cancels[0].status, crate::db_types::CancelStatus::Resolved);
    assert_eq!(cancels[0].transaction.as_ref().map(|t| t.id.as_str()), Some("s-cnl-1"));
    let logs = db.fetch_logs("P1").await.unwrap();
    assert!(logs.iter().any(|l| l.message == "No Void found on payment session"));
}

#[tokio::test]
async fn refund_without_a_charge_fails() {
    let db = configured_db().await;
    started_sale(&db, "P1").await;
    let request: RefundSessionRequest = serde_json::from_value(json!({
        "id": "R1",
        "gid": "gid://shopify/RefundSession/R1",
        "amount": "10.00",
        "currency": "EUR",
        "payment_id": "P1",
        "proposed_at": "2024-07-02T10:00:00Z"
    }))
    .unwrap();
    let api = flow_api(&db, MockGateway::new(), MockMarketplace::new());
    let err = api.refund(request).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::NothingToCancel(_, "charge")));
    assert!(db.fetch_cancels("P1").await.unwrap().is_empty());
    let logs = db.fetch_logs("P1").await.unwrap();
    assert!(logs.iter().any(|l| l.message.contains("no charge transaction")));
}
