use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use unzer_payment_engine::{test_utils::prepare_env::test_database, CheckoutStore, ConfigurationStore};

use super::helpers::*;
use crate::helpers::{calculate_hmac, WEBHOOK_HMAC_HEADER, WEBHOOK_SHOP_HEADER, WEBHOOK_TOPIC_HEADER};

fn signed_webhook(topic: &str, body: &serde_json::Value) -> TestRequest {
    let body = body.to_string();
    let hmac = calculate_hmac(HMAC_SECRET, body.as_bytes());
    TestRequest::post()
        .uri("/shopify/webhooks")
        .insert_header(("Content-Type", "application/json"))
        .insert_header((WEBHOOK_TOPIC_HEADER, topic))
        .insert_header((WEBHOOK_SHOP_HEADER, SHOP))
        .insert_header((WEBHOOK_HMAC_HEADER, hmac))
        .set_payload(body)
}

fn checkout() -> serde_json::Value {
    json!({
        "token": "chk-1",
        "cart_token": "tok-P1",
        "currency": "EUR",
        "total_price": "10.00",
        "line_items": [{
            "key": "line-1",
            "quantity": 2,
            "variant_price": "5.00",
            "title": "Socks",
            "tax_lines": [{ "rate": 0.19 }]
        }]
    })
}

//------------------------------------------   Gateway notifications  ---------------------------------------------

#[actix_web::test]
async fn unknown_gateway_events_are_not_found() {
    let db = test_database().await;
    let req = TestRequest::post().uri("/app/notifications").set_json(json!({ "event": "dinner.served" }));
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn notifications_without_a_payment_are_acknowledged() {
    let db = test_database().await;
    let req = TestRequest::post().uri("/app/notifications").set_json(json!({ "event": "types" }));
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body["success"], json!(true));
}

#[actix_web::test]
async fn notifications_for_unknown_payments_are_acknowledged() {
    let db = configured_db().await;
    let req = TestRequest::post().uri("/app/notifications").set_json(json!({
        "event": "charge.succeeded",
        "paymentId": "s-pay-404",
        "publicKey": "s-pub-1",
        "retrieveUrl": "https://api.unzer.com/v1/payments/s-pay-404/charges/s-chg-1"
    }));
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::OK);
}

//------------------------------------------   Marketplace webhooks  ---------------------------------------------

#[actix_web::test]
async fn unsigned_webhooks_are_refused() {
    let db = test_database().await;
    let req = TestRequest::post()
        .uri("/shopify/webhooks")
        .insert_header((WEBHOOK_TOPIC_HEADER, "checkouts/create"))
        .insert_header((WEBHOOK_SHOP_HEADER, SHOP))
        .set_json(checkout());
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(db.fetch_checkout("tok-P1").await.unwrap().is_none());
}

#[actix_web::test]
async fn tampered_webhooks_are_refused() {
    let db = test_database().await;
    let hmac = calculate_hmac(HMAC_SECRET, checkout().to_string().as_bytes());
    let mut tampered = checkout();
    tampered["total_price"] = json!("0.01");
    let req = TestRequest::post()
        .uri("/shopify/webhooks")
        .insert_header((WEBHOOK_TOPIC_HEADER, "checkouts/update"))
        .insert_header((WEBHOOK_SHOP_HEADER, SHOP))
        .insert_header((WEBHOOK_HMAC_HEADER, hmac))
        .set_payload(tampered.to_string());
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body, "Invalid HMAC signature.");
}

#[actix_web::test]
async fn checkouts_are_recorded() {
    let db = test_database().await;
    let res = TestServer::new(&db).send(signed_webhook("checkouts/create", &checkout())).await;
    assert_eq!(res.status, StatusCode::OK);
    let stored = db.fetch_checkout("tok-P1").await.unwrap().unwrap();
    assert_eq!(stored.shop, SHOP);
    assert_eq!(stored.lines.len(), 1);
    assert_eq!(stored.lines[0].quantity, 2);

    let mut updated = checkout();
    updated["line_items"][0]["quantity"] = json!(3);
    let res = TestServer::new(&db).send(signed_webhook("checkouts/update", &updated)).await;
    assert_eq!(res.status, StatusCode::OK);
    let stored = db.fetch_checkout("tok-P1").await.unwrap().unwrap();
    assert_eq!(stored.lines[0].quantity, 3);
}

#[actix_web::test]
async fn uninstall_forgets_the_access_token() {
    let db = configured_db().await;
    let res = TestServer::new(&db).send(signed_webhook("app/uninstalled", &json!({ "id": 1 }))).await;
    assert_eq!(res.status, StatusCode::OK);
    let config = db.fetch_configuration(SHOP).await.unwrap().unwrap();
    assert!(config.access_token.is_none());
    assert!(!config.ready);
}

#[actix_web::test]
async fn compliance_webhooks_are_acknowledged() {
    let db = test_database().await;
    for topic in ["customers/data_request", "customers/redact", "shop/redact"] {
        let res = TestServer::new(&db).send(signed_webhook(topic, &json!({ "shop_domain": SHOP }))).await;
        assert_eq!(res.status, StatusCode::OK, "{topic}");
    }
    let res = TestServer::new(&db).send(signed_webhook("orders/create", &json!({ "id": 1 }))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
