use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use unzer_payment_engine::{
    db_types::PaymentSessionStatus,
    test_utils::{
        mocks::{MockGateway, MockMarketplace},
        prepare_env::test_database,
    },
    SessionStore,
};
use unzer_tools::{data_objects::PayPage, PayPageAction};

use super::helpers::*;
use crate::helpers::SHOP_DOMAIN_HEADER;

fn create_session(id: &str, cancel_url: &str) -> TestRequest {
    TestRequest::post()
        .uri("/payment_session")
        .insert_header((SHOP_DOMAIN_HEADER, SHOP))
        .set_json(payment_session_body(id, cancel_url))
}

#[actix_web::test]
async fn health() {
    let db = test_database().await;
    let res = TestServer::new(&db).send(TestRequest::get().uri("/health")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "👍️\n");
}

#[actix_web::test]
async fn payment_session_is_created() {
    let db = configured_db().await;
    let res = TestServer::new(&db).send(create_session("P1", &cancel_url("P1"))).await;
    assert_eq!(res.status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body, json!({ "redirect_url": "https://upg.example/app/processing/P1" }));
    let session = db.fetch_payment_session("P1").await.unwrap().unwrap();
    assert_eq!(session.shop, SHOP);
    assert_eq!(session.status, PaymentSessionStatus::Created);
    assert_eq!(session.checkout_token, "tok-P1");
}

#[actix_web::test]
async fn payment_session_needs_the_shop_header() {
    let db = configured_db().await;
    let req = TestRequest::post().uri("/payment_session").set_json(payment_session_body("P1", &cancel_url("P1")));
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(db.fetch_payment_session("P1").await.unwrap().is_none());
}

#[actix_web::test]
async fn payment_session_needs_a_checkout_token() {
    let db = configured_db().await;
    let res = TestServer::new(&db).send(create_session("P1", "https://shop.example/cart")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body.contains("checkout token"));
    assert!(db.fetch_payment_session("P1").await.unwrap().is_none());
}

#[actix_web::test]
async fn buyer_is_redirected_to_the_pay_page() {
    let db = configured_db().await;
    TestServer::new(&db).send(create_session("P1", &cancel_url("P1"))).await;

    let mut gateway = MockGateway::new();
    gateway.expect_create_customer().times(1).returning(|_, _| Ok("s-cst-1".to_string()));
    gateway.expect_create_metadata().times(1).returning(|_, _| Ok("s-mtd-1".to_string()));
    gateway.expect_create_pay_page().withf(|_, action, _| *action == PayPageAction::Charge).times(1).returning(
        |_, _, _| {
            Ok(serde_json::from_value::<PayPage>(json!({
                "id": "s-ppg-1",
                "redirectUrl": "https://payment.unzer.com/v1/paypage/s-ppg-1",
                "resources": { "paymentId": "s-pay-1" }
            }))
            .unwrap())
        },
    );
    let mut marketplace = MockMarketplace::new();
    marketplace.expect_resolve_session().never();
    let res = TestServer::new(&db)
        .with_flow(gateway, marketplace)
        .send(TestRequest::get().uri("/app/processing/P1"))
        .await;
    assert_eq!(res.status, StatusCode::FOUND);
    assert_eq!(res.location.as_deref(), Some("https://payment.unzer.com/v1/paypage/s-ppg-1?locale=en-GB"));
    let session = db.fetch_payment_session("P1").await.unwrap().unwrap();
    assert_eq!(session.pid.as_deref(), Some("s-pay-1"));
    assert_eq!(session.status, PaymentSessionStatus::ChargePending);
}

#[actix_web::test]
async fn unknown_payment_sessions_cannot_be_resumed() {
    let db = configured_db().await;
    let res = TestServer::new(&db).send(TestRequest::get().uri("/app/processing/P9")).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(res.location.is_none());
}

#[actix_web::test]
async fn resume_without_gateway_keys_is_a_server_error() {
    let db = test_database().await;
    TestServer::new(&db).send(create_session("P1", &cancel_url("P1"))).await;
    let res = TestServer::new(&db).send(TestRequest::get().uri("/app/processing/P1")).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!res.body.contains("s-priv"));
}

#[actix_web::test]
async fn capture_before_the_pay_page_is_a_conflict() {
    let db = configured_db().await;
    TestServer::new(&db).send(create_session("P1", &cancel_url("P1"))).await;
    let req = TestRequest::post().uri("/capture_session").set_json(json!({
        "id": "C1",
        "gid": "gid://shopify/CaptureSession/C1",
        "amount": "10.00",
        "currency": "EUR",
        "payment_id": "P1",
        "proposed_at": "2024-07-02T10:00:00Z"
    }));
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn void_for_an_unknown_payment() {
    let db = configured_db().await;
    let req = TestRequest::post().uri("/void_session").set_json(json!({
        "id": "V1",
        "gid": "gid://shopify/VoidSession/V1",
        "payment_id": "P9",
        "proposed_at": "2024-07-02T10:00:00Z"
    }));
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn malformed_amounts_are_bad_requests() {
    let db = configured_db().await;
    let mut body = payment_session_body("P1", &cancel_url("P1"));
    body["amount"] = json!("1.000é");
    let req = TestRequest::post().uri("/payment_session").insert_header((SHOP_DOMAIN_HEADER, SHOP)).set_json(body);
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(db.fetch_payment_session("P1").await.unwrap().is_none());
}
