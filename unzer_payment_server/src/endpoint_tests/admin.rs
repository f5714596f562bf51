use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use unzer_payment_engine::{
    test_utils::{
        mocks::{MockGateway, MockMarketplace},
        prepare_env::test_database,
    },
    ConfigurationStore,
};
use unzer_tools::data_objects::WebhookEventData;

use super::helpers::*;
use crate::helpers::SHOP_DOMAIN_HEADER;

fn webhook(id: &str, url: &str) -> WebhookEventData {
    WebhookEventData { id: id.to_string(), url: url.to_string(), event: "all".to_string() }
}

#[actix_web::test]
async fn admin_requests_need_a_token() {
    let db = configured_db().await;
    let res = TestServer::new(&db).send(TestRequest::get().uri(&format!("/api/configuration/{SHOP}"))).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::get()
        .uri(&format!("/api/configuration/{SHOP}"))
        .insert_header(("Authorization", "Bearer not-the-token"));
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_api_is_off_without_a_token() {
    let db = configured_db().await;
    let req = admin_request(TestRequest::get().uri(&format!("/api/configuration/{SHOP}")));
    let res = TestServer::new(&db).without_admin_token().send(req).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn configuration_never_shows_secrets() {
    let db = test_database().await;
    let req = admin_request(TestRequest::put().uri("/api/configuration")).set_json(json!({
        "shop": SHOP,
        "unzer_private_key": "s-priv-secret",
        "unzer_public_key": "s-pub-1",
        "excluded_payment_types": ["paypal"]
    }));
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(!res.body.contains("s-priv-secret"));

    let req = admin_request(TestRequest::get().uri(&format!("/api/configuration/{SHOP}")));
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(!res.body.contains("s-priv-secret"));
    let body: serde_json::Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body["shop"], json!(SHOP));
    assert_eq!(body["unzer_public_key"], json!("s-pub-1"));
    assert_eq!(body["has_private_key"], json!(true));
    assert_eq!(body["has_access_token"], json!(false));
    assert_eq!(body["excluded_payment_types"], json!(["paypal"]));
    assert_eq!(body["ready"], json!(false));

    let stored = db.fetch_configuration(SHOP).await.unwrap().unwrap();
    assert_eq!(stored.unzer_private_key.unwrap().reveal(), "s-priv-secret");
}

#[actix_web::test]
async fn unknown_shops_have_no_configuration() {
    let db = configured_db().await;
    let req = admin_request(TestRequest::get().uri("/api/configuration/nowhere.myshopify.com"));
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn shops_without_keys_cannot_be_made_ready() {
    let db = test_database().await;
    let mut marketplace = MockMarketplace::new();
    marketplace.expect_configure_app().never();
    let req = admin_request(TestRequest::put().uri("/api/configuration"))
        .set_json(json!({ "shop": SHOP, "access_token": "shpat_1", "ready": true }));
    let res = TestServer::new(&db).with_config(MockGateway::new(), marketplace).send(req).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert!(!db.fetch_configuration(SHOP).await.unwrap().unwrap().ready);
}

#[actix_web::test]
async fn ready_shops_are_reported_to_the_marketplace() {
    let db = configured_db().await;
    let mut marketplace = MockMarketplace::new();
    marketplace
        .expect_configure_app()
        .withf(|creds, handle, ready| creds.shop == SHOP && handle.as_deref() == Some(SHOP) && *ready)
        .times(1)
        .returning(|_, _, _| Ok(()));
    let req = admin_request(TestRequest::put().uri("/api/configuration")).set_json(json!({ "shop": SHOP, "ready": true }));
    let res = TestServer::new(&db).with_config(MockGateway::new(), marketplace).send(req).await;
    assert_eq!(res.status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body["ready"], json!(true));
    assert!(!res.body.contains("shpat_1"));
}

#[actix_web::test]
async fn gateway_webhook_is_installed_once() {
    let db = configured_db().await;
    let url = format!("{PUBLIC_URL}/app/notifications");
    let mut gateway = MockGateway::new();
    gateway
        .expect_get_all_webhooks()
        .withf(|key| key.reveal() == "s-priv-1")
        .times(1)
        .returning(|_| Ok(vec![webhook("s-evt-0", "https://elsewhere.example/hooks")]));
    let expected = url.clone();
    gateway
        .expect_create_webhook()
        .withf(move |_, url| url == expected)
        .times(1)
        .returning(|_, url| Ok(vec![webhook("s-evt-1", url)]));
    let req = admin_request(TestRequest::post().uri(&format!("/api/configuration/{SHOP}/webhook")));
    let res = TestServer::new(&db).with_config(gateway, MockMarketplace::new()).send(req).await;
    assert_eq!(res.status, StatusCode::OK);
    let hooks: Vec<WebhookEventData> = serde_json::from_str(&res.body).unwrap();
    assert_eq!(hooks, vec![webhook("s-evt-1", &url)]);

    let mut gateway = MockGateway::new();
    let installed = url.clone();
    gateway.expect_get_all_webhooks().times(1).returning(move |_| Ok(vec![webhook("s-evt-1", &installed)]));
    gateway.expect_create_webhook().never();
    let req = admin_request(TestRequest::post().uri(&format!("/api/configuration/{SHOP}/webhook")));
    let res = TestServer::new(&db).with_config(gateway, MockMarketplace::new()).send(req).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[actix_web::test]
async fn gateway_webhooks_need_keys() {
    let db = test_database().await;
    let req = admin_request(TestRequest::put().uri("/api/configuration")).set_json(json!({ "shop": SHOP }));
    TestServer::new(&db).send(req).await;
    let mut gateway = MockGateway::new();
    gateway.expect_get_all_webhooks().never();
    let req = admin_request(TestRequest::get().uri(&format!("/api/configuration/{SHOP}/webhook")));
    let res = TestServer::new(&db).with_config(gateway, MockMarketplace::new()).send(req).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn gateway_webhooks_can_be_deleted() {
    let db = configured_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_delete_webhook().withf(|_, id| id == "s-evt-1").times(1).returning(|_, _| Ok(()));
    let req = admin_request(TestRequest::delete().uri(&format!("/api/configuration/{SHOP}/webhook/s-evt-1")));
    let res = TestServer::new(&db).with_config(gateway, MockMarketplace::new()).send(req).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[actix_web::test]
async fn payments_are_listed_per_shop() {
    let db = configured_db().await;
    for id in ["P1", "P2", "P3"] {
        let req = TestRequest::post()
            .uri("/payment_session")
            .insert_header((SHOP_DOMAIN_HEADER, SHOP))
            .set_json(payment_session_body(id, &cancel_url(id)));
        let res = TestServer::new(&db).send(req).await;
        assert_eq!(res.status, StatusCode::OK);
    }
    let req = admin_request(TestRequest::get().uri(&format!("/api/payments?shop={SHOP}&page=1&page_size=2")));
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body["count"], json!(3));
    assert_eq!(body["payment_sessions"].as_array().unwrap().len(), 2);

    let req = admin_request(TestRequest::get().uri("/api/payments?shop=nowhere.myshopify.com"));
    let res = TestServer::new(&db).send(req).await;
    let body: serde_json::Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body["count"], json!(0));
    assert_eq!(body["page_size"], json!(25));

    let req = admin_request(TestRequest::get().uri(&format!("/api/payments?shop={SHOP}&page=0")));
    let res = TestServer::new(&db).send(req).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn payment_details() {
    let db = configured_db().await;
    let req = TestRequest::post()
        .uri("/payment_session")
        .insert_header((SHOP_DOMAIN_HEADER, SHOP))
        .set_json(payment_session_body("P1", &cancel_url("P1")));
    TestServer::new(&db).send(req).await;

    let res = TestServer::new(&db).send(admin_request(TestRequest::get().uri("/api/payments/P1"))).await;
    assert_eq!(res.status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body["payment_session"]["id"], json!("P1"));
    assert_eq!(body["captures"], json!([]));

    let res = TestServer::new(&db).send(admin_request(TestRequest::get().uri("/api/payments/P9"))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn unknown_payments_cannot_be_pended() {
    let db = configured_db().await;
    let mut marketplace = MockMarketplace::new();
    marketplace.expect_pend_session().never();
    let req = admin_request(TestRequest::post().uri("/api/payments/P9/pend"));
    let res = TestServer::new(&db).with_flow(MockGateway::new(), marketplace).send(req).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
