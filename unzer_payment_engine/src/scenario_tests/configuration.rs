use unzer_tools::data_objects::WebhookEventData;
use upg_common::Secret;

use super::*;
use crate::{
    db_types::ConfigurationUpdate,
    test_utils::mocks::{MockGateway, MockMarketplace},
    traits::MarketplaceError,
    upe_api::errors::{ConfigurationApiError, DashboardApiError},
    ConfigurationApi,
    DashboardApi,
};

fn config_api(
    db: &SqliteDatabase,
    gateway: MockGateway,
    marketplace: MockMarketplace,
) -> ConfigurationApi<SqliteDatabase, MockGateway, MockMarketplace> {
    ConfigurationApi::new(db.clone(), gateway, marketplace, settings())
}

fn ready(value: bool) -> ConfigurationUpdate {
    ConfigurationUpdate { shop: SHOP.to_string(), ready: Some(value), ..Default::default() }
}

#[tokio::test]
async fn shop_cannot_be_ready_without_keys() {
    let db = test_database().await;
    let update = ConfigurationUpdate {
        shop: SHOP.to_string(),
        access_token: Some(Secret::new("shpat_1".to_string())),
        ..Default::default()
    };
    let mut marketplace = MockMarketplace::new();
    marketplace.expect_configure_app().never();
    let api = config_api(&db, MockGateway::new(), marketplace);
    api.update(update).await.unwrap();
    let err = api.update(ready(true)).await.unwrap_err();
    assert!(matches!(err, ConfigurationApiError::MissingKeys(_)));
    assert!(!api.fetch(SHOP).await.unwrap().ready);
}

#[tokio::test]
async fn ready_is_stored_once_the_marketplace_agrees() {
    let db = configured_db().await;
    let mut marketplace = MockMarketplace::new();
    marketplace
        .expect_configure_app()
        .withf(|creds, handle, ready| creds.shop == SHOP && handle.as_deref() == Some(SHOP) && *ready)
        .times(1)
        .returning(|_, _, _| Ok(()));
    let api = config_api(&db, MockGateway::new(), marketplace);
    let config = api.update(ready(true)).await.unwrap();
    assert!(config.ready);

    let mut marketplace = MockMarketplace::new();
    marketplace.expect_configure_app().times(1).returning(|_, _, _| Err(MarketplaceError::Refused("nope".into())));
    let api = config_api(&db, MockGateway::new(), marketplace);
    let err = api.update(ready(false)).await.unwrap_err();
    assert!(matches!(err, ConfigurationApiError::MarketplaceError(_)));
    assert!(api.fetch(SHOP).await.unwrap().ready);
}

#[tokio::test]
async fn unknown_shops() {
    let db = test_database().await;
    let api = config_api(&db, MockGateway::new(), MockMarketplace::new());
    assert!(matches!(api.fetch(SHOP).await, Err(ConfigurationApiError::ShopNotFound(_))));
    assert!(!api.uninstall(SHOP).await.unwrap());
}

#[tokio::test]
async fn gateway_webhook_is_installed_once() {
    let db = configured_db().await;
    let url = "https://upg.example/app/notifications";
    let mut gateway = MockGateway::new();
    gateway.expect_get_all_webhooks().times(1).returning(|_| Ok(vec![]));
    gateway
        .expect_create_webhook()
        .withf(move |key, u| key.reveal() == "s-priv-1" && u == url)
        .times(1)
        .returning(move |_, _| {
            Ok(vec![WebhookEventData { id: "s-whk-1".into(), url: url.into(), event: "all".into() }])
        });
    let api = config_api(&db, gateway, MockMarketplace::new());
    let hooks = api.install_webhook(SHOP).await.unwrap();
    assert_eq!(hooks.len(), 1);

    let mut gateway = MockGateway::new();
    gateway
        .expect_get_all_webhooks()
        .returning(move |_| Ok(vec![WebhookEventData { id: "s-whk-1".into(), url: url.into(), event: "all".into() }]));
    gateway.expect_create_webhook().never();
    let api = config_api(&db, gateway, MockMarketplace::new());
    let hooks = api.install_webhook(SHOP).await.unwrap();
    assert_eq!(hooks[0].id, "s-whk-1");
}

#[tokio::test]
async fn uninstall_forgets_the_access_token() {
    let db = configured_db().await;
    let api = config_api(&db, MockGateway::new(), MockMarketplace::new());
    assert!(api.uninstall(SHOP).await.unwrap());
    let config = api.fetch(SHOP).await.unwrap();
    assert!(config.access_token.is_none());
    assert!(config.gateway_keys().is_some());
    assert!(!config.ready);
}

#[tokio::test]
async fn dashboard_pages() {
    let db = configured_db().await;
    let flow = flow_api(&db, MockGateway::new(), MockMarketplace::new());
    for id in ["P1", "P2", "P3"] {
        flow.create_payment_session(SHOP, payment_request(id, "sale")).await.unwrap();
    }
    let dashboard = DashboardApi::new(db.clone());
    let page = dashboard.payment_sessions(SHOP, 1, 2).await.unwrap();
    assert_eq!(page.count, 3);
    assert_eq!(page.payment_sessions.len(), 2);
    let page = dashboard.payment_sessions(SHOP, 2, 2).await.unwrap();
    assert_eq!(page.payment_sessions.len(), 1);
    let page = dashboard.payment_sessions("other.myshopify.com", 1, 2).await.unwrap();
    assert_eq!(page.count, 0);
    assert!(matches!(dashboard.payment_sessions(SHOP, 0, 2).await, Err(DashboardApiError::QueryError(_))));
    assert!(matches!(dashboard.payment_sessions(SHOP, 1, 101).await, Err(DashboardApiError::QueryError(_))));

    let details = dashboard.payment_details("P2").await.unwrap().unwrap();
    assert_eq!(details.payment_session.id, "P2");
    assert_eq!(details.logs.len(), 1);
    assert!(details.refunds.is_empty());
    assert!(dashboard.payment_details("P9").await.unwrap().is_none());
}
