use actix_web::{
    http::{header, StatusCode},
    test,
    test::TestRequest,
    web,
    App,
};
use log::debug;
use serde_json::json;
use unzer_payment_engine::{
    db_types::ConfigurationUpdate,
    test_utils::{
        mocks::{MockGateway, MockMarketplace},
        prepare_env::test_database,
    },
    CheckoutApi,
    ConfigurationApi,
    ConfigurationStore,
    DashboardApi,
    FlowSettings,
    PaymentFlowApi,
    SqliteDatabase,
    WebhookApi,
};
use upg_common::Secret;

use crate::server::configure_routes;

pub const SHOP: &str = "test-shop.myshopify.com";
pub const PUBLIC_URL: &str = "https://upg.example";
pub const HMAC_SECRET: &str = "shpss_test_secret";
pub const ADMIN_TOKEN: &str = "admin-token-1";

pub struct Response {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

/// Builds an app around a real database, with a separate pair of mocks for each API that talks to the outside world.
pub struct TestServer {
    db: SqliteDatabase,
    flow: (MockGateway, MockMarketplace),
    webhooks: (MockGateway, MockMarketplace),
    config: (MockGateway, MockMarketplace),
    admin_token: Option<Secret<String>>,
}

impl TestServer {
    pub fn new(db: &SqliteDatabase) -> Self {
        Self {
            db: db.clone(),
            flow: (MockGateway::new(), MockMarketplace::new()),
            webhooks: (MockGateway::new(), MockMarketplace::new()),
            config: (MockGateway::new(), MockMarketplace::new()),
            admin_token: Some(Secret::new(ADMIN_TOKEN.to_string())),
        }
    }

    pub fn with_flow(mut self, gateway: MockGateway, marketplace: MockMarketplace) -> Self {
        self.flow = (gateway, marketplace);
        self
    }

    pub fn with_config(mut self, gateway: MockGateway, marketplace: MockMarketplace) -> Self {
        self.config = (gateway, marketplace);
        self
    }

    pub fn without_admin_token(mut self) -> Self {
        self.admin_token = None;
        self
    }

    pub async fn send(self, req: TestRequest) -> Response {
        let settings = FlowSettings::new(PUBLIC_URL, vec![], "2024-07");
        let Self { db, flow, webhooks, config, admin_token } = self;
        let app = App::new()
            .app_data(web::Data::new(PaymentFlowApi::new(db.clone(), flow.0, flow.1, settings.clone())))
            .app_data(web::Data::new(WebhookApi::new(db.clone(), webhooks.0, webhooks.1)))
            .app_data(web::Data::new(ConfigurationApi::new(db.clone(), config.0, config.1, settings)))
            .app_data(web::Data::new(CheckoutApi::new(db.clone())))
            .app_data(web::Data::new(DashboardApi::new(db.clone())))
            .configure(|cfg| {
                configure_routes::<SqliteDatabase, MockGateway, MockMarketplace>(
                    cfg,
                    Secret::new(HMAC_SECRET.to_string()),
                    true,
                    admin_token,
                )
            });
        let service = test::init_service(app).await;
        debug!("Making request");
        match test::try_call_service(&service, req.to_request()).await {
            Ok(res) => {
                let status = res.status();
                let location =
                    res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()).map(String::from);
                let body = String::from_utf8_lossy(&test::read_body(res).await).into_owned();
                Response { status, location, body }
            },
            Err(e) => Response { status: e.as_response_error().status_code(), location: None, body: e.to_string() },
        }
    }
}

/// A fresh database with a fully configured shop.
pub async fn configured_db() -> SqliteDatabase {
    let db = test_database().await;
    let update = ConfigurationUpdate {
        shop: SHOP.to_string(),
        unzer_private_key: Some(Secret::new("s-priv-1".to_string())),
        unzer_public_key: Some("s-pub-1".to_string()),
        access_token: Some(Secret::new("shpat_1".to_string())),
        ..Default::default()
    };
    db.upsert_configuration(update).await.expect("Failed to configure the shop");
    db
}

pub fn payment_session_body(id: &str, cancel_url: &str) -> serde_json::Value {
    json!({
        "id": id,
        "gid": format!("gid://shopify/PaymentSession/{id}"),
        "group": format!("group-{id}"),
        "amount": "10.00",
        "currency": "EUR",
        "test": true,
        "kind": "sale",
        "customer": {
            "email": "buyer@example.com",
            "locale": "en-GB",
            "billing_address": {
                "given_name": "Jane",
                "family_name": "Doe",
                "line1": "1 High Street",
                "city": "London",
                "postal_code": "N1 9GU",
                "country_code": "GB"
            }
        },
        "payment_method": { "type": "offsite" },
        "proposed_at": "2024-07-01T10:00:00Z",
        "cancel_url": cancel_url
    })
}

pub fn cancel_url(id: &str) -> String {
    format!("https://{SHOP}/checkouts/cn/tok-{id}/processing")
}

pub fn admin_request(req: TestRequest) -> TestRequest {
    req.insert_header((header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}")))
}
