use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::info;
use shopify_tools::PaymentsAppsApi;
use unzer_payment_engine::{
    CheckoutApi,
    ConfigurationApi,
    DashboardApi,
    MarketplaceSessions,
    PaymentFlowApi,
    PaymentGateway,
    PaymentStore,
    SqliteDatabase,
    WebhookApi,
};
use unzer_tools::UnzerApi;
use upg_common::Secret;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    helpers::WEBHOOK_HMAC_HEADER,
    middleware::{AdminAuthMiddlewareFactory, HmacMiddlewareFactory},
    routes::{
        health,
        CaptureSessionRoute,
        ConfigurationRoute,
        DeleteGatewayWebhookRoute,
        GatewayNotificationRoute,
        GatewayWebhooksRoute,
        InstallGatewayWebhookRoute,
        PaymentDetailsRoute,
        PaymentSessionRoute,
        PaymentTypesRoute,
        PaymentsRoute,
        PendPaymentRoute,
        ProcessingRoute,
        RefundSessionRoute,
        ShopifyWebhookRoute,
        UpdateConfigurationRoute,
        VoidSessionRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let unzer = UnzerApi::new(config.unzer_api.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let shopify = PaymentsAppsApi::new(config.shopify_config.payments_api.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🚀️ Gateway API at {}. Public URL is {}", config.unzer_api.api_url, config.public_url);
    let srv = create_server_instance(config, db, unzer, shopify)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    unzer: UnzerApi,
    shopify: PaymentsAppsApi,
) -> Result<Server, ServerError> {
    let settings = config.flow_settings();
    let hmac_secret = config.shopify_config.api_secret.clone();
    let hmac_checks = config.shopify_config.hmac_checks;
    let admin_token = config.admin_token.clone();
    let srv = HttpServer::new(move || {
        let flow_api = PaymentFlowApi::new(db.clone(), unzer.clone(), shopify.clone(), settings.clone());
        let webhook_api = WebhookApi::new(db.clone(), unzer.clone(), shopify.clone());
        let config_api = ConfigurationApi::new(db.clone(), unzer.clone(), shopify.clone(), settings.clone());
        let checkout_api = CheckoutApi::new(db.clone());
        let dashboard_api = DashboardApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("upg::access_log"))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(webhook_api))
            .app_data(web::Data::new(config_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(dashboard_api))
            .configure(|cfg| {
                configure_routes::<SqliteDatabase, UnzerApi, PaymentsAppsApi>(
                    cfg,
                    hmac_secret.clone(),
                    hmac_checks,
                    admin_token.clone(),
                )
            })
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers every route. The APIs the handlers use must already be in the app data.
pub fn configure_routes<B, G, M>(
    cfg: &mut web::ServiceConfig,
    hmac_secret: Secret<String>,
    hmac_checks: bool,
    admin_token: Option<Secret<String>>,
) where
    B: PaymentStore + 'static,
    G: PaymentGateway + 'static,
    M: MarketplaceSessions + 'static,
{
    let shopify_scope = web::scope("/shopify")
        .wrap(HmacMiddlewareFactory::new(WEBHOOK_HMAC_HEADER, hmac_secret, hmac_checks))
        .service(ShopifyWebhookRoute::<B, G, M>::new());
    let admin_scope = web::scope("/api")
        .wrap(AdminAuthMiddlewareFactory::new(admin_token))
        .service(PaymentsRoute::<B>::new())
        .service(PendPaymentRoute::<B, G, M>::new())
        .service(PaymentDetailsRoute::<B>::new())
        .service(UpdateConfigurationRoute::<B, G, M>::new())
        .service(ConfigurationRoute::<B, G, M>::new())
        .service(GatewayWebhooksRoute::<B, G, M>::new())
        .service(InstallGatewayWebhookRoute::<B, G, M>::new())
        .service(DeleteGatewayWebhookRoute::<B, G, M>::new())
        .service(PaymentTypesRoute::<B, G, M>::new());
    cfg.service(health)
        .service(PaymentSessionRoute::<B, G, M>::new())
        .service(CaptureSessionRoute::<B, G, M>::new())
        .service(RefundSessionRoute::<B, G, M>::new())
        .service(VoidSessionRoute::<B, G, M>::new())
        .service(ProcessingRoute::<B, G, M>::new())
        .service(GatewayNotificationRoute::<B, G, M>::new())
        .service(shopify_scope)
        .service(admin_scope);
}
