//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the engine, the database or an outbound
//! HTTP call, so make sure new handlers do the same rather than blocking:
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, http::header, web, HttpRequest, HttpResponse, Responder};
use log::*;
use serde::Deserialize;
use serde_json::{json, Value};
use shopify_tools::PendReason;
use unzer_payment_engine::{
    db_types::ConfigurationUpdate,
    payment_objects::{
        CaptureSessionRequest,
        CheckoutWebhook,
        ConfigurationSummary,
        GatewayNotification,
        PaymentSessionRequest,
        RefundSessionRequest,
        VoidSessionRequest,
    },
    CheckoutApi,
    ConfigurationApi,
    DashboardApi,
    MarketplaceSessions,
    PaymentFlowApi,
    PaymentGateway,
    PaymentStore,
    WebhookApi,
};

use crate::{
    errors::ServerError,
    helpers::{required_header, SHOP_DOMAIN_HEADER, WEBHOOK_SHOP_HEADER, WEBHOOK_TOPIC_HEADER},
};

const DEFAULT_PAGE_SIZE: u32 = 25;

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//------------------------------------------   Marketplace sessions  ---------------------------------------------
route!(payment_session => Post "/payment_session" impl PaymentStore, PaymentGateway, MarketplaceSessions);
/// The marketplace starts a payment here. The buyer is sent to the processing URL in the response, which hands them
/// on to the gateway pay-page.
pub async fn payment_session<B, G, M>(
    req: HttpRequest,
    api: web::Data<PaymentFlowApi<B, G, M>>,
    body: web::Json<PaymentSessionRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    let shop = required_header(&req, SHOP_DOMAIN_HEADER)?;
    let request = body.into_inner();
    debug!("💻️ POST payment_session [{}] for {shop}", request.id);
    let created = api.create_payment_session(&shop, request).await?;
    Ok(HttpResponse::Ok().json(created))
}

route!(capture_session => Post "/capture_session" impl PaymentStore, PaymentGateway, MarketplaceSessions);
pub async fn capture_session<B, G, M>(
    api: web::Data<PaymentFlowApi<B, G, M>>,
    body: web::Json<CaptureSessionRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    let request = body.into_inner();
    debug!("💻️ POST capture_session [{}] for payment [{}]", request.id, request.payment_id);
    let capture = api.capture(request).await?;
    Ok(HttpResponse::Ok().json(capture))
}

route!(refund_session => Post "/refund_session" impl PaymentStore, PaymentGateway, MarketplaceSessions);
/// Starts a refund. The refund session is resolved later, when the gateway reports the cancel.
pub async fn refund_session<B, G, M>(
    api: web::Data<PaymentFlowApi<B, G, M>>,
    body: web::Json<RefundSessionRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    let request = body.into_inner();
    debug!("💻️ POST refund_session [{}] for payment [{}]", request.id, request.payment_id);
    let refund = api.refund(request).await?;
    Ok(HttpResponse::Ok().json(refund))
}

route!(void_session => Post "/void_session" impl PaymentStore, PaymentGateway, MarketplaceSessions);
pub async fn void_session<B, G, M>(
    api: web::Data<PaymentFlowApi<B, G, M>>,
    body: web::Json<VoidSessionRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    let request = body.into_inner();
    debug!("💻️ POST void_session [{}] for payment [{}]", request.id, request.payment_id);
    let void = api.void(request).await?;
    Ok(HttpResponse::Ok().json(void))
}

route!(processing => Get "/app/processing/{payment_id}" impl PaymentStore, PaymentGateway, MarketplaceSessions);
/// The buyer lands here from the marketplace, and again when the gateway pay-page sends them back. Either way they
/// are redirected to wherever the payment session should go next.
pub async fn processing<B, G, M>(
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<B, G, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    let payment_id = path.into_inner();
    debug!("💻️ GET processing for payment session [{payment_id}]");
    let location = api.resume_payment(&payment_id).await?;
    Ok(HttpResponse::Found().insert_header((header::LOCATION, location)).finish())
}

//------------------------------------------   Gateway notifications  ---------------------------------------------
route!(gateway_notification => Post "/app/notifications" impl PaymentStore, PaymentGateway, MarketplaceSessions);
pub async fn gateway_notification<B, G, M>(
    api: web::Data<WebhookApi<B, G, M>>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    let notification = GatewayNotification::parse(body.into_inner()).map_err(|e| {
        warn!("💻️ Rejecting gateway notification. {e}");
        ServerError::from(e)
    })?;
    let event = notification.event;
    debug!("💻️ Gateway notification: {event} for {:?}", notification.payment_id);
    api.handle(&notification).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "event": event.to_string() })))
}

//------------------------------------------   Marketplace webhooks  ---------------------------------------------
route!(shopify_webhook => Post "/webhooks" impl PaymentStore, PaymentGateway, MarketplaceSessions);
/// Checkout, uninstall and compliance webhooks from the marketplace. The HMAC middleware has already checked the
/// signature by the time the request gets here.
pub async fn shopify_webhook<B, G, M>(
    req: HttpRequest,
    body: web::Bytes,
    checkouts: web::Data<CheckoutApi<B>>,
    config_api: web::Data<ConfigurationApi<B, G, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    let topic = required_header(&req, WEBHOOK_TOPIC_HEADER)?;
    let shop = required_header(&req, WEBHOOK_SHOP_HEADER)?;
    debug!("💻️ Marketplace webhook {topic} from {shop}");
    match topic.as_str() {
        "checkouts/create" | "checkouts/update" => {
            let checkout = serde_json::from_slice::<CheckoutWebhook>(&body)
                .map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
            let stored = checkouts.record_checkout(&shop, checkout).await.map_err(|e| {
                error!("💻️ Could not store the checkout from {shop}. {e}");
                ServerError::BackendError("Database error".into())
            })?;
            Ok(HttpResponse::Ok().json(json!({ "success": true, "stored": stored })))
        },
        "app/uninstalled" => {
            let forgotten = config_api.uninstall(&shop).await?;
            info!("💻️ App uninstalled from {shop}");
            Ok(HttpResponse::Ok().json(json!({ "success": true, "forgotten": forgotten })))
        },
        "customers/data_request" | "customers/redact" | "shop/redact" => {
            info!("💻️ Compliance webhook {topic} from {shop} acknowledged");
            Ok(HttpResponse::Ok().json(json!({ "success": true })))
        },
        _ => Err(ServerError::UnknownEvent(topic)),
    }
}

//----------------------------------------------   Admin: payments  ----------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsQuery {
    pub shop: String,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

route!(payments => Get "/payments" impl PaymentStore);
pub async fn payments<B: PaymentStore>(
    query: web::Query<PaymentsQuery>,
    api: web::Data<DashboardApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let PaymentsQuery { shop, page, page_size } = query.into_inner();
    let page = page.unwrap_or(1);
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    debug!("💻️ GET payments for {shop}. Page {page} ({page_size} per page)");
    let result = api.payment_sessions(&shop, page, page_size).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(payment_details => Get "/payments/{payment_id}" impl PaymentStore);
pub async fn payment_details<B: PaymentStore>(
    path: web::Path<String>,
    api: web::Data<DashboardApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payment_id = path.into_inner();
    debug!("💻️ GET payment details for [{payment_id}]");
    let details = api
        .payment_details(&payment_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Payment session {payment_id}")))?;
    Ok(HttpResponse::Ok().json(details))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PendRequest {
    #[serde(default)]
    pub reason: PendReason,
}

route!(pend_payment => Post "/payments/{payment_id}/pend" impl PaymentStore, PaymentGateway, MarketplaceSessions);
pub async fn pend_payment<B, G, M>(
    path: web::Path<String>,
    body: Option<web::Json<PendRequest>>,
    api: web::Data<PaymentFlowApi<B, G, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    let payment_id = path.into_inner();
    let reason = body.map(|b| b.into_inner().reason).unwrap_or_default();
    info!("💻️ Pending payment session [{payment_id}]: {reason}");
    let session = api.pend_payment_session(&payment_id, reason).await?;
    Ok(HttpResponse::Ok().json(session))
}

//----------------------------------------------   Admin: configuration  ----------------------------------------------
route!(configuration => Get "/configuration/{shop}" impl PaymentStore, PaymentGateway, MarketplaceSessions);
pub async fn configuration<B, G, M>(
    path: web::Path<String>,
    api: web::Data<ConfigurationApi<B, G, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    let shop = path.into_inner();
    debug!("💻️ GET configuration for {shop}");
    let config = api.fetch(&shop).await?;
    Ok(HttpResponse::Ok().json(ConfigurationSummary::from(config)))
}

route!(update_configuration => Put "/configuration" impl PaymentStore, PaymentGateway, MarketplaceSessions);
/// Upserts a shop configuration. Keys and tokens never come back in the response.
pub async fn update_configuration<B, G, M>(
    body: web::Json<ConfigurationUpdate>,
    api: web::Data<ConfigurationApi<B, G, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    let update = body.into_inner();
    info!("💻️ PUT configuration for {}", update.shop);
    let config = api.update(update).await?;
    Ok(HttpResponse::Ok().json(ConfigurationSummary::from(config)))
}

route!(gateway_webhooks => Get "/configuration/{shop}/webhook" impl PaymentStore, PaymentGateway, MarketplaceSessions);
pub async fn gateway_webhooks<B, G, M>(
    path: web::Path<String>,
    api: web::Data<ConfigurationApi<B, G, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    let shop = path.into_inner();
    debug!("💻️ GET gateway webhooks for {shop}");
    let hooks = api.webhooks(&shop).await?;
    Ok(HttpResponse::Ok().json(hooks))
}

route!(install_gateway_webhook => Post "/configuration/{shop}/webhook" impl PaymentStore, PaymentGateway, MarketplaceSessions);
pub async fn install_gateway_webhook<B, G, M>(
    path: web::Path<String>,
    api: web::Data<ConfigurationApi<B, G, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    let shop = path.into_inner();
    info!("💻️ Installing the gateway webhook for {shop}");
    let hooks = api.install_webhook(&shop).await?;
    Ok(HttpResponse::Ok().json(hooks))
}

route!(delete_gateway_webhook => Delete "/configuration/{shop}/webhook/{event_id}" impl PaymentStore, PaymentGateway, MarketplaceSessions);
pub async fn delete_gateway_webhook<B, G, M>(
    path: web::Path<(String, String)>,
    api: web::Data<ConfigurationApi<B, G, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    let (shop, event_id) = path.into_inner();
    info!("💻️ Deleting gateway webhook {event_id} for {shop}");
    api.delete_webhook(&shop, &event_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

route!(payment_types => Get "/configuration/{shop}/payment_types" impl PaymentStore, PaymentGateway, MarketplaceSessions);
pub async fn payment_types<B, G, M>(
    path: web::Path<String>,
    api: web::Data<ConfigurationApi<B, G, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    let shop = path.into_inner();
    debug!("💻️ GET payment types for {shop}");
    let keypair = api.payment_types(&shop).await?;
    Ok(HttpResponse::Ok().json(keypair))
}
