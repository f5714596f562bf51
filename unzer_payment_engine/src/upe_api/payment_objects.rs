use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unzer_tools::UnzerEvent;
use upg_common::Amount;

use crate::{
    db_types::{
        CaptureSession,
        Checkout,
        CheckoutLine,
        GatewayTransaction,
        MarketplaceCustomer,
        NewCaptureSession,
        NewPaymentSession,
        NewRefundSession,
        NewVoidSession,
        PaymentKind,
        PaymentLog,
        PaymentPageSettings,
        PaymentSession,
        RefundSession,
        ShopConfiguration,
        UnzerCancel,
        VoidSession,
    },
    upe_api::errors::WebhookError,
};

//--------------------------------------   Marketplace requests   -----------------------------------------------------

/// The body of a marketplace `payment_session` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSessionRequest {
    pub id: String,
    pub gid: String,
    pub group: String,
    pub amount: Amount,
    pub currency: String,
    #[serde(default)]
    pub test: bool,
    pub kind: PaymentKind,
    #[serde(default)]
    pub customer: MarketplaceCustomer,
    #[serde(default)]
    pub payment_method: Value,
    pub proposed_at: DateTime<Utc>,
    pub cancel_url: String,
}

impl PaymentSessionRequest {
    pub fn into_new_session(self, shop: &str, checkout_token: String) -> NewPaymentSession {
        NewPaymentSession {
            id: self.id,
            gid: self.gid,
            group: self.group,
            amount: self.amount,
            currency: self.currency,
            test: self.test,
            kind: self.kind,
            customer: self.customer,
            payment_method: self.payment_method,
            cancel_url: self.cancel_url,
            checkout_token,
            proposed_at: self.proposed_at,
            shop: shop.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSessionRequest {
    pub id: String,
    pub gid: String,
    pub amount: Amount,
    pub currency: String,
    pub payment_id: String,
    pub proposed_at: DateTime<Utc>,
}

impl From<CaptureSessionRequest> for NewCaptureSession {
    fn from(req: CaptureSessionRequest) -> Self {
        Self {
            id: req.id,
            gid: req.gid,
            payment_id: req.payment_id,
            amount: req.amount,
            currency: req.currency,
            proposed_at: req.proposed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundSessionRequest {
    pub id: String,
    pub gid: String,
    pub amount: Amount,
    pub currency: String,
    pub payment_id: String,
    pub proposed_at: DateTime<Utc>,
}

impl From<RefundSessionRequest> for NewRefundSession {
    fn from(req: RefundSessionRequest) -> Self {
        Self {
            id: req.id,
            gid: req.gid,
            payment_id: req.payment_id,
            amount: req.amount,
            currency: req.currency,
            proposed_at: req.proposed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoidSessionRequest {
    pub id: String,
    pub gid: String,
    pub payment_id: String,
    pub proposed_at: DateTime<Utc>,
}

impl From<VoidSessionRequest> for NewVoidSession {
    fn from(req: VoidSessionRequest) -> Self {
        Self { id: req.id, gid: req.gid, payment_id: req.payment_id, proposed_at: req.proposed_at }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSessionCreated {
    pub redirect_url: String,
}

//--------------------------------------   Gateway notifications  -----------------------------------------------------

/// A webhook delivered by the gateway. Only the event name is guaranteed to be present.
#[derive(Debug, Clone)]
pub struct GatewayNotification {
    pub event: UnzerEvent,
    pub payment_id: Option<String>,
    pub public_key: Option<String>,
    pub retrieve_url: Option<String>,
    /// The notification as received, for the audit trail
    pub payload: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationFields {
    event: String,
    payment_id: Option<String>,
    public_key: Option<String>,
    retrieve_url: Option<String>,
}

impl GatewayNotification {
    /// Reads a notification body. Unknown event names give [`WebhookError::UnknownEvent`].
    pub fn parse(payload: Value) -> Result<Self, WebhookError> {
        let fields = NotificationFields::deserialize(&payload)
            .map_err(|e| WebhookError::MalformedNotification(e.to_string()))?;
        let event = fields.event.parse::<UnzerEvent>().map_err(|e| WebhookError::UnknownEvent(e.0))?;
        Ok(Self {
            event,
            payment_id: fields.payment_id,
            public_key: fields.public_key,
            retrieve_url: fields.retrieve_url,
            payload,
        })
    }
}

//--------------------------------------       Dashboard          -----------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PaymentSessionPage {
    pub count: i64,
    pub page: u32,
    pub page_size: u32,
    pub payment_sessions: Vec<PaymentSession>,
}

/// Everything recorded against a payment session, for the payment status page.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentDetails {
    pub payment_session: PaymentSession,
    pub captures: Vec<CaptureSession>,
    pub refunds: Vec<RefundSession>,
    pub voids: Vec<VoidSession>,
    pub transactions: Vec<GatewayTransaction>,
    pub cancels: Vec<UnzerCancel>,
    pub logs: Vec<PaymentLog>,
}

//--------------------------------------     Configuration        -----------------------------------------------------

/// A shop configuration that is safe to hand to the admin UI. Keys and tokens are reduced to whether they are set.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationSummary {
    pub shop: String,
    pub unzer_public_key: Option<String>,
    pub has_private_key: bool,
    pub has_access_token: bool,
    pub excluded_payment_types: Vec<String>,
    pub payment_page_settings: Option<PaymentPageSettings>,
    pub ready: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<ShopConfiguration> for ConfigurationSummary {
    fn from(config: ShopConfiguration) -> Self {
        Self {
            has_private_key: config.unzer_private_key.as_ref().map(|k| !k.reveal().is_empty()).unwrap_or(false),
            has_access_token: config.access_token.as_ref().map(|t| !t.reveal().is_empty()).unwrap_or(false),
            shop: config.shop,
            unzer_public_key: config.unzer_public_key,
            excluded_payment_types: config.excluded_payment_types,
            payment_page_settings: config.payment_page_settings,
            ready: config.ready,
            updated_at: config.updated_at,
        }
    }
}

//--------------------------------------       Checkouts          -----------------------------------------------------

/// The subset of the marketplace `checkouts/create` and `checkouts/update` webhook payloads that the basket needs.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutWebhook {
    pub cart_token: Option<String>,
    pub token: Option<String>,
    #[serde(default)]
    pub line_items: Vec<CheckoutLine>,
    pub total_price: Option<Amount>,
    pub subtotal_price: Option<Amount>,
    pub total_tax: Option<Amount>,
    pub currency: Option<String>,
}

impl CheckoutWebhook {
    /// Converts the payload into a checkout snapshot. Payloads without a cart token cannot be matched to a payment
    /// session, so they give `None`.
    pub fn into_checkout(self, shop: &str) -> Option<Checkout> {
        let token = self.cart_token.filter(|t| !t.is_empty())?;
        Some(Checkout {
            token,
            shop: shop.to_string(),
            lines: self.line_items,
            total_price: self.total_price,
            subtotal_price: self.subtotal_price,
            total_tax: self.total_tax,
            currency: self.currency,
        })
    }
}

//--------------------------------------        Settings          -----------------------------------------------------

/// Process-wide settings for the payment flows.
#[derive(Debug, Clone, Default)]
pub struct FlowSettings {
    /// The externally visible origin of the app, without a trailing slash
    pub public_url: String,
    /// Payment types that no shop may offer
    pub excluded_payment_types: Vec<String>,
    /// The shop version reported in the gateway metadata
    pub shop_version: String,
}

impl FlowSettings {
    pub fn new(public_url: &str, excluded_payment_types: Vec<String>, shop_version: &str) -> Self {
        Self {
            public_url: public_url.trim_end_matches('/').to_string(),
            excluded_payment_types,
            shop_version: shop_version.to_string(),
        }
    }

    pub fn processing_url(&self, payment_id: &str) -> String {
        format!("{}/app/processing/{payment_id}", self.public_url)
    }

    pub fn notifications_url(&self) -> String {
        format!("{}/app/notifications", self.public_url)
    }

    /// The system list followed by the shop list, without empty entries.
    pub fn exclude_types(&self, shop_types: &[String]) -> Vec<String> {
        self.excluded_payment_types
            .iter()
            .chain(shop_types.iter())
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    }
}
