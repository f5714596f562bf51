//! Data types that are stored in, and read from, the session store.
//!
//! The JSON columns (customer, payment method, transaction resources and so on) are decoded into typed structs as
//! they leave the database, so the rest of the engine never has to poke at untyped JSON.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, Type};
use thiserror::Error;
pub use upg_common::Amount;
use upg_common::Secret;
use unzer_tools::data_objects::{PayPageSettings, Processing, Resources, TransactionData, TransactionMessage};

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------     PaymentKind      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    /// Charge immediately
    Sale,
    /// Authorize now, capture later
    Authorization,
}

impl Display for PaymentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentKind::Sale => write!(f, "sale"),
            PaymentKind::Authorization => write!(f, "authorization"),
        }
    }
}

impl FromStr for PaymentKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale" => Ok(Self::Sale),
            "authorization" => Ok(Self::Authorization),
            s => Err(ConversionError(format!("Invalid payment kind: {s}"))),
        }
    }
}

//--------------------------------------  PaymentSessionStatus  -------------------------------------------------------
/// The local view of where a payment session is in its lifecycle.
///
/// Transitions are ranked (see [`PaymentSessionStatus::rank`]). A session only ever moves to a status of equal or
/// higher rank, and never leaves a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentSessionStatus {
    Created,
    AuthorizationPending,
    PaymentPending,
    ChargePending,
    Authorized,
    Paid,
    PartiallyPaid,
    PartiallyRefunded,
    Refunded,
    Voided,
    Canceled,
}

impl PaymentSessionStatus {
    pub fn rank(&self) -> u8 {
        use PaymentSessionStatus::*;
        match self {
            Created => 0,
            AuthorizationPending | PaymentPending | ChargePending => 1,
            Authorized => 2,
            Paid | PartiallyPaid => 3,
            PartiallyRefunded => 4,
            Refunded | Voided | Canceled => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Refunded | Self::Voided | Self::Canceled)
    }

    /// Whether a session currently in `self` may move to `next`.
    ///
    /// Cancellation is only possible before the gateway has authorized or charged anything.
    pub fn can_transition_to(&self, next: PaymentSessionStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            PaymentSessionStatus::Canceled => self.rank() <= 1,
            next => next.rank() >= self.rank(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        use PaymentSessionStatus::*;
        match self {
            Created => "created",
            AuthorizationPending => "authorization_pending",
            PaymentPending => "payment_pending",
            ChargePending => "charge_pending",
            Authorized => "authorized",
            Paid => "paid",
            PartiallyPaid => "partially_paid",
            PartiallyRefunded => "partially_refunded",
            Refunded => "refunded",
            Voided => "voided",
            Canceled => "canceled",
        }
    }
}

impl Display for PaymentSessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentSessionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use PaymentSessionStatus::*;
        [
            Created,
            AuthorizationPending,
            PaymentPending,
            ChargePending,
            Authorized,
            Paid,
            PartiallyPaid,
            PartiallyRefunded,
            Refunded,
            Voided,
            Canceled,
        ]
        .into_iter()
        .find(|status| status.as_str() == s)
        .ok_or_else(|| ConversionError(format!("Invalid payment session status: {s}")))
    }
}

//--------------------------------------     SessionStatus     --------------------------------------------------------
/// How a session was settled with the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Resolve,
    Reject,
    Pending,
}

impl SessionStatus {
    /// Resolved and rejected sessions can never be settled again.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Resolve | Self::Reject)
    }
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Resolve => write!(f, "resolve"),
            SessionStatus::Reject => write!(f, "reject"),
            SessionStatus::Pending => write!(f, "pending"),
        }
    }
}

//--------------------------------------     CancelStatus      --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CancelStatus {
    Pending,
    Resolved,
}

impl Display for CancelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelStatus::Pending => write!(f, "PENDING"),
            CancelStatus::Resolved => write!(f, "RESOLVED"),
        }
    }
}

//--------------------------------------    LogMessageType     --------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LogMessageType {
    #[default]
    Info,
    Debug,
    Warn,
    Error,
}

impl Display for LogMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogMessageType::Info => write!(f, "INFO"),
            LogMessageType::Debug => write!(f, "DEBUG"),
            LogMessageType::Warn => write!(f, "WARN"),
            LogMessageType::Error => write!(f, "ERROR"),
        }
    }
}

//--------------------------------------  MarketplaceCustomer  --------------------------------------------------------
/// The buyer details the marketplace sends with a payment session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceCustomer {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub locale: Option<String>,
    pub billing_address: Option<MarketplaceAddress>,
    pub shipping_address: Option<MarketplaceAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceAddress {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub company: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
    #[serde(alias = "province_code")]
    pub state: Option<String>,
    pub country_code: Option<String>,
    #[serde(alias = "phone_number")]
    pub phone: Option<String>,
}

//--------------------------------------    PaymentSession     --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaymentSession {
    pub id: String,
    pub gid: String,
    pub group: String,
    pub amount: Amount,
    pub currency: String,
    pub test: bool,
    pub kind: PaymentKind,
    pub customer: MarketplaceCustomer,
    pub payment_method: Value,
    pub cancel_url: String,
    pub checkout_token: String,
    pub proposed_at: DateTime<Utc>,
    pub shop: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentSession {
    pub id: String,
    pub gid: String,
    #[sqlx(rename = "payment_group")]
    pub group: String,
    pub amount: Amount,
    pub currency: String,
    pub test: bool,
    pub kind: PaymentKind,
    #[sqlx(json)]
    pub customer: MarketplaceCustomer,
    #[sqlx(json)]
    pub payment_method: Value,
    pub cancel_url: String,
    pub checkout_token: String,
    pub proposed_at: DateTime<Utc>,
    pub shop: String,
    /// The gateway payment id. Set once, when the pay-page is created.
    pub pid: Option<String>,
    /// The gateway public key that was active when `pid` was assigned.
    pub public_key: Option<String>,
    pub status: PaymentSessionStatus,
    /// How the session was settled with the marketplace, if it has been.
    pub resolution: Option<SessionStatus>,
    pub resolution_redirect_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentSession {
    pub fn is_resumable(&self) -> bool {
        self.pid.is_some()
    }
}

//--------------------------------------    Child sessions     --------------------------------------------------------
/// The sessions a marketplace opens against an existing payment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildSessionKind {
    Capture,
    Refund,
    Void,
}

impl ChildSessionKind {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            ChildSessionKind::Capture => "capture_sessions",
            ChildSessionKind::Refund => "refund_sessions",
            ChildSessionKind::Void => "void_sessions",
        }
    }
}

impl Display for ChildSessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildSessionKind::Capture => write!(f, "capture"),
            ChildSessionKind::Refund => write!(f, "refund"),
            ChildSessionKind::Void => write!(f, "void"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCaptureSession {
    pub id: String,
    pub gid: String,
    pub payment_id: String,
    pub amount: Amount,
    pub currency: String,
    pub proposed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CaptureSession {
    pub id: String,
    pub gid: String,
    pub payment_id: String,
    pub amount: Amount,
    pub currency: String,
    pub proposed_at: DateTime<Utc>,
    pub status: Option<SessionStatus>,
    /// The gateway charge created for this capture
    pub charge_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRefundSession {
    pub id: String,
    pub gid: String,
    pub payment_id: String,
    pub amount: Amount,
    pub currency: String,
    pub proposed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RefundSession {
    pub id: String,
    pub gid: String,
    pub payment_id: String,
    pub amount: Amount,
    pub currency: String,
    pub proposed_at: DateTime<Utc>,
    pub status: Option<SessionStatus>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVoidSession {
    pub id: String,
    pub gid: String,
    pub payment_id: String,
    pub proposed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VoidSession {
    pub id: String,
    pub gid: String,
    pub payment_id: String,
    pub proposed_at: DateTime<Utc>,
    pub status: Option<SessionStatus>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  GatewayTransaction   --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Authorize,
    Charge,
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Authorize => write!(f, "authorize"),
            TransactionKind::Charge => write!(f, "charge"),
        }
    }
}

/// An immutable copy of an authorize or charge transaction as reported by the gateway.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GatewayTransaction {
    pub id: String,
    pub kind: TransactionKind,
    /// The payment session this transaction belongs to
    pub payment_id: String,
    pub pid: String,
    pub is_success: bool,
    pub is_pending: bool,
    pub is_resumed: bool,
    pub is_error: bool,
    pub card3ds: Option<bool>,
    pub redirect_url: Option<String>,
    #[sqlx(json)]
    pub message: Option<TransactionMessage>,
    pub amount: Option<Amount>,
    pub currency: Option<String>,
    pub date: Option<String>,
    #[sqlx(json)]
    pub resources: Resources,
    pub invoice_id: Option<String>,
    pub payment_reference: Option<String>,
    #[sqlx(json)]
    pub processing: Processing,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      UnzerCancel      --------------------------------------------------------
/// What a gateway cancel was issued for. A cancel either refunds a charge or voids an authorization, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelTarget {
    Refund { refund_id: String, charge_id: String },
    Void { void_id: String, authorize_id: String },
}

#[derive(Debug, Clone)]
pub struct NewUnzerCancel {
    pub payment_id: String,
    pub pid: String,
    pub target: CancelTarget,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UnzerCancel {
    pub id: i64,
    /// The gateway cancel id. Set when the cancel call returns.
    pub cancel_id: Option<String>,
    pub charge_id: Option<String>,
    pub authorize_id: Option<String>,
    pub payment_id: String,
    pub pid: String,
    pub refund_id: Option<String>,
    pub void_id: Option<String>,
    pub status: CancelStatus,
    /// The cancel transaction, once its webhook has been received
    #[sqlx(rename = "cancel_transaction")]
    #[sqlx(json)]
    pub transaction: Option<TransactionData>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UnzerCancel {
    pub fn target(&self) -> Option<CancelTarget> {
        match (&self.refund_id, &self.void_id) {
            (Some(refund_id), None) => Some(CancelTarget::Refund {
                refund_id: refund_id.clone(),
                charge_id: self.charge_id.clone().unwrap_or_default(),
            }),
            (None, Some(void_id)) => Some(CancelTarget::Void {
                void_id: void_id.clone(),
                authorize_id: self.authorize_id.clone().unwrap_or_default(),
            }),
            _ => None,
        }
    }
}

//--------------------------------------      PaymentLog       --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentLog {
    pub payment_id: String,
    pub log_type: LogMessageType,
    pub prefix: String,
    pub message: String,
    pub payload: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentLog {
    pub id: i64,
    pub payment_id: String,
    #[serde(rename = "type")]
    pub log_type: LogMessageType,
    pub prefix: String,
    pub message: String,
    pub payload: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    Configuration      --------------------------------------------------------
/// Merchant branding for the hosted pay-page, plus the locale the buyer sees it in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPageSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(flatten)]
    pub page: PayPageSettings,
}

/// Per-shop configuration. Keys and tokens are wrapped in [`Secret`] so that they never end up in logs.
#[derive(Debug, Clone)]
pub struct ShopConfiguration {
    pub shop: String,
    pub unzer_private_key: Option<Secret<String>>,
    pub unzer_public_key: Option<String>,
    pub excluded_payment_types: Vec<String>,
    pub payment_page_settings: Option<PaymentPageSettings>,
    pub access_token: Option<Secret<String>>,
    pub ready: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShopConfiguration {
    /// The private and public gateway keys, if both are set.
    pub fn gateway_keys(&self) -> Option<(&Secret<String>, &str)> {
        match (&self.unzer_private_key, &self.unzer_public_key) {
            (Some(private), Some(public)) if !private.reveal().is_empty() && !public.is_empty() => {
                Some((private, public.as_str()))
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ConfigurationRow {
    pub shop: String,
    pub unzer_private_key: Option<String>,
    pub unzer_public_key: Option<String>,
    #[sqlx(json)]
    pub excluded_payment_types: Vec<String>,
    #[sqlx(json)]
    pub payment_page_settings: Option<PaymentPageSettings>,
    pub access_token: Option<String>,
    pub ready: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ConfigurationRow> for ShopConfiguration {
    fn from(row: ConfigurationRow) -> Self {
        Self {
            shop: row.shop,
            unzer_private_key: row.unzer_private_key.map(Secret::new),
            unzer_public_key: row.unzer_public_key,
            excluded_payment_types: row.excluded_payment_types,
            payment_page_settings: row.payment_page_settings,
            access_token: row.access_token.map(Secret::new),
            ready: row.ready,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Changes to a shop's configuration. `None` leaves a value untouched. An empty key or token clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigurationUpdate {
    pub shop: String,
    pub unzer_private_key: Option<Secret<String>>,
    pub unzer_public_key: Option<String>,
    pub excluded_payment_types: Option<Vec<String>>,
    pub payment_page_settings: Option<PaymentPageSettings>,
    pub access_token: Option<Secret<String>>,
    pub ready: Option<bool>,
}

//--------------------------------------       Checkout        --------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutLine {
    #[serde(default)]
    pub key: String,
    pub quantity: i64,
    pub variant_price: Amount,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub discount_allocations: Vec<DiscountAllocation>,
    #[serde(default)]
    pub tax_lines: Vec<TaxLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountAllocation {
    pub amount: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxLine {
    pub rate: f64,
}

/// A snapshot of a marketplace checkout, keyed by its cart token. Used to build the gateway basket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkout {
    pub token: String,
    pub shop: String,
    pub lines: Vec<CheckoutLine>,
    pub total_price: Option<Amount>,
    pub subtotal_price: Option<Amount>,
    pub total_tax: Option<Amount>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct CheckoutRow {
    pub token: String,
    pub shop: String,
    #[sqlx(json)]
    pub lines: Vec<CheckoutLine>,
    pub total_price: Option<Amount>,
    pub subtotal_price: Option<Amount>,
    pub total_tax: Option<Amount>,
    pub currency: Option<String>,
}

impl From<CheckoutRow> for Checkout {
    fn from(row: CheckoutRow) -> Self {
        Self {
            token: row.token,
            shop: row.shop,
            lines: row.lines,
            total_price: row.total_price,
            subtotal_price: row.subtotal_price,
            total_tax: row.total_tax,
            currency: row.currency,
        }
    }
}
