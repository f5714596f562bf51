use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};
use upg_common::{as_number, Amount};

//--------------------------------------   Shared resources   ---------------------------------------------------------

/// The bundle of resource ids the gateway attaches to payments and transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    pub customer_id: Option<String>,
    pub payment_id: Option<String>,
    pub basket_id: Option<String>,
    pub metadata_id: Option<String>,
    pub pay_page_id: Option<String>,
    pub trace_id: Option<String>,
    pub type_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Processing {
    pub unique_id: Option<String>,
    pub short_id: Option<String>,
    pub trace_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMessage {
    pub code: Option<String>,
    pub merchant: Option<String>,
    pub customer: Option<String>,
}

//--------------------------------------     Transactions     ---------------------------------------------------------

/// A single authorize, charge or cancel transaction, as returned by the transaction endpoints and by the
/// `retrieveUrl` of a webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    pub id: String,
    #[serde(default)]
    pub is_success: bool,
    #[serde(default)]
    pub is_pending: bool,
    #[serde(default)]
    pub is_resumed: bool,
    #[serde(default)]
    pub is_error: bool,
    pub card3ds: Option<bool>,
    pub redirect_url: Option<String>,
    pub message: Option<TransactionMessage>,
    pub amount: Option<Amount>,
    pub currency: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub resources: Resources,
    pub invoice_id: Option<String>,
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub processing: Processing,
}

/// Request body for a direct authorize or charge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(serialize_with = "as_number")]
    pub amount: Amount,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    pub resources: TransactionResources,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResources {
    pub type_id: String,
}

/// Optional amount for partial charges and cancels. When `amount` is `None`, the full remaining amount is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AmountRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
}

//--------------------------------------       Payments       ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStateName {
    Create,
    Pending,
    Completed,
    Canceled,
    Partly,
    #[serde(rename = "payment review")]
    PaymentReview,
    Chargeback,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentState {
    #[serde(default)]
    pub id: i64,
    pub name: PaymentStateName,
}

/// Summary of all amounts on a payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAmount {
    /// Initial amount reduced by cancellations during authorization
    #[serde(default)]
    pub total: Amount,
    #[serde(default)]
    pub charged: Amount,
    /// Refunded amount of all charges
    #[serde(default)]
    pub canceled: Amount,
    #[serde(default)]
    pub remaining: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTransaction {
    pub participant_id: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub status: Option<String>,
    pub url: Option<String>,
    pub amount: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    pub id: String,
    pub state: PaymentState,
    #[serde(default)]
    pub amount: PaymentAmount,
    pub currency: Option<String>,
    pub order_id: Option<String>,
    pub invoice_id: Option<String>,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default)]
    pub transactions: Vec<PaymentTransaction>,
}

//--------------------------------------       Pay page       ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayPageAction {
    Charge,
    Authorize,
}

impl PayPageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Charge => "charge",
            Self::Authorize => "authorize",
        }
    }
}

impl Display for PayPageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merchant branding shown on the hosted pay-page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPageSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_page_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_and_condition_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy_policy_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imprint_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPageResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basket_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPageRequest {
    #[serde(serialize_with = "as_number")]
    pub amount: Amount,
    pub currency: String,
    pub return_url: String,
    pub exclude_types: Vec<String>,
    #[serde(flatten)]
    pub settings: PayPageSettings,
    pub resources: PayPageResources,
    /// Filled in by [`crate::UnzerApi::create_pay_page`]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPage {
    pub id: String,
    pub redirect_url: String,
    #[serde(default)]
    pub resources: Resources,
}

//--------------------------------------  Customers & baskets ---------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub name: String,
    pub street: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub zip: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub lastname: String,
    pub firstname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketItem {
    pub basket_item_reference_id: String,
    pub quantity: i64,
    #[serde(serialize_with = "as_number")]
    pub vat: Amount,
    #[serde(serialize_with = "as_number")]
    pub amount_discount_per_unit_gross: Amount,
    #[serde(serialize_with = "as_number")]
    pub amount_per_unit_gross: Amount,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketData {
    #[serde(serialize_with = "as_number")]
    pub total_value_gross: Amount,
    pub currency_code: String,
    pub order_id: String,
    pub basket_items: Vec<BasketItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataData {
    pub shop_type: String,
    pub shop_version: String,
    pub plugin_version: String,
    pub plugin_type: String,
}

impl MetadataData {
    pub fn for_shop_version(shop_version: &str) -> Self {
        Self {
            shop_type: "Shopify".to_string(),
            shop_version: shop_version.to_string(),
            plugin_version: "1.0.0".to_string(),
            plugin_type: "unzerdev/shopify".to_string(),
        }
    }
}

/// The response of any create call that only needs to hand back the new resource id.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResourceId {
    pub id: String,
}

//--------------------------------------  Webhooks & keypair  ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEventData {
    pub id: String,
    pub url: String,
    pub event: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WebhookEvents {
    #[serde(default)]
    pub events: Vec<WebhookEventData>,
    #[serde(flatten)]
    pub single: Option<WebhookEventData>,
}

impl WebhookEvents {
    pub fn into_events(self) -> Vec<WebhookEventData> {
        let mut events = self.events;
        if let Some(single) = self.single {
            events.push(single);
        }
        events
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keypair {
    pub public_key: String,
    #[serde(default)]
    pub available_payment_types: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentType {
    #[serde(rename = "type")]
    pub payment_type: String,
    pub allow_customer_types: Option<String>,
    pub allow_credit_transaction: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodTypes {
    pub public_key: String,
    #[serde(default)]
    pub payment_types: Vec<PaymentType>,
}

/// Returns true if one of the given webhooks delivers to `url`.
pub fn find_app_webhook(webhooks: &[WebhookEventData], url: &str) -> bool {
    webhooks.iter().any(|w| w.url == url)
}
