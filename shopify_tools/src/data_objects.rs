use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{mutations, ShopifyApiError};

/// The four kinds of session the payments apps API asks an app to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Payment,
    Refund,
    Capture,
    Void,
}

impl SessionKind {
    pub fn resolve_mutation(&self) -> (&'static str, &'static str) {
        match self {
            Self::Payment => ("paymentSessionResolve", mutations::PAYMENT_SESSION_RESOLVE),
            Self::Refund => ("refundSessionResolve", mutations::REFUND_SESSION_RESOLVE),
            Self::Capture => ("captureSessionResolve", mutations::CAPTURE_SESSION_RESOLVE),
            Self::Void => ("voidSessionResolve", mutations::VOID_SESSION_RESOLVE),
        }
    }

    pub fn reject_mutation(&self) -> (&'static str, &'static str) {
        match self {
            Self::Payment => ("paymentSessionReject", mutations::PAYMENT_SESSION_REJECT),
            Self::Refund => ("refundSessionReject", mutations::REFUND_SESSION_REJECT),
            Self::Capture => ("captureSessionReject", mutations::CAPTURE_SESSION_REJECT),
            Self::Void => ("voidSessionReject", mutations::VOID_SESSION_REJECT),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Refund => "refund",
            Self::Capture => "capture",
            Self::Void => "void",
        }
    }
}

impl Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a payment session is left pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendReason {
    #[default]
    BuyerActionRequired,
    PartnerActionRequired,
    NetworkActionRequired,
}

impl PendReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuyerActionRequired => "BUYER_ACTION_REQUIRED",
            Self::PartnerActionRequired => "PARTNER_ACTION_REQUIRED",
            Self::NetworkActionRequired => "NETWORK_ACTION_REQUIRED",
        }
    }
}

impl Display for PendReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PendReason {
    type Err = ShopifyApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUYER_ACTION_REQUIRED" => Ok(Self::BuyerActionRequired),
            "PARTNER_ACTION_REQUIRED" => Ok(Self::PartnerActionRequired),
            "NETWORK_ACTION_REQUIRED" => Ok(Self::NetworkActionRequired),
            _ => Err(ShopifyApiError::InvalidOperation(format!("Unknown pending reason: {s}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectReason {
    pub code: String,
    pub merchant_message: String,
}

impl Default for RejectReason {
    fn default() -> Self {
        Self { code: "PROCESSING_ERROR".to_string(), merchant_message: "The session was rejected.".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

impl Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) if !field.is_empty() => write!(f, "{}: {}", field.join("."), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// The outcome of a successful resolve, reject or pend mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResolution {
    /// The GraphQL id of the session that was updated
    pub session_id: Option<String>,
    /// Where the buyer should be sent next. Only payment sessions carry one.
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentsAppConfiguration {
    pub external_handle: Option<String>,
    pub ready: bool,
}
