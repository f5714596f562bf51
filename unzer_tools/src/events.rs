use std::{fmt::Display, str::FromStr};

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown webhook event: {0}")]
pub struct UnknownEventError(pub String);

macro_rules! unzer_events {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// The closed set of webhook event names the gateway can deliver.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum UnzerEvent {
            $($variant,)+
        }

        impl UnzerEvent {
            pub const ALL: &'static [UnzerEvent] = &[$(UnzerEvent::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(UnzerEvent::$variant => $name,)+
                }
            }
        }

        impl FromStr for UnzerEvent {
            type Err = UnknownEventError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(UnzerEvent::$variant),)+
                    _ => Err(UnknownEventError(s.to_string())),
                }
            }
        }
    };
}

unzer_events! {
    Types => "types",
    Authorize => "authorize",
    AuthorizeSucceeded => "authorize.succeeded",
    AuthorizePending => "authorize.pending",
    AuthorizeFailed => "authorize.failed",
    AuthorizeCanceled => "authorize.canceled",
    Charge => "charge",
    ChargeSucceeded => "charge.succeeded",
    ChargeFailed => "charge.failed",
    ChargePending => "charge.pending",
    ChargeCanceled => "charge.canceled",
    Chargeback => "chargeback",
    Customer => "customer",
    CustomerCreated => "customer.created",
    CustomerDeleted => "customer.deleted",
    CustomerUpdated => "customer.updated",
    BasketCreated => "basket.created",
    BasketUsed => "basket.used",
    Payment => "payment",
    PaymentPending => "payment.pending",
    PaymentCompleted => "payment.completed",
    PaymentCanceled => "payment.canceled",
    PaymentPartly => "payment.partly",
    PaymentReview => "payment.payment_review",
    PaymentChargeback => "payment.chargeback",
    Shipment => "shipment",
    Payout => "payout",
    PayoutSucceeded => "payout.succeeded",
    PayoutFailed => "payout.failed",
}

impl Display for UnzerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
