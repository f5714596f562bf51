use std::fmt::Display;

use unzer_tools::data_objects::{PaymentData, PaymentStateName};

/// A coarse summary of a gateway payment, used when the buyer comes back from the pay-page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Created,
    Canceled,
    Pending,
    Success,
    Completed,
}

impl TransactionStatus {
    /// Only these statuses allow the payment session to be resolved with the marketplace.
    pub fn can_resolve(&self) -> bool {
        matches!(self, Self::Pending | Self::Success | Self::Completed)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionStatus::Created => "CREATED",
            TransactionStatus::Canceled => "CANCELED",
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Completed => "COMPLETED",
        };
        f.write_str(s)
    }
}

pub fn transaction_status(payment: &PaymentData) -> TransactionStatus {
    match payment.state.name {
        PaymentStateName::Create => TransactionStatus::Created,
        PaymentStateName::Canceled => TransactionStatus::Canceled,
        PaymentStateName::Pending => {
            let first = payment.transactions.first().and_then(|t| t.status.as_deref());
            if first == Some("success") {
                TransactionStatus::Success
            } else {
                TransactionStatus::Pending
            }
        },
        _ => TransactionStatus::Completed,
    }
}
