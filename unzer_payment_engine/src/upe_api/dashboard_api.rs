use std::fmt::Debug;

use crate::{
    traits::{PaymentLogStore, SessionStore},
    upe_api::{
        errors::DashboardApiError,
        payment_objects::{PaymentDetails, PaymentSessionPage},
    },
};

pub const MAX_PAGE_SIZE: u32 = 100;

/// Read-only views of the payment sessions for the merchant dashboard.
pub struct DashboardApi<B> {
    db: B,
}

impl<B> Debug for DashboardApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DashboardApi")
    }
}

impl<B> DashboardApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> DashboardApi<B>
where B: SessionStore + PaymentLogStore
{
    /// A page of the shop's payment sessions, newest first. Pages start at 1.
    pub async fn payment_sessions(
        &self,
        shop: &str,
        page: u32,
        page_size: u32,
    ) -> Result<PaymentSessionPage, DashboardApiError> {
        if page == 0 {
            return Err(DashboardApiError::QueryError("Pages start at 1".into()));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(DashboardApiError::QueryError(format!("The page size must be between 1 and {MAX_PAGE_SIZE}")));
        }
        let (count, payment_sessions) = self.db.list_payment_sessions(shop, page, page_size).await?;
        Ok(PaymentSessionPage { count, page, page_size, payment_sessions })
    }

    /// The payment session and everything recorded against it. `None` if there is no such session.
    pub async fn payment_details(&self, payment_id: &str) -> Result<Option<PaymentDetails>, DashboardApiError> {
        let Some(payment_session) = self.db.fetch_payment_session(payment_id).await? else {
            return Ok(None);
        };
        let details = PaymentDetails {
            payment_session,
            captures: self.db.fetch_captures_for_payment(payment_id).await?,
            refunds: self.db.fetch_refunds_for_payment(payment_id).await?,
            voids: self.db.fetch_voids_for_payment(payment_id).await?,
            transactions: self.db.fetch_transactions(payment_id).await?,
            cancels: self.db.fetch_cancels(payment_id).await?,
            logs: self.db.fetch_logs(payment_id).await?,
        };
        Ok(Some(details))
    }
}
