//! `SqliteDatabase` is the SQLite backend of the Unzer payment engine.
//!
//! It implements all the storage traits defined in the [`crate::traits`] module.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;
use unzer_tools::data_objects::TransactionData;

use super::db::{
    cancels,
    checkouts,
    child_sessions,
    configurations,
    db_url,
    new_pool,
    payment_logs,
    payment_sessions,
    transactions,
};
use crate::{
    db_types::{
        CaptureSession,
        Checkout,
        ChildSessionKind,
        ConfigurationUpdate,
        GatewayTransaction,
        NewCaptureSession,
        NewPaymentLog,
        NewPaymentSession,
        NewRefundSession,
        NewUnzerCancel,
        NewVoidSession,
        PaymentLog,
        PaymentSession,
        PaymentSessionStatus,
        RefundSession,
        SessionStatus,
        ShopConfiguration,
        TransactionKind,
        UnzerCancel,
        VoidSession,
    },
    traits::{
        CheckoutStore,
        ConfigurationStore,
        ConfigurationStoreError,
        InsertResult,
        PaymentLogStore,
        SessionStore,
        SessionStoreError,
    },
};

/// Number of times a guarded status write is retried when a concurrent writer changed the status underneath it.
const STATUS_UPDATE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SessionStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn upsert_payment_session(
        &self,
        session: NewPaymentSession,
    ) -> Result<InsertResult<PaymentSession>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        payment_sessions::idempotent_insert(session, &mut conn).await
    }

    async fn fetch_payment_session(&self, id: &str) -> Result<Option<PaymentSession>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let session = payment_sessions::fetch_payment_session(id, &mut conn).await?;
        Ok(session)
    }

    async fn fetch_payment_session_by_pid(
        &self,
        pid: &str,
        public_key: &str,
    ) -> Result<Option<PaymentSession>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let session = payment_sessions::fetch_payment_session_by_pid(pid, public_key, &mut conn).await?;
        Ok(session)
    }

    async fn list_payment_sessions(
        &self,
        shop: &str,
        page: u32,
        page_size: u32,
    ) -> Result<(i64, Vec<PaymentSession>), SessionStoreError> {
        let mut tx = self.pool.begin().await?;
        let count = payment_sessions::count_payment_sessions(shop, &mut tx).await?;
        let sessions = payment_sessions::fetch_payment_sessions_page(shop, page, page_size, &mut tx).await?;
        tx.commit().await?;
        Ok((count, sessions))
    }

    async fn assign_pid(&self, id: &str, pid: &str, public_key: &str) -> Result<bool, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let assigned = payment_sessions::assign_pid(id, pid, public_key, &mut conn).await?;
        if assigned {
            debug!("🗃️ Payment session [{id}] is now gateway payment {pid}");
        } else {
            warn!("🗃️ Payment session [{id}] already has a gateway payment. {pid} was not stored.");
        }
        Ok(assigned)
    }

    /// The status is read and then swapped with a compare-and-set. If another writer got in between, the read is
    /// repeated, so concurrent webhooks converge on the highest ranked status.
    async fn update_payment_status(
        &self,
        id: &str,
        status: PaymentSessionStatus,
    ) -> Result<Option<PaymentSessionStatus>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        for _ in 0..STATUS_UPDATE_ATTEMPTS {
            let current = payment_sessions::fetch_status(id, &mut conn)
                .await?
                .ok_or_else(|| SessionStoreError::PaymentSessionNotFound(id.to_string()))?;
            if current == status {
                trace!("🗃️ Payment session [{id}] is already {status}");
                return Ok(Some(status));
            }
            if !current.can_transition_to(status) {
                debug!("🗃️ Payment session [{id}] cannot move from {current} to {status}. Ignoring the update.");
                return Ok(None);
            }
            if payment_sessions::swap_status(id, current, status, &mut conn).await? {
                info!("🗃️ Payment session [{id}] status: {current} -> {status}");
                return Ok(Some(status));
            }
        }
        warn!("🗃️ Could not update payment session [{id}] to {status}. The status kept changing.");
        Ok(None)
    }

    async fn record_resolution(
        &self,
        id: &str,
        resolution: SessionStatus,
        redirect_url: Option<&str>,
    ) -> Result<(), SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        payment_sessions::record_resolution(id, resolution, redirect_url, &mut conn).await
    }

    async fn insert_capture_session(
        &self,
        session: NewCaptureSession,
    ) -> Result<InsertResult<CaptureSession>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        child_sessions::idempotent_insert_capture(session, &mut conn).await
    }

    async fn fetch_capture_session(&self, id: &str) -> Result<Option<CaptureSession>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let session = child_sessions::fetch_capture_session(id, &mut conn).await?;
        Ok(session)
    }

    async fn set_capture_charge_id(&self, id: &str, charge_id: &str) -> Result<(), SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        child_sessions::set_capture_charge_id(id, charge_id, &mut conn).await
    }

    async fn insert_refund_session(
        &self,
        session: NewRefundSession,
    ) -> Result<InsertResult<RefundSession>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        child_sessions::idempotent_insert_refund(session, &mut conn).await
    }

    async fn fetch_refund_session(&self, id: &str) -> Result<Option<RefundSession>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let session = child_sessions::fetch_refund_session(id, &mut conn).await?;
        Ok(session)
    }

    async fn insert_void_session(
        &self,
        session: NewVoidSession,
    ) -> Result<InsertResult<VoidSession>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        child_sessions::idempotent_insert_void(session, &mut conn).await
    }

    async fn fetch_void_session(&self, id: &str) -> Result<Option<VoidSession>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let session = child_sessions::fetch_void_session(id, &mut conn).await?;
        Ok(session)
    }

    async fn fetch_void_session_for_payment(
        &self,
        payment_id: &str,
    ) -> Result<Option<VoidSession>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let session = child_sessions::fetch_latest_void_for_payment(payment_id, &mut conn).await?;
        Ok(session)
    }

    async fn update_child_session_status(
        &self,
        kind: ChildSessionKind,
        id: &str,
        status: SessionStatus,
    ) -> Result<bool, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let updated = child_sessions::update_status(kind, id, status, &mut conn).await?;
        Ok(updated)
    }

    async fn fetch_captures_for_payment(&self, payment_id: &str) -> Result<Vec<CaptureSession>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let sessions = child_sessions::fetch_captures_for_payment(payment_id, &mut conn).await?;
        Ok(sessions)
    }

    async fn fetch_refunds_for_payment(&self, payment_id: &str) -> Result<Vec<RefundSession>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let sessions = child_sessions::fetch_refunds_for_payment(payment_id, &mut conn).await?;
        Ok(sessions)
    }

    async fn fetch_voids_for_payment(&self, payment_id: &str) -> Result<Vec<VoidSession>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let sessions = child_sessions::fetch_voids_for_payment(payment_id, &mut conn).await?;
        Ok(sessions)
    }

    async fn insert_transaction(
        &self,
        kind: TransactionKind,
        payment_id: &str,
        pid: &str,
        transaction: &TransactionData,
    ) -> Result<InsertResult<GatewayTransaction>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        transactions::idempotent_insert(kind, payment_id, pid, transaction, &mut conn).await
    }

    async fn fetch_transactions(&self, payment_id: &str) -> Result<Vec<GatewayTransaction>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let mirrors = transactions::fetch_transactions_for_payment(payment_id, &mut conn).await?;
        Ok(mirrors)
    }

    async fn insert_cancel(&self, cancel: NewUnzerCancel) -> Result<InsertResult<UnzerCancel>, SessionStoreError> {
        let mut tx = self.pool.begin().await?;
        let result = cancels::idempotent_insert(cancel, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn set_cancel_id(&self, id: i64, cancel_id: &str) -> Result<(), SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        cancels::set_cancel_id(id, cancel_id, &mut conn).await
    }

    async fn fetch_cancel(&self, pid: &str, cancel_id: &str) -> Result<Option<UnzerCancel>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let cancel = cancels::fetch_cancel(pid, cancel_id, &mut conn).await?;
        Ok(cancel)
    }

    async fn fetch_unassigned_cancel(
        &self,
        pid: &str,
        kind: TransactionKind,
        transaction_id: &str,
    ) -> Result<Option<UnzerCancel>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let mut cancels = cancels::fetch_unassigned_cancels(pid, kind, transaction_id, &mut conn).await?;
        if cancels.len() > 1 {
            warn!("🗃️ {} pending cancels for {kind} {transaction_id} on {pid}. Cannot tell them apart", cancels.len());
            return Ok(None);
        }
        Ok(cancels.pop())
    }

    async fn resolve_cancel(&self, id: i64, transaction: &TransactionData) -> Result<bool, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let resolved = cancels::resolve_cancel(id, transaction, &mut conn).await?;
        if resolved {
            debug!("🗃️ Cancel #{id} resolved");
        }
        Ok(resolved)
    }

    async fn fetch_cancels(&self, payment_id: &str) -> Result<Vec<UnzerCancel>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = cancels::fetch_cancels_for_payment(payment_id, &mut conn).await?;
        Ok(result)
    }
}

impl PaymentLogStore for SqliteDatabase {
    async fn append_log(&self, entry: NewPaymentLog) -> Result<PaymentLog, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let log = payment_logs::insert_log(entry, &mut conn).await?;
        Ok(log)
    }

    async fn fetch_logs(&self, payment_id: &str) -> Result<Vec<PaymentLog>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let logs = payment_logs::fetch_logs_for_payment(payment_id, &mut conn).await?;
        Ok(logs)
    }
}

impl CheckoutStore for SqliteDatabase {
    async fn upsert_checkout(&self, checkout: Checkout) -> Result<(), SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        checkouts::upsert_checkout(checkout, &mut conn).await?;
        Ok(())
    }

    async fn fetch_checkout(&self, token: &str) -> Result<Option<Checkout>, SessionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let checkout = checkouts::fetch_checkout(token, &mut conn).await?;
        Ok(checkout)
    }
}

impl ConfigurationStore for SqliteDatabase {
    async fn fetch_configuration(&self, shop: &str) -> Result<Option<ShopConfiguration>, ConfigurationStoreError> {
        let mut conn = self.pool.acquire().await?;
        let config = configurations::fetch_configuration(shop, &mut conn).await?;
        Ok(config)
    }

    async fn upsert_configuration(
        &self,
        update: ConfigurationUpdate,
    ) -> Result<ShopConfiguration, ConfigurationStoreError> {
        let mut tx = self.pool.begin().await?;
        let config = configurations::upsert_configuration(update, &mut tx).await?;
        tx.commit().await?;
        Ok(config)
    }

    async fn uninstall(&self, shop: &str) -> Result<bool, ConfigurationStoreError> {
        let mut conn = self.pool.acquire().await?;
        let uninstalled = configurations::uninstall(shop, &mut conn).await?;
        if uninstalled {
            info!("🗃️ {shop} has been uninstalled");
        }
        Ok(uninstalled)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
