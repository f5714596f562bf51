use thiserror::Error;
use unzer_tools::data_objects::TransactionData;

use crate::{
    db_types::{
        CaptureSession,
        Checkout,
        ChildSessionKind,
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
        TransactionKind,
        UnzerCancel,
        VoidSession,
    },
    traits::InsertResult,
};

#[derive(Debug, Clone, Error)]
pub enum SessionStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Payment session {0} does not exist")]
    PaymentSessionNotFound(String),
    #[error("The record could not be stored. {0}")]
    InvalidRecord(String),
}

impl From<sqlx::Error> for SessionStoreError {
    fn from(e: sqlx::Error) -> Self {
        SessionStoreError::DatabaseError(e.to_string())
    }
}

/// The durable record of payment sessions and everything that hangs off them.
///
/// Implementations must make the following writes safe to repeat, since both the marketplace and the gateway
/// redeliver requests:
/// * payment and child session inserts are keyed on the marketplace id,
/// * transaction mirrors are keyed on `(pid, kind, gateway transaction id)`,
/// * cancel rows are keyed on the refund or void session that caused them.
#[allow(async_fn_in_trait)]
pub trait SessionStore: Clone {
    fn url(&self) -> &str;

    /// Stores a new payment session with status `created`. If a session with the same id exists, it is returned
    /// unchanged.
    async fn upsert_payment_session(
        &self,
        session: NewPaymentSession,
    ) -> Result<InsertResult<PaymentSession>, SessionStoreError>;

    async fn fetch_payment_session(&self, id: &str) -> Result<Option<PaymentSession>, SessionStoreError>;

    /// Fetches the payment session the gateway knows as `pid`, created while `public_key` was the active key.
    async fn fetch_payment_session_by_pid(
        &self,
        pid: &str,
        public_key: &str,
    ) -> Result<Option<PaymentSession>, SessionStoreError>;

    /// Returns the total number of sessions for the shop, and the requested page, newest first. Pages start at 1.
    async fn list_payment_sessions(
        &self,
        shop: &str,
        page: u32,
        page_size: u32,
    ) -> Result<(i64, Vec<PaymentSession>), SessionStoreError>;

    /// Sets the gateway payment id and public key on the session. This only succeeds once. Returns `false` if the
    /// session already had a pid.
    async fn assign_pid(&self, id: &str, pid: &str, public_key: &str) -> Result<bool, SessionStoreError>;

    /// Moves the payment session to `status` if the transition is allowed by
    /// [`PaymentSessionStatus::can_transition_to`]. Returns the new status if it was applied, or `None` if the
    /// transition was refused.
    async fn update_payment_status(
        &self,
        id: &str,
        status: PaymentSessionStatus,
    ) -> Result<Option<PaymentSessionStatus>, SessionStoreError>;

    /// Records how the payment session was settled with the marketplace.
    async fn record_resolution(
        &self,
        id: &str,
        resolution: SessionStatus,
        redirect_url: Option<&str>,
    ) -> Result<(), SessionStoreError>;

    async fn insert_capture_session(
        &self,
        session: NewCaptureSession,
    ) -> Result<InsertResult<CaptureSession>, SessionStoreError>;

    async fn fetch_capture_session(&self, id: &str) -> Result<Option<CaptureSession>, SessionStoreError>;

    async fn set_capture_charge_id(&self, id: &str, charge_id: &str) -> Result<(), SessionStoreError>;

    async fn insert_refund_session(
        &self,
        session: NewRefundSession,
    ) -> Result<InsertResult<RefundSession>, SessionStoreError>;

    async fn fetch_refund_session(&self, id: &str) -> Result<Option<RefundSession>, SessionStoreError>;

    async fn insert_void_session(&self, session: NewVoidSession)
        -> Result<InsertResult<VoidSession>, SessionStoreError>;

    async fn fetch_void_session(&self, id: &str) -> Result<Option<VoidSession>, SessionStoreError>;

    /// The most recent void session for the payment, if there is one.
    async fn fetch_void_session_for_payment(&self, payment_id: &str)
        -> Result<Option<VoidSession>, SessionStoreError>;

    /// Sets the status of a capture, refund or void session, unless it has already been resolved or rejected.
    /// Returns `true` if the status was changed.
    async fn update_child_session_status(
        &self,
        kind: ChildSessionKind,
        id: &str,
        status: SessionStatus,
    ) -> Result<bool, SessionStoreError>;

    async fn fetch_captures_for_payment(&self, payment_id: &str) -> Result<Vec<CaptureSession>, SessionStoreError>;

    async fn fetch_refunds_for_payment(&self, payment_id: &str) -> Result<Vec<RefundSession>, SessionStoreError>;

    async fn fetch_voids_for_payment(&self, payment_id: &str) -> Result<Vec<VoidSession>, SessionStoreError>;

    /// Stores a mirror of a gateway authorize or charge transaction. A second call for the same transaction returns
    /// the existing mirror.
    async fn insert_transaction(
        &self,
        kind: TransactionKind,
        payment_id: &str,
        pid: &str,
        transaction: &TransactionData,
    ) -> Result<InsertResult<GatewayTransaction>, SessionStoreError>;

    /// All transaction mirrors for the payment session, oldest first.
    async fn fetch_transactions(&self, payment_id: &str) -> Result<Vec<GatewayTransaction>, SessionStoreError>;

    /// Stores a new `PENDING` cancel. If a cancel already exists for the same refund or void session, that cancel is
    /// returned instead.
    async fn insert_cancel(&self, cancel: NewUnzerCancel) -> Result<InsertResult<UnzerCancel>, SessionStoreError>;

    async fn set_cancel_id(&self, id: i64, cancel_id: &str) -> Result<(), SessionStoreError>;

    async fn fetch_cancel(&self, pid: &str, cancel_id: &str) -> Result<Option<UnzerCancel>, SessionStoreError>;

    /// The pending cancel of the given charge or authorization whose gateway call has not returned yet. Only a single
    /// match is returned; `None` if there are none or several.
    async fn fetch_unassigned_cancel(
        &self,
        pid: &str,
        kind: TransactionKind,
        transaction_id: &str,
    ) -> Result<Option<UnzerCancel>, SessionStoreError>;

    /// Marks a pending cancel as `RESOLVED` and stores the cancel transaction. Returns `false` if the cancel was
    /// already resolved.
    async fn resolve_cancel(&self, id: i64, transaction: &TransactionData) -> Result<bool, SessionStoreError>;

    async fn fetch_cancels(&self, payment_id: &str) -> Result<Vec<UnzerCancel>, SessionStoreError>;
}

/// The append-only audit trail for payment sessions.
#[allow(async_fn_in_trait)]
pub trait PaymentLogStore: Clone {
    async fn append_log(&self, entry: NewPaymentLog) -> Result<PaymentLog, SessionStoreError>;

    /// All log entries for the payment session, oldest first.
    async fn fetch_logs(&self, payment_id: &str) -> Result<Vec<PaymentLog>, SessionStoreError>;
}

#[allow(async_fn_in_trait)]
pub trait CheckoutStore: Clone {
    /// Inserts the checkout, or replaces the one with the same token.
    async fn upsert_checkout(&self, checkout: Checkout) -> Result<(), SessionStoreError>;

    async fn fetch_checkout(&self, token: &str) -> Result<Option<Checkout>, SessionStoreError>;
}

/// Everything the payment flows and webhooks need from storage. Implemented for any type that provides all of it.
pub trait PaymentStore: SessionStore + PaymentLogStore + CheckoutStore + crate::traits::ConfigurationStore {}

impl<T> PaymentStore for T where T: SessionStore + PaymentLogStore + CheckoutStore + crate::traits::ConfigurationStore {}
