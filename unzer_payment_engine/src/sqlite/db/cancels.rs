//! Correlation rows linking a gateway cancel to the refund or void session that requested it.
use chrono::Utc;
use log::debug;
use sqlx::{types::Json, SqliteConnection};
use unzer_tools::data_objects::TransactionData;

use crate::{
    db_types::{CancelTarget, NewUnzerCancel, TransactionKind, UnzerCancel},
    traits::{InsertResult, SessionStoreError},
};

/// Inserts a `PENDING` cancel, unless one already exists for the same refund or void session. This is not atomic,
/// so run it inside a transaction.
pub async fn idempotent_insert(
    cancel: NewUnzerCancel,
    conn: &mut SqliteConnection,
) -> Result<InsertResult<UnzerCancel>, SessionStoreError> {
    if let Some(existing) = fetch_cancel_for_target(&cancel.target, conn).await? {
        debug!("🗃️ Cancel #{} already exists for {:?}", existing.id, cancel.target);
        return Ok(InsertResult::AlreadyExists(existing));
    }
    let (charge_id, authorize_id, refund_id, void_id) = match cancel.target {
        CancelTarget::Refund { refund_id, charge_id } => (Some(charge_id), None, Some(refund_id), None),
        CancelTarget::Void { void_id, authorize_id } => (None, Some(authorize_id), None, Some(void_id)),
    };
    let inserted: UnzerCancel = sqlx::query_as(
        r#"
            INSERT INTO unzer_cancels (charge_id, authorize_id, payment_id, pid, refund_id, void_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(charge_id)
    .bind(authorize_id)
    .bind(cancel.payment_id)
    .bind(cancel.pid)
    .bind(refund_id)
    .bind(void_id)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Cancel #{} inserted for payment session [{}]", inserted.id, inserted.payment_id);
    Ok(InsertResult::Inserted(inserted))
}

pub async fn fetch_cancel_for_target(
    target: &CancelTarget,
    conn: &mut SqliteConnection,
) -> Result<Option<UnzerCancel>, sqlx::Error> {
    let (sql, id) = match target {
        CancelTarget::Refund { refund_id, .. } => ("SELECT * FROM unzer_cancels WHERE refund_id = $1", refund_id),
        CancelTarget::Void { void_id, .. } => ("SELECT * FROM unzer_cancels WHERE void_id = $1", void_id),
    };
    sqlx::query_as(sql).bind(id).fetch_optional(conn).await
}

pub async fn set_cancel_id(id: i64, cancel_id: &str, conn: &mut SqliteConnection) -> Result<(), SessionStoreError> {
    let result = sqlx::query("UPDATE unzer_cancels SET cancel_id = $1, updated_at = $2 WHERE id = $3")
        .bind(cancel_id)
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(SessionStoreError::InvalidRecord(format!("Cancel #{id} does not exist")));
    }
    debug!("🗃️ Cancel #{id} is gateway cancel {cancel_id}");
    Ok(())
}

pub async fn fetch_cancel(
    pid: &str,
    cancel_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<UnzerCancel>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM unzer_cancels WHERE pid = $1 AND cancel_id = $2")
        .bind(pid)
        .bind(cancel_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_unassigned_cancels(
    pid: &str,
    kind: TransactionKind,
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<UnzerCancel>, sqlx::Error> {
    let sql = match kind {
        TransactionKind::Charge => {
            "SELECT * FROM unzer_cancels WHERE pid = $1 AND charge_id = $2 AND cancel_id IS NULL AND status = 'PENDING'"
        },
        TransactionKind::Authorize => {
            "SELECT * FROM unzer_cancels WHERE pid = $1 AND authorize_id = $2 AND cancel_id IS NULL AND status = \
             'PENDING'"
        },
    };
    sqlx::query_as(sql).bind(pid).bind(transaction_id).fetch_all(conn).await
}

/// Moves a pending cancel to `RESOLVED`, storing the cancel transaction. Returns `false` if it was already resolved.
pub async fn resolve_cancel(
    id: i64,
    transaction: &TransactionData,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE unzer_cancels SET status = 'RESOLVED', cancel_transaction = $1, updated_at = $2
        WHERE id = $3 AND status = 'PENDING'"#,
    )
    .bind(Json(transaction))
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn fetch_cancels_for_payment(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<UnzerCancel>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM unzer_cancels WHERE payment_id = $1 ORDER BY id")
        .bind(payment_id)
        .fetch_all(conn)
        .await
}
