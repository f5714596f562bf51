//! Capture, refund and void sessions.
//!
//! All three are inserted conditionally on their marketplace id, since the marketplace retries session requests.
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{
        CaptureSession,
        ChildSessionKind,
        NewCaptureSession,
        NewRefundSession,
        NewVoidSession,
        RefundSession,
        SessionStatus,
        VoidSession,
    },
    traits::{InsertResult, SessionStoreError},
};

pub async fn idempotent_insert_capture(
    session: NewCaptureSession,
    conn: &mut SqliteConnection,
) -> Result<InsertResult<CaptureSession>, SessionStoreError> {
    let id = session.id.clone();
    let payment_id = session.payment_id.clone();
    let inserted = sqlx::query_as(
        r#"
            INSERT INTO capture_sessions (id, gid, payment_id, amount, currency, proposed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(session.id)
    .bind(session.gid)
    .bind(session.payment_id)
    .bind(session.amount.value())
    .bind(session.currency)
    .bind(session.proposed_at)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| insert_error(e, &payment_id))?;
    match inserted {
        Some(capture) => {
            debug!("🗃️ Capture session [{id}] inserted");
            Ok(InsertResult::Inserted(capture))
        },
        None => existing(fetch_capture_session(&id, conn).await?, &id),
    }
}

pub async fn idempotent_insert_refund(
    session: NewRefundSession,
    conn: &mut SqliteConnection,
) -> Result<InsertResult<RefundSession>, SessionStoreError> {
    let id = session.id.clone();
    let payment_id = session.payment_id.clone();
    let inserted = sqlx::query_as(
        r#"
            INSERT INTO refund_sessions (id, gid, payment_id, amount, currency, proposed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(session.id)
    .bind(session.gid)
    .bind(session.payment_id)
    .bind(session.amount.value())
    .bind(session.currency)
    .bind(session.proposed_at)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| insert_error(e, &payment_id))?;
    match inserted {
        Some(refund) => {
            debug!("🗃️ Refund session [{id}] inserted");
            Ok(InsertResult::Inserted(refund))
        },
        None => existing(fetch_refund_session(&id, conn).await?, &id),
    }
}

pub async fn idempotent_insert_void(
    session: NewVoidSession,
    conn: &mut SqliteConnection,
) -> Result<InsertResult<VoidSession>, SessionStoreError> {
    let id = session.id.clone();
    let payment_id = session.payment_id.clone();
    let inserted = sqlx::query_as(
        r#"
            INSERT INTO void_sessions (id, gid, payment_id, proposed_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(session.id)
    .bind(session.gid)
    .bind(session.payment_id)
    .bind(session.proposed_at)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| insert_error(e, &payment_id))?;
    match inserted {
        Some(void) => {
            debug!("🗃️ Void session [{id}] inserted");
            Ok(InsertResult::Inserted(void))
        },
        None => existing(fetch_void_session(&id, conn).await?, &id),
    }
}

/// A child session for a payment session that does not exist trips the foreign key.
fn insert_error(e: sqlx::Error, payment_id: &str) -> SessionStoreError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            SessionStoreError::PaymentSessionNotFound(payment_id.to_string())
        },
        _ => SessionStoreError::from(e),
    }
}

fn existing<T>(session: Option<T>, id: &str) -> Result<InsertResult<T>, SessionStoreError> {
    debug!("🗃️ Session [{id}] already exists");
    session
        .map(InsertResult::AlreadyExists)
        .ok_or_else(|| SessionStoreError::InvalidRecord(format!("Session {id} vanished during insert")))
}

pub async fn fetch_capture_session(id: &str, conn: &mut SqliteConnection) -> Result<Option<CaptureSession>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM capture_sessions WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_refund_session(id: &str, conn: &mut SqliteConnection) -> Result<Option<RefundSession>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM refund_sessions WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_void_session(id: &str, conn: &mut SqliteConnection) -> Result<Option<VoidSession>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM void_sessions WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_captures_for_payment(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<CaptureSession>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM capture_sessions WHERE payment_id = $1 ORDER BY proposed_at")
        .bind(payment_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_refunds_for_payment(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<RefundSession>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM refund_sessions WHERE payment_id = $1 ORDER BY proposed_at")
        .bind(payment_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_voids_for_payment(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<VoidSession>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM void_sessions WHERE payment_id = $1 ORDER BY proposed_at")
        .bind(payment_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_latest_void_for_payment(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<VoidSession>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM void_sessions WHERE payment_id = $1 ORDER BY proposed_at DESC, created_at DESC LIMIT 1")
        .bind(payment_id)
        .fetch_optional(conn)
        .await
}

pub async fn set_capture_charge_id(
    id: &str,
    charge_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), SessionStoreError> {
    let result = sqlx::query("UPDATE capture_sessions SET charge_id = $1 WHERE id = $2")
        .bind(charge_id)
        .bind(id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(SessionStoreError::InvalidRecord(format!("Capture session {id} does not exist")));
    }
    Ok(())
}

/// Updates the status of a child session unless it has already been resolved or rejected.
pub async fn update_status(
    kind: ChildSessionKind,
    id: &str,
    status: SessionStatus,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "UPDATE {} SET status = $1 WHERE id = $2 AND (status IS NULL OR status = 'pending')",
        kind.table()
    );
    let result = sqlx::query(&sql).bind(status).bind(id).execute(conn).await?;
    let updated = result.rows_affected() == 1;
    if updated {
        debug!("🗃️ {kind} session [{id}] is now {status}");
    } else {
        debug!("🗃️ {kind} session [{id}] was not updated to {status}. It is unknown or already settled.");
    }
    Ok(updated)
}
