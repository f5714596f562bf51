use chrono::Utc;
use log::{debug, trace};
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{NewPaymentSession, PaymentSession, PaymentSessionStatus, SessionStatus},
    traits::{InsertResult, SessionStoreError},
};

/// Inserts the payment session, unless a session with the same id already exists, in which case the existing session
/// is returned.
pub async fn idempotent_insert(
    session: NewPaymentSession,
    conn: &mut SqliteConnection,
) -> Result<InsertResult<PaymentSession>, SessionStoreError> {
    let id = session.id.clone();
    match insert_payment_session(session, conn).await? {
        Some(session) => {
            debug!("🗃️ Payment session [{id}] inserted");
            Ok(InsertResult::Inserted(session))
        },
        None => {
            let existing = fetch_payment_session(&id, conn)
                .await?
                .ok_or_else(|| SessionStoreError::PaymentSessionNotFound(id.clone()))?;
            debug!("🗃️ Payment session [{id}] already exists");
            Ok(InsertResult::AlreadyExists(existing))
        },
    }
}

/// Returns `None` if a session with the same id already exists.
async fn insert_payment_session(
    session: NewPaymentSession,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentSession>, sqlx::Error> {
    let result = sqlx::query_as(
        r#"
            INSERT INTO payment_sessions (
                id,
                gid,
                payment_group,
                amount,
                currency,
                test,
                kind,
                customer,
                payment_method,
                cancel_url,
                checkout_token,
                proposed_at,
                shop
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(session.id)
    .bind(session.gid)
    .bind(session.group)
    .bind(session.amount.value())
    .bind(session.currency)
    .bind(session.test)
    .bind(session.kind)
    .bind(Json(session.customer))
    .bind(Json(session.payment_method))
    .bind(session.cancel_url)
    .bind(session.checkout_token)
    .bind(session.proposed_at)
    .bind(session.shop)
    .fetch_optional(conn)
    .await?;
    Ok(result)
}

pub async fn fetch_payment_session(id: &str, conn: &mut SqliteConnection) -> Result<Option<PaymentSession>, sqlx::Error> {
    let session = sqlx::query_as("SELECT * FROM payment_sessions WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(session)
}

pub async fn fetch_payment_session_by_pid(
    pid: &str,
    public_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentSession>, sqlx::Error> {
    let session = sqlx::query_as("SELECT * FROM payment_sessions WHERE pid = $1 AND public_key = $2")
        .bind(pid)
        .bind(public_key)
        .fetch_optional(conn)
        .await?;
    Ok(session)
}

pub async fn count_payment_sessions(shop: &str, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM payment_sessions WHERE shop = $1")
        .bind(shop)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// Fetches a page of payment sessions for the shop, newest first. `page` starts at 1.
pub async fn fetch_payment_sessions_page(
    shop: &str,
    page: u32,
    page_size: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentSession>, sqlx::Error> {
    let offset = i64::from(page.max(1) - 1) * i64::from(page_size);
    let sessions = sqlx::query_as(
        "SELECT * FROM payment_sessions WHERE shop = $1 ORDER BY proposed_at DESC, created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(shop)
    .bind(i64::from(page_size))
    .bind(offset)
    .fetch_all(conn)
    .await?;
    Ok(sessions)
}

/// Sets the pid and public key, but only if the session does not have a pid yet. Returns `true` if the row was
/// updated.
pub async fn assign_pid(
    id: &str,
    pid: &str,
    public_key: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payment_sessions SET pid = $1, public_key = $2, updated_at = $3 WHERE id = $4 AND pid IS NULL",
    )
    .bind(pid)
    .bind(public_key)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn fetch_status(id: &str, conn: &mut SqliteConnection) -> Result<Option<PaymentSessionStatus>, sqlx::Error> {
    let status = sqlx::query_scalar("SELECT status FROM payment_sessions WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(status)
}

/// Compare-and-set on the status column. Returns `false` if the status was no longer `from` when the update ran.
pub async fn swap_status(
    id: &str,
    from: PaymentSessionStatus,
    to: PaymentSessionStatus,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE payment_sessions SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4")
        .bind(to)
        .bind(Utc::now())
        .bind(id)
        .bind(from)
        .execute(conn)
        .await?;
    trace!("🗃️ Status swap {from} -> {to} for [{id}]: {} rows", result.rows_affected());
    Ok(result.rows_affected() == 1)
}

pub async fn record_resolution(
    id: &str,
    resolution: SessionStatus,
    redirect_url: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), SessionStoreError> {
    let result = sqlx::query(
        "UPDATE payment_sessions SET resolution = $1, resolution_redirect_url = $2, updated_at = $3 WHERE id = $4",
    )
    .bind(resolution)
    .bind(redirect_url)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(SessionStoreError::PaymentSessionNotFound(id.to_string()));
    }
    debug!("🗃️ Payment session [{id}] marked as {resolution}");
    Ok(())
}
