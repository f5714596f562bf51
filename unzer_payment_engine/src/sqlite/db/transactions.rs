use log::debug;
use sqlx::{types::Json, SqliteConnection};
use unzer_tools::data_objects::TransactionData;

use crate::{
    db_types::{GatewayTransaction, TransactionKind},
    traits::{InsertResult, SessionStoreError},
};

/// Stores the gateway transaction. Redelivered webhooks hit the `(pid, kind, id)` key and get the stored mirror back.
pub async fn idempotent_insert(
    kind: TransactionKind,
    payment_id: &str,
    pid: &str,
    tx: &TransactionData,
    conn: &mut SqliteConnection,
) -> Result<InsertResult<GatewayTransaction>, SessionStoreError> {
    let inserted = sqlx::query_as(
        r#"
            INSERT INTO gateway_transactions (
                id,
                kind,
                payment_id,
                pid,
                is_success,
                is_pending,
                is_resumed,
                is_error,
                card3ds,
                redirect_url,
                message,
                amount,
                currency,
                date,
                resources,
                invoice_id,
                payment_reference,
                processing
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (pid, kind, id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(&tx.id)
    .bind(kind)
    .bind(payment_id)
    .bind(pid)
    .bind(tx.is_success)
    .bind(tx.is_pending)
    .bind(tx.is_resumed)
    .bind(tx.is_error)
    .bind(tx.card3ds)
    .bind(&tx.redirect_url)
    .bind(Json(&tx.message))
    .bind(tx.amount.map(|a| a.value()))
    .bind(&tx.currency)
    .bind(&tx.date)
    .bind(Json(&tx.resources))
    .bind(&tx.invoice_id)
    .bind(&tx.payment_reference)
    .bind(Json(&tx.processing))
    .fetch_optional(&mut *conn)
    .await?;
    match inserted {
        Some(mirror) => {
            debug!("🗃️ {kind} transaction {} stored for payment session [{payment_id}]", tx.id);
            Ok(InsertResult::Inserted(mirror))
        },
        None => {
            debug!("🗃️ {kind} transaction {} was already stored", tx.id);
            let existing = fetch_transaction(pid, kind, &tx.id, conn).await?.ok_or_else(|| {
                SessionStoreError::InvalidRecord(format!("Transaction {} vanished during insert", tx.id))
            })?;
            Ok(InsertResult::AlreadyExists(existing))
        },
    }
}

pub async fn fetch_transaction(
    pid: &str,
    kind: TransactionKind,
    id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<GatewayTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM gateway_transactions WHERE pid = $1 AND kind = $2 AND id = $3")
        .bind(pid)
        .bind(kind)
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_transactions_for_payment(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<GatewayTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM gateway_transactions WHERE payment_id = $1 ORDER BY created_at, id")
        .bind(payment_id)
        .fetch_all(conn)
        .await
}
