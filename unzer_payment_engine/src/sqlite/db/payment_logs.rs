use sqlx::SqliteConnection;

use crate::db_types::{NewPaymentLog, PaymentLog};

pub async fn insert_log(entry: NewPaymentLog, conn: &mut SqliteConnection) -> Result<PaymentLog, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO payment_logs (payment_id, log_type, prefix, message, payload)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(entry.payment_id)
    .bind(entry.log_type)
    .bind(entry.prefix)
    .bind(entry.message)
    .bind(entry.payload)
    .fetch_one(conn)
    .await
}

pub async fn fetch_logs_for_payment(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentLog>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_logs WHERE payment_id = $1 ORDER BY id")
        .bind(payment_id)
        .fetch_all(conn)
        .await
}
