use chrono::Utc;
use log::debug;
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{Checkout, CheckoutRow};

/// Stores the checkout snapshot. Later updates for the same cart token replace the lines and totals.
pub async fn upsert_checkout(checkout: Checkout, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let token = checkout.token.clone();
    sqlx::query(
        r#"
            INSERT INTO checkouts (token, shop, lines, total_price, subtotal_price, total_tax, currency)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (token) DO UPDATE SET
                shop = excluded.shop,
                lines = excluded.lines,
                total_price = excluded.total_price,
                subtotal_price = excluded.subtotal_price,
                total_tax = excluded.total_tax,
                currency = excluded.currency,
                updated_at = $8;
        "#,
    )
    .bind(checkout.token)
    .bind(checkout.shop)
    .bind(Json(checkout.lines))
    .bind(checkout.total_price.map(|a| a.value()))
    .bind(checkout.subtotal_price.map(|a| a.value()))
    .bind(checkout.total_tax.map(|a| a.value()))
    .bind(checkout.currency)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    debug!("🗃️ Checkout {token} stored");
    Ok(())
}

pub async fn fetch_checkout(token: &str, conn: &mut SqliteConnection) -> Result<Option<Checkout>, sqlx::Error> {
    let row: Option<CheckoutRow> =
        sqlx::query_as("SELECT * FROM checkouts WHERE token = $1").bind(token).fetch_optional(conn).await?;
    Ok(row.map(Checkout::from))
}
