use chrono::Utc;
use log::debug;
use sqlx::{types::Json, SqliteConnection};
use upg_common::Secret;

use crate::{
    db_types::{ConfigurationRow, ConfigurationUpdate, ShopConfiguration},
    traits::ConfigurationStoreError,
};

pub async fn fetch_configuration(
    shop: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ShopConfiguration>, sqlx::Error> {
    let row: Option<ConfigurationRow> =
        sqlx::query_as("SELECT * FROM configurations WHERE shop = $1").bind(shop).fetch_optional(conn).await?;
    Ok(row.map(ShopConfiguration::from))
}

/// Merges the update into the stored configuration. This reads, then writes, so run it inside a transaction.
pub async fn upsert_configuration(
    update: ConfigurationUpdate,
    conn: &mut SqliteConnection,
) -> Result<ShopConfiguration, ConfigurationStoreError> {
    let shop = update.shop.trim().to_string();
    if shop.is_empty() {
        return Err(ConfigurationStoreError::MissingShop);
    }
    let current: Option<ConfigurationRow> =
        sqlx::query_as("SELECT * FROM configurations WHERE shop = $1").bind(&shop).fetch_optional(&mut *conn).await?;
    let (private_key, public_key, excluded, settings, token, ready) = match current {
        Some(row) => (
            row.unzer_private_key,
            row.unzer_public_key,
            row.excluded_payment_types,
            row.payment_page_settings,
            row.access_token,
            row.ready,
        ),
        None => (None, None, Vec::new(), None, None, false),
    };
    let private_key = merge_secret(private_key, update.unzer_private_key);
    let public_key = merge_value(public_key, update.unzer_public_key);
    let token = merge_secret(token, update.access_token);
    let excluded = update.excluded_payment_types.unwrap_or(excluded);
    let settings = update.payment_page_settings.or(settings);
    let ready = update.ready.unwrap_or(ready);
    let row: ConfigurationRow = sqlx::query_as(
        r#"
            INSERT INTO configurations (
                shop,
                unzer_private_key,
                unzer_public_key,
                excluded_payment_types,
                payment_page_settings,
                access_token,
                ready
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (shop) DO UPDATE SET
                unzer_private_key = excluded.unzer_private_key,
                unzer_public_key = excluded.unzer_public_key,
                excluded_payment_types = excluded.excluded_payment_types,
                payment_page_settings = excluded.payment_page_settings,
                access_token = excluded.access_token,
                ready = excluded.ready,
                updated_at = $8
            RETURNING *;
        "#,
    )
    .bind(&shop)
    .bind(private_key)
    .bind(public_key)
    .bind(Json(excluded))
    .bind(Json(settings))
    .bind(token)
    .bind(ready)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Configuration for {shop} saved");
    Ok(ShopConfiguration::from(row))
}

pub async fn uninstall(shop: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE configurations SET access_token = NULL, ready = FALSE, updated_at = $1 WHERE shop = $2")
            .bind(Utc::now())
            .bind(shop)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() == 1)
}

/// `None` keeps the current value. An empty string clears it.
fn merge_value(current: Option<String>, update: Option<String>) -> Option<String> {
    match update {
        None => current,
        Some(v) if v.trim().is_empty() => None,
        Some(v) => Some(v.trim().to_string()),
    }
}

fn merge_secret(current: Option<String>, update: Option<Secret<String>>) -> Option<String> {
    merge_value(current, update.map(|s| s.reveal().clone()))
}
