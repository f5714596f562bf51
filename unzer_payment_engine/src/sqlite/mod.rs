//! SQLite backend for the Unzer payment engine.
//!
//! The schema lives in `migrations/` and is applied with `sqlx::migrate!`.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
