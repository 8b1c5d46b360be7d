//! Runtime settings (key/value rows in the `settings` table)
//!
//! Defaults are written at startup by [`crate::db::init`]; the getters fall
//! back to the same defaults if a row has gone missing since.

use crate::db::init::DEFAULT_SESSION_TIMEOUT_SECONDS;
use crate::{Error, Result};
use sqlx::SqlitePool;

/// Lifetime of a login session in seconds
pub async fn get_session_timeout_seconds(pool: &SqlitePool) -> Result<i64> {
    get_setting(pool, "session_timeout_seconds")
        .await
        .map(|opt| opt.unwrap_or(DEFAULT_SESSION_TIMEOUT_SECONDS))
}

/// Whether ISBN lookups against the catalog service are allowed
pub async fn get_isbn_lookup_enabled(pool: &SqlitePool) -> Result<bool> {
    get_setting(pool, "isbn_lookup_enabled")
        .await
        .map(|opt| opt.unwrap_or(true))
}

/// Whether new accounts may be created (the first account always can)
pub async fn get_allow_registration(pool: &SqlitePool) -> Result<bool> {
    get_setting(pool, "allow_registration")
        .await
        .map(|opt| opt.unwrap_or(true))
}

/// Read and parse a setting; `None` when absent or NULL
pub async fn get_setting<T>(pool: &SqlitePool, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value: Option<Option<String>> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    match value.flatten() {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Setting '{}' has invalid value '{}': {}", key, value, e))),
        None => Ok(None),
    }
}

pub async fn set_setting<T>(pool: &SqlitePool, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(pool)
    .await?;

    Ok(())
}
