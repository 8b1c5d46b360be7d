//! User accounts and login sessions

use crate::auth::{generate_session_token, hash_password, validate_credentials, verify_password};
use crate::db::books::adopt_unowned_books;
use crate::db::models::User;
use crate::{Error, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

/// Run bcrypt off the async worker threads
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Internal(format!("Password task failed: {}", e)))
}

/// Create an account
///
/// The first account ever created inherits all books stored before
/// accounts existed. A taken username is reported as [`Error::Conflict`],
/// including when two registrations for the same name race.
pub async fn create_user(pool: &SqlitePool, username: &str, password: &str) -> Result<User> {
    validate_credentials(username, password)?;
    let username = username.trim();

    let first_user = count_users(pool).await? == 0;

    let guid = Uuid::new_v4().to_string();
    let password = password.to_string();
    let hash = blocking(move || hash_password(&password)).await??;

    sqlx::query("INSERT INTO users (guid, username, password_hash) VALUES (?, ?, ?)")
        .bind(&guid)
        .bind(username)
        .bind(&hash)
        .execute(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Error::Conflict(format!("Username '{}' is already taken", username))
            }
            other => Error::Database(other),
        })?;

    info!(user = %guid, username, "Created user");

    if first_user {
        adopt_unowned_books(pool, &guid).await?;
    }

    Ok(User {
        guid,
        username: username.to_string(),
    })
}

/// Look up a user by name and check the password
pub async fn verify_credentials(pool: &SqlitePool, username: &str, password: &str) -> Result<User> {
    let row: Option<(String, String, String)> =
        sqlx::query_as("SELECT guid, username, password_hash FROM users WHERE username = ?")
            .bind(username.trim())
            .fetch_optional(pool)
            .await?;

    let rejected = || Error::Unauthorized("Invalid username or password".to_string());

    let Some((guid, username, hash)) = row else {
        return Err(rejected());
    };

    let password = password.to_string();
    if blocking(move || verify_password(&password, &hash)).await? {
        Ok(User { guid, username })
    } else {
        Err(rejected())
    }
}

pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Start a session lasting `ttl_seconds`; returns the token
pub async fn create_session(pool: &SqlitePool, user_guid: &str, ttl_seconds: i64) -> Result<String> {
    let token = generate_session_token();
    let expires_at = Utc::now().timestamp().saturating_add(ttl_seconds);

    sqlx::query("INSERT INTO sessions (token, user_guid, expires_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(user_guid)
        .bind(expires_at)
        .execute(pool)
        .await?;

    debug!(user = %user_guid, expires_at, "Created session");
    Ok(token)
}

/// Resolve a session token to its user
///
/// Expired sessions are removed and treated as absent.
pub async fn user_for_session(pool: &SqlitePool, token: &str) -> Result<Option<User>> {
    let row: Option<(String, String, i64)> = sqlx::query_as(
        r#"
        SELECT u.guid, u.username, s.expires_at
        FROM sessions s
        JOIN users u ON u.guid = s.user_guid
        WHERE s.token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match row {
        Some((guid, username, expires_at)) if expires_at > Utc::now().timestamp() => {
            Ok(Some(User { guid, username }))
        }
        Some(_) => {
            delete_session(pool, token).await?;
            debug!("Rejected expired session");
            Ok(None)
        }
        None => Ok(None),
    }
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove every expired session; returns how many were removed
pub async fn purge_expired_sessions(pool: &SqlitePool) -> Result<u64> {
    let purged = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?
        .rows_affected();

    if purged > 0 {
        info!(purged, "Purged expired sessions");
    }
    Ok(purged)
}
