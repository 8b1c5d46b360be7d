//! Error type shared by the bookz crates

use thiserror::Error;

/// Result alias used throughout bookz-common
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// SQLite failure (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bootstrap configuration could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Book, review, user or setting does not exist (or is not owned by the caller)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected user input: empty title, score out of range, malformed ISBN...
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Username already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Wrong username/password or expired session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
