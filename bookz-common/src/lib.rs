//! # bookz common library
//!
//! Shared code for the bookz service:
//! - Database initialization, schema convergence and repositories
//! - Bootstrap configuration loading
//! - ISBN and date helpers
//! - Password hashing and session tokens

pub mod auth;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod isbn;

pub use error::{Error, Result};
