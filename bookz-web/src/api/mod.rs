//! HTTP API handlers for bookz-web

pub mod auth;
pub mod books;
pub mod health;
pub mod lookup;
pub mod reviews;

pub use auth::{CurrentUser, PageUser};
pub use health::health_routes;
