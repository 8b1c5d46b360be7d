//! bookz-web library - reading log web service
//!
//! HTML pages for people, a small JSON API for scripts, both behind a
//! session cookie.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::openlibrary::OpenLibraryClient;

pub mod api;
pub mod error;
pub mod import;
pub mod logging;
pub mod openlibrary;
pub mod ui;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub lookup: OpenLibraryClient,
    /// Base URL for cover images
    pub covers_url: String,
}

impl AppState {
    pub fn new(db: SqlitePool, lookup: OpenLibraryClient, covers_url: impl Into<String>) -> Self {
        Self {
            db,
            lookup,
            covers_url: covers_url.into(),
        }
    }
}

/// Build application router
///
/// Session checks happen in the [`api::auth::CurrentUser`] and
/// [`api::auth::PageUser`] extractors, so public and protected routes share
/// one router.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let pages = Router::new()
        .route("/", get(ui::books::books_page))
        .route("/books", post(ui::books::add_book))
        .route("/books/:id/dates", post(ui::books::update_dates))
        .route("/books/:id/delete", post(ui::books::delete_book))
        .route("/books/import", post(ui::books::import_books))
        .route("/reviews", get(ui::reviews::reviews_page).post(ui::reviews::add_review))
        .route("/reviews/:id/delete", post(ui::reviews::delete_review))
        .route("/login", get(ui::auth::login_page).post(api::auth::login))
        .route("/register", get(ui::auth::register_page).post(api::auth::register))
        .route("/logout", post(api::auth::logout));

    let json = Router::new()
        .route("/api/books", get(api::books::list_books))
        .route("/api/reviews", get(api::reviews::list_reviews))
        .route("/api/chart", get(api::reviews::chart))
        .route("/api/lookup/:isbn", get(api::lookup::lookup_isbn))
        .merge(api::health_routes());

    Router::new()
        .merge(pages)
        .merge(json)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
