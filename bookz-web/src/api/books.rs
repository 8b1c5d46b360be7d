//! Book JSON endpoints

use axum::{extract::State, Json};
use bookz_common::db::books;
use bookz_common::db::models::Book;

use super::CurrentUser;
use crate::{ApiResult, AppState};

/// GET /api/books
pub async fn list_books(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Book>>> {
    Ok(Json(books::list_books(&state.db, &user.guid).await?))
}
