//! ISBN lookup endpoint used by the add-book form

use axum::{
    extract::{Path, State},
    Json,
};
use bookz_common::db::settings;
use bookz_common::isbn::{cover_url, is_checksum_valid, normalize_isbn};
use serde::Serialize;

use super::CurrentUser;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub found: bool,
    pub isbn: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover_url: Option<String>,
}

/// GET /api/lookup/:isbn
///
/// 400 for a malformed ISBN, 403 while lookups are disabled, 502 when the
/// catalog cannot be reached. An unknown ISBN is `found: false`.
pub async fn lookup_isbn(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(raw): Path<String>,
) -> ApiResult<Json<LookupResponse>> {
    let isbn = normalize_isbn(&raw)
        .ok_or_else(|| ApiError::BadRequest(format!("Malformed ISBN: {}", raw)))?;

    if !settings::get_isbn_lookup_enabled(&state.db).await? {
        return Err(ApiError::Forbidden("ISBN lookup is disabled".to_string()));
    }

    if !is_checksum_valid(&isbn) {
        tracing::debug!(isbn = %isbn, "ISBN checksum mismatch, looking up anyway");
    }

    let response = match state.lookup.lookup_isbn(&isbn).await? {
        Some(details) => LookupResponse {
            found: true,
            cover_url: Some(cover_url(&state.covers_url, &isbn)),
            isbn,
            title: Some(details.title),
            author: Some(details.author),
        },
        None => LookupResponse {
            found: false,
            isbn,
            title: None,
            author: None,
            cover_url: None,
        },
    };

    Ok(Json(response))
}
