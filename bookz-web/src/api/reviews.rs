//! Review JSON endpoints

use axum::{extract::State, Json};
use bookz_common::db::models::{ChartPoint, Review};
use bookz_common::db::reviews;

use super::CurrentUser;
use crate::{ApiResult, AppState};

/// GET /api/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(reviews::list_reviews(&state.db, &user.guid).await?))
}

/// GET /api/chart
///
/// Form/function coordinates of axis-scored reviews.
pub async fn chart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<ChartPoint>>> {
    Ok(Json(reviews::chart_points(&state.db, &user.guid).await?))
}
