//! Reviews page: add, list, delete, form/function chart

use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    Form,
};
use bookz_common::db::models::{NewReview, Review, ReviewScore};
use bookz_common::db::{books, reviews};
use serde::Deserialize;
use tracing::info;

use super::chart::render_chart;
use super::{html_escape, layout, redirect_with, Flash};
use crate::api::PageUser;
use crate::{ApiError, AppState};

const SLIDER_SCRIPT: &str = r#"
<script>
function toggleScoreMode() {
    const axes = document.getElementById('mode-axes').checked;
    document.getElementById('axes-inputs').style.display = axes ? 'flex' : 'none';
    document.getElementById('rating-inputs').style.display = axes ? 'none' : 'flex';
}
</script>
"#;

/// Review form; numbers arrive as text so blank inputs can be reported
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReviewForm {
    pub book_id: String,
    /// "axes" or "rating"
    pub mode: String,
    pub rating: String,
    pub form: String,
    pub function: String,
    pub comment: String,
}

fn parse_number(name: &str, value: &str) -> Result<i64, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("{} must be a whole number", name)))
}

impl ReviewForm {
    fn into_new_review(self) -> Result<NewReview, ApiError> {
        let book_id = parse_number("Book", &self.book_id)?;
        let score = match self.mode.as_str() {
            "rating" => ReviewScore::rating(parse_number("Rating", &self.rating)?)?,
            _ => ReviewScore::axes(
                parse_number("Form", &self.form)?,
                parse_number("Function", &self.function)?,
            )?,
        };
        Ok(NewReview::new(book_id, score, self.comment)?)
    }
}

fn score_text(score: Option<ReviewScore>) -> String {
    match score {
        Some(ReviewScore::Rating(rating)) => format!("{} / 5", rating),
        Some(ReviewScore::Axes { form, function }) => format!("form {}, function {}", form, function),
        None => String::new(),
    }
}

fn review_rows(reviews: &[Review]) -> String {
    if reviews.is_empty() {
        return r#"<tr><td colspan="5">No reviews yet.</td></tr>"#.to_string();
    }

    reviews
        .iter()
        .map(|review| {
            format!(
                r#"<tr>
                    <td>{id}</td><td>{title}</td><td>{score}</td><td>{comment}</td>
                    <td><form method="post" action="/reviews/{id}/delete">
                        <button class="danger" type="submit">Delete</button>
                    </form></td>
                </tr>"#,
                id = review.id,
                title = html_escape(review.book_title.as_deref().unwrap_or("")),
                score = score_text(review.score),
                comment = html_escape(&review.comment),
            )
        })
        .collect()
}

/// GET /reviews
pub async fn reviews_page(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Query(flash): Query<Flash>,
) -> Result<Html<String>, ApiError> {
    let books = books::list_books(&state.db, &user.guid).await?;
    let reviews = reviews::list_reviews(&state.db, &user.guid).await?;
    let points = reviews::chart_points(&state.db, &user.guid).await?;

    let finished: Vec<_> = books.iter().filter(|b| b.end_date.is_some()).collect();

    let add_form = if finished.is_empty() {
        r#"<p>Only finished books can be reviewed. Set an end date on the <a href="/">Books</a> page first.</p>"#
            .to_string()
    } else {
        let options: String = finished
            .iter()
            .map(|b| format!(r#"<option value="{}">{} (id={})</option>"#, b.id, html_escape(&b.title), b.id))
            .collect();

        format!(
            r#"<form method="post" action="/reviews">
                <label for="book_id">Book</label>
                <select id="book_id" name="book_id">{options}</select>
                <label>Score</label>
                <label><input type="radio" id="mode-axes" name="mode" value="axes" checked onchange="toggleScoreMode()"> Form / function</label>
                <label><input type="radio" id="mode-rating" name="mode" value="rating" onchange="toggleScoreMode()"> Rating</label>
                <div class="row" id="axes-inputs">
                    <div><label for="form">Form (-10..10)</label><input id="form" name="form" type="range" min="-10" max="10" value="0"></div>
                    <div><label for="function">Function (-10..10)</label><input id="function" name="function" type="range" min="-10" max="10" value="0"></div>
                </div>
                <div class="row" id="rating-inputs" style="display:none">
                    <div><label for="rating">Rating (1..5)</label><input id="rating" name="rating" type="range" min="1" max="5" value="3"></div>
                </div>
                <label for="comment">Comment</label>
                <textarea id="comment" name="comment" rows="3" cols="60"></textarea>
                <p><button type="submit">Add Review</button></p>
            </form>"#,
            options = options,
        )
    };

    let content = format!(
        r#"<section>
            <h2>Add a review</h2>
            {add_form}
        </section>
        <section>
            <h2>Form vs function</h2>
            {chart}
        </section>
        <section>
            <h2>All reviews ({count})</h2>
            <table>
                <thead><tr><th>ID</th><th>Book</th><th>Score</th><th>Comment</th><th></th></tr></thead>
                <tbody>{rows}</tbody>
            </table>
        </section>
        {script}"#,
        add_form = add_form,
        chart = render_chart(&points),
        count = reviews.len(),
        rows = review_rows(&reviews),
        script = SLIDER_SCRIPT,
    );

    Ok(layout("Reviews", Some(&user), &flash, &content))
}

/// POST /reviews
pub async fn add_review(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Form(form): Form<ReviewForm>,
) -> Redirect {
    let result = async {
        let review = form.into_new_review()?;
        Ok::<_, ApiError>(reviews::insert_review(&state.db, &user.guid, &review).await?)
    }
    .await;

    match result {
        Ok(review) => {
            info!(review_id = review.id, "Review added");
            redirect_with("/reviews", "msg", "Review added!")
        }
        Err(e) => redirect_with("/reviews", "err", &e.user_message()),
    }
}

/// POST /reviews/:id/delete
pub async fn delete_review(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(id): Path<i64>,
) -> Redirect {
    match reviews::delete_review(&state.db, &user.guid, id).await {
        Ok(()) => redirect_with("/reviews", "msg", "Review deleted"),
        Err(e) => redirect_with("/reviews", "err", &ApiError::from(e).user_message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(mode: &str) -> ReviewForm {
        ReviewForm {
            book_id: "7".to_string(),
            mode: mode.to_string(),
            rating: "4".to_string(),
            form: "-3".to_string(),
            function: "9".to_string(),
            comment: " fine ".to_string(),
        }
    }

    #[test]
    fn test_review_form_modes() {
        let axes = form("axes").into_new_review().unwrap();
        assert_eq!(axes.book_id, 7);
        assert_eq!(axes.score, ReviewScore::Axes { form: -3, function: 9 });
        assert_eq!(axes.comment, "fine");

        let rating = form("rating").into_new_review().unwrap();
        assert_eq!(rating.score, ReviewScore::Rating(4));
    }

    #[test]
    fn test_review_form_rejects_bad_values() {
        let mut out_of_range = form("axes");
        out_of_range.function = "11".to_string();
        assert!(matches!(out_of_range.into_new_review(), Err(ApiError::BadRequest(_))));

        let mut blank = form("rating");
        blank.rating = String::new();
        assert!(matches!(blank.into_new_review(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_score_text() {
        assert_eq!(score_text(Some(ReviewScore::Rating(5))), "5 / 5");
        assert_eq!(score_text(Some(ReviewScore::Axes { form: 1, function: -1 })), "form 1, function -1");
        assert_eq!(score_text(None), "");
    }
}
