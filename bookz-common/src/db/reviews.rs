//! Review database operations
//!
//! Reviews are owned through their book: a user sees the reviews of the
//! books they own and nothing else.

use crate::db::models::{ChartPoint, NewReview, Review, ReviewScore};
use crate::{Error, Result};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

/// Store a review for one of `owner`'s books
///
/// Only completed books (those with an end date) can be reviewed.
pub async fn insert_review(pool: &SqlitePool, owner: &str, review: &NewReview) -> Result<Review> {
    let book: Option<(String, bool)> = sqlx::query_as(
        r#"
        SELECT COALESCE(title, ''), COALESCE(end_date, '') != ''
        FROM books
        WHERE id = ? AND owner = ?
        "#,
    )
    .bind(review.book_id)
    .bind(owner)
    .fetch_optional(pool)
    .await?;

    let (title, finished) = book.ok_or_else(|| Error::NotFound(format!("Book {}", review.book_id)))?;
    if !finished {
        return Err(Error::InvalidInput(format!(
            "'{}' has no end date yet; only finished books can be reviewed",
            title
        )));
    }

    let (rating, form, function) = review.score.to_columns();
    let id = sqlx::query(
        "INSERT INTO reviews (book_id, rating, form, function, comment) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(review.book_id)
    .bind(rating)
    .bind(form)
    .bind(function)
    .bind(&review.comment)
    .execute(pool)
    .await?
    .last_insert_rowid();

    debug!(review_id = id, book_id = review.book_id, "Inserted review");

    Ok(Review {
        id,
        book_id: Some(review.book_id),
        book_title: Some(title),
        score: Some(review.score),
        comment: review.comment.clone(),
    })
}

/// Reviews of `owner`'s books with the book title, oldest first
pub async fn list_reviews(pool: &SqlitePool, owner: &str) -> Result<Vec<Review>> {
    let rows = sqlx::query(
        r#"
        SELECT r.id, r.book_id, COALESCE(b.title, '') AS title,
               r.rating, r.form, r.function, COALESCE(r.comment, '') AS comment
        FROM reviews r
        JOIN books b ON b.id = r.book_id
        WHERE b.owner = ?
        ORDER BY r.id
        "#,
    )
    .bind(owner)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(Review {
                id: row.try_get("id")?,
                book_id: row.try_get("book_id")?,
                book_title: Some(row.try_get("title")?),
                score: ReviewScore::from_columns(
                    row.try_get("rating")?,
                    row.try_get("form")?,
                    row.try_get("function")?,
                ),
                comment: row.try_get("comment")?,
            })
        })
        .collect()
}

pub async fn delete_review(pool: &SqlitePool, owner: &str, id: i64) -> Result<()> {
    let result = sqlx::query(
        "DELETE FROM reviews WHERE id = ? AND book_id IN (SELECT id FROM books WHERE owner = ?)",
    )
    .bind(id)
    .bind(owner)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Review {}", id)));
    }

    info!(review_id = id, "Deleted review");
    Ok(())
}

/// Form/function coordinates of every axis-scored review
pub async fn chart_points(pool: &SqlitePool, owner: &str) -> Result<Vec<ChartPoint>> {
    let points: Vec<(i64, String, i64, i64)> = sqlx::query_as(
        r#"
        SELECT r.id, COALESCE(b.title, ''), r.form, r.function
        FROM reviews r
        JOIN books b ON b.id = r.book_id
        WHERE b.owner = ? AND r.form IS NOT NULL AND r.function IS NOT NULL
        ORDER BY r.id
        "#,
    )
    .bind(owner)
    .fetch_all(pool)
    .await?;

    Ok(points
        .into_iter()
        .map(|(review_id, title, form, function)| ChartPoint {
            review_id,
            title,
            form,
            function,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::books::{delete_book, insert_book};
    use crate::db::init::prepare_database;
    use crate::db::books::update_dates;
    use crate::db::models::NewBook;
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;

    fn finished_dune() -> NewBook {
        NewBook {
            end_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            ..NewBook::new("Dune", "Frank Herbert")
        }
    }

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        prepare_database(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_insert_and_list_reviews() {
        let pool = setup_test_db().await;
        let book = insert_book(&pool, "alice", &finished_dune())
            .await
            .unwrap();

        let rating = NewReview::new(book.id, ReviewScore::rating(4).unwrap(), "solid").unwrap();
        let axes = NewReview::new(book.id, ReviewScore::axes(7, -3).unwrap(), " dense ").unwrap();
        insert_review(&pool, "alice", &rating).await.unwrap();
        insert_review(&pool, "alice", &axes).await.unwrap();

        let reviews = list_reviews(&pool, "alice").await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].score, Some(ReviewScore::Rating(4)));
        assert_eq!(reviews[1].book_title.as_deref(), Some("Dune"));
        assert_eq!(reviews[1].comment, "dense");

        let points = chart_points(&pool, "alice").await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!((points[0].form, points[0].function), (7, -3));

        assert!(list_reviews(&pool, "bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cannot_review_someone_elses_book() {
        let pool = setup_test_db().await;
        let book = insert_book(&pool, "alice", &finished_dune())
            .await
            .unwrap();

        let review = NewReview::new(book.id, ReviewScore::Rating(3), "").unwrap();
        let result = insert_review(&pool, "bob", &review).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_database_rejects_out_of_range_scores() {
        let pool = setup_test_db().await;
        let book = insert_book(&pool, "alice", &finished_dune())
            .await
            .unwrap();

        let result = sqlx::query("INSERT INTO reviews (book_id, rating) VALUES (?, 9)")
            .bind(book.id)
            .execute(&pool)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_delete_review_and_cascade() {
        let pool = setup_test_db().await;
        let book = insert_book(&pool, "alice", &finished_dune())
            .await
            .unwrap();
        let review = NewReview::new(book.id, ReviewScore::Rating(5), "").unwrap();
        let first = insert_review(&pool, "alice", &review).await.unwrap();
        insert_review(&pool, "alice", &review).await.unwrap();

        assert!(delete_review(&pool, "bob", first.id).await.is_err());
        delete_review(&pool, "alice", first.id).await.unwrap();
        assert_eq!(list_reviews(&pool, "alice").await.unwrap().len(), 1);

        delete_book(&pool, "alice", book.id).await.unwrap();
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_unfinished_book_cannot_be_reviewed() {
        let pool = setup_test_db().await;
        let book = insert_book(&pool, "alice", &NewBook::new("Emma", "Jane Austen"))
            .await
            .unwrap();
        let review = NewReview::new(book.id, ReviewScore::Rating(4), "").unwrap();

        let result = insert_review(&pool, "alice", &review).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        update_dates(&pool, "alice", book.id, None, NaiveDate::from_ymd_opt(2024, 5, 1))
            .await
            .unwrap();
        insert_review(&pool, "alice", &review).await.unwrap();
        assert_eq!(list_reviews(&pool, "alice").await.unwrap().len(), 1);
    }
}
