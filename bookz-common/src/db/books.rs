//! Book database operations
//!
//! Every query is scoped to the owning user's guid.

use crate::dates::{normalize_date, to_iso};
use crate::db::models::{Book, BookFormat, NewBook};
use crate::{Error, Result};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

// Legacy rows may hold NULL title/author/format and dates as arbitrary text
const BOOK_COLUMNS: &str = r#"
    id,
    COALESCE(title, '') AS title,
    COALESCE(author, '') AS author,
    COALESCE(format, 'NA') AS format,
    CAST(start_date AS TEXT) AS start_date,
    CAST(end_date AS TEXT) AS end_date,
    isbn,
    owner
"#;

fn book_from_row(row: &SqliteRow) -> Result<Book> {
    let format: String = row.try_get("format")?;
    let start_date: Option<String> = row.try_get("start_date")?;
    let end_date: Option<String> = row.try_get("end_date")?;

    Ok(Book {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        format: format.parse().unwrap_or_else(|_| {
            debug!(format = %format, "Unknown stored format, showing as NA");
            BookFormat::Na
        }),
        start_date: start_date.as_deref().and_then(normalize_date),
        end_date: end_date.as_deref().and_then(normalize_date),
        isbn: row.try_get("isbn")?,
        owner: row.try_get("owner")?,
    })
}

/// Validate and store a book for `owner`
pub async fn insert_book(pool: &SqlitePool, owner: &str, book: &NewBook) -> Result<Book> {
    let book = book.validate()?;

    if let Some(isbn) = &book.isbn {
        if !crate::isbn::is_checksum_valid(isbn) {
            warn!(isbn = %isbn, "ISBN checksum does not match; storing as given");
        }
    }

    let id = sqlx::query(
        r#"
        INSERT INTO books (title, author, format, start_date, end_date, isbn, owner)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&book.title)
    .bind(&book.author)
    .bind(book.format.as_str())
    .bind(book.start_date.map(to_iso))
    .bind(book.end_date.map(to_iso))
    .bind(&book.isbn)
    .bind(owner)
    .execute(pool)
    .await?
    .last_insert_rowid();

    debug!(book_id = id, owner, "Inserted book");

    Ok(Book {
        id,
        title: book.title,
        author: book.author,
        format: book.format,
        start_date: book.start_date,
        end_date: book.end_date,
        isbn: book.isbn,
        owner: Some(owner.to_string()),
    })
}

/// All books belonging to `owner`, oldest first
pub async fn list_books(pool: &SqlitePool, owner: &str) -> Result<Vec<Book>> {
    let sql = format!("SELECT {} FROM books WHERE owner = ? ORDER BY id", BOOK_COLUMNS);
    let rows = sqlx::query(&sql).bind(owner).fetch_all(pool).await?;

    rows.iter().map(book_from_row).collect()
}

pub async fn get_book(pool: &SqlitePool, owner: &str, id: i64) -> Result<Book> {
    let sql = format!("SELECT {} FROM books WHERE id = ? AND owner = ?", BOOK_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(owner)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Book {}", id)))?;

    book_from_row(&row)
}

/// Delete a book; its reviews go with it
pub async fn delete_book(pool: &SqlitePool, owner: &str, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM books WHERE id = ? AND owner = ?")
        .bind(id)
        .bind(owner)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Book {}", id)));
    }

    info!(book_id = id, "Deleted book");
    Ok(())
}

/// Replace both reading dates of a book
pub async fn update_dates(
    pool: &SqlitePool,
    owner: &str,
    id: i64,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<Book> {
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            return Err(Error::InvalidInput(
                "End date cannot be before start date".to_string(),
            ));
        }
    }

    let result = sqlx::query("UPDATE books SET start_date = ?, end_date = ? WHERE id = ? AND owner = ?")
        .bind(start_date.map(to_iso))
        .bind(end_date.map(to_iso))
        .bind(id)
        .bind(owner)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Book {}", id)));
    }

    get_book(pool, owner, id).await
}

/// Give every book without an owner to `owner`
///
/// Databases from before accounts existed have `owner` NULL on all rows;
/// the first account to register inherits them.
pub async fn adopt_unowned_books(pool: &SqlitePool, owner: &str) -> Result<u64> {
    let adopted = sqlx::query("UPDATE books SET owner = ? WHERE owner IS NULL")
        .bind(owner)
        .execute(pool)
        .await?
        .rows_affected();

    if adopted > 0 {
        info!(adopted, owner, "Assigned legacy books to user");
    }
    Ok(adopted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::prepare_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        prepare_database(&pool).await.unwrap();
        pool
    }

    fn dune() -> NewBook {
        NewBook {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            format: BookFormat::Paperback,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 5),
            end_date: None,
            isbn: Some("0-441-17271-7".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_book() {
        let pool = setup_test_db().await;

        let inserted = insert_book(&pool, "alice", &dune()).await.unwrap();
        assert_eq!(inserted.isbn.as_deref(), Some("0441172717"));

        let loaded = get_book(&pool, "alice", inserted.id).await.unwrap();
        assert_eq!(loaded, inserted);
    }

    #[tokio::test]
    async fn test_books_are_owner_scoped() {
        let pool = setup_test_db().await;

        let book = insert_book(&pool, "alice", &dune()).await.unwrap();
        insert_book(&pool, "bob", &NewBook::new("Emma", "Jane Austen")).await.unwrap();

        let alice = list_books(&pool, "alice").await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].title, "Dune");

        assert!(matches!(get_book(&pool, "bob", book.id).await, Err(Error::NotFound(_))));
        assert!(matches!(delete_book(&pool, "bob", book.id).await, Err(Error::NotFound(_))));
        delete_book(&pool, "alice", book.id).await.unwrap();
        assert!(list_books(&pool, "alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_legacy_rows_load() {
        let pool = setup_test_db().await;

        sqlx::query(
            "INSERT INTO books (title, author, format, start_date, owner) VALUES (NULL, 'Anon', NULL, '03/04/2021', 'alice'), ('X', 'Y', 'Scroll', 'nan', 'alice')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let books = list_books(&pool, "alice").await.unwrap();
        assert_eq!(books[0].title, "");
        assert_eq!(books[0].format, BookFormat::Na);
        assert_eq!(books[0].start_date, NaiveDate::from_ymd_opt(2021, 3, 4));
        assert_eq!(books[1].format, BookFormat::Na);
        assert_eq!(books[1].start_date, None);
    }

    #[tokio::test]
    async fn test_update_dates() {
        let pool = setup_test_db().await;
        let book = insert_book(&pool, "alice", &dune()).await.unwrap();

        let end = NaiveDate::from_ymd_opt(2024, 2, 1);
        let updated = update_dates(&pool, "alice", book.id, book.start_date, end).await.unwrap();
        assert_eq!(updated.end_date, end);

        let backwards = update_dates(&pool, "alice", book.id, end, book.start_date).await;
        assert!(matches!(backwards, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_adopt_unowned_books() {
        let pool = setup_test_db().await;
        sqlx::query("INSERT INTO books (title, author) VALUES ('Old', 'Timer'), ('Older', 'Timer')")
            .execute(&pool)
            .await
            .unwrap();
        insert_book(&pool, "bob", &dune()).await.unwrap();

        assert_eq!(adopt_unowned_books(&pool, "alice").await.unwrap(), 2);
        assert_eq!(adopt_unowned_books(&pool, "alice").await.unwrap(), 0);
        assert_eq!(list_books(&pool, "alice").await.unwrap().len(), 2);
        assert_eq!(list_books(&pool, "bob").await.unwrap().len(), 1);
    }
}
