//! Table Schema Definitions
//!
//! Target column sets for the tables that have changed shape over time.
//! Tables introduced later (users, sessions, settings) never existed in an
//! older form and are only created, not synced.

use crate::db::schema_sync::{ColumnDefinition, SchemaSync, TableSchema};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Books table schema
///
/// The oldest databases lack `isbn` (added with ISBN lookup) and `owner`
/// (added with login).
pub struct BooksTableSchema;

impl TableSchema for BooksTableSchema {
    fn table_name() -> &'static str {
        "books"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("title", "TEXT"),
            ColumnDefinition::new("author", "TEXT"),
            ColumnDefinition::new("format", "TEXT").default("'NA'"),
            ColumnDefinition::new("start_date", "DATE"),
            ColumnDefinition::new("end_date", "DATE"),
            ColumnDefinition::new("isbn", "TEXT"),
            // users.guid; NULL for rows written before accounts existed
            ColumnDefinition::new("owner", "TEXT"),
        ]
    }
}

/// Reviews table schema
///
/// First version carried a single `rating`; `form` and `function` axes came
/// later. Constraints (CHECK ranges, cascading delete) are only reachable by
/// the rebuild in [`crate::db::migrations`].
pub struct ReviewsTableSchema;

impl TableSchema for ReviewsTableSchema {
    fn table_name() -> &'static str {
        "reviews"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("book_id", "INTEGER"),
            ColumnDefinition::new("rating", "INTEGER"),
            ColumnDefinition::new("form", "INTEGER"),
            ColumnDefinition::new("function", "INTEGER"),
            ColumnDefinition::new("comment", "TEXT"),
        ]
    }
}

/// Synchronize all table schemas
///
/// **Phase 2 of database initialization** (after CREATE TABLE IF NOT EXISTS, before migrations)
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<()> {
    info!("=== Phase 2: Automatic Schema Synchronization ===");

    let books = SchemaSync::sync_table::<BooksTableSchema>(pool).await?;
    let reviews = SchemaSync::sync_table::<ReviewsTableSchema>(pool).await?;

    info!(
        books_added = books.len(),
        reviews_added = reviews.len(),
        "=== Schema Synchronization Complete ==="
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema_sync::SchemaIntrospector;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[test]
    fn test_books_schema_definition() {
        let columns = BooksTableSchema::expected_columns();

        assert!(columns.iter().any(|c| c.name == "id" && c.primary_key));
        assert!(columns
            .iter()
            .any(|c| c.name == "format" && c.default_value.as_deref() == Some("'NA'")));
        assert!(columns.iter().any(|c| c.name == "isbn"));
        assert!(columns.iter().any(|c| c.name == "owner"));
    }

    #[tokio::test]
    async fn test_sync_legacy_books_and_reviews() {
        let pool = setup_test_db().await;

        sqlx::query(
            r#"
            CREATE TABLE books (
                id INTEGER PRIMARY KEY,
                title TEXT,
                author TEXT,
                format TEXT,
                start_date DATE,
                end_date DATE
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("CREATE TABLE reviews (id INTEGER PRIMARY KEY, book_id INTEGER, rating INTEGER, comment TEXT)")
            .execute(&pool)
            .await
            .unwrap();

        sync_all_table_schemas(&pool).await.unwrap();

        let books = SchemaIntrospector::column_names(&pool, "books").await.unwrap();
        assert_eq!(
            books,
            vec!["id", "title", "author", "format", "start_date", "end_date", "isbn", "owner"]
        );

        let reviews = SchemaIntrospector::column_names(&pool, "reviews").await.unwrap();
        assert_eq!(reviews, vec!["id", "book_id", "rating", "comment", "form", "function"]);
    }
}
