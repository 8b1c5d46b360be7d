//! Database schema migrations
//!
//! Versioned changes that column-level sync cannot express. Each migration
//! checks the live schema before acting, so running it against a database
//! that already has the change is harmless.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the wild rely on them
//! 2. **Always add new migrations** - one function per change, bump `CURRENT_SCHEMA_VERSION`
//! 3. **Never lose rows** - rebuilds copy everything, out-of-range values are clamped
//! 4. **Prefer ALTER TABLE** - only rebuild when constraints must change
//!
//! # Versions
//!
//! - v1: rebuild `reviews` with score CHECK ranges and `ON DELETE CASCADE`
//! - v2: rewrite `MM/DD/YYYY` book dates as ISO `YYYY-MM-DD`

use crate::dates::{normalize_date, to_iso};
use crate::db::schema_sync::SchemaIntrospector;
use crate::Result;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// DDL for the current reviews table under the given name
pub(crate) fn reviews_table_ddl(table_name: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY,
            book_id INTEGER REFERENCES books(id) ON DELETE CASCADE,
            rating INTEGER CHECK (rating IS NULL OR rating BETWEEN 1 AND 5),
            form INTEGER CHECK (form IS NULL OR form BETWEEN -10 AND 10),
            function INTEGER CHECK (function IS NULL OR function BETWEEN -10 AND 10),
            comment TEXT
        )
        "#,
        table_name
    )
}

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    if !SchemaIntrospector::table_exists(pool, "schema_version").await? {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("=== Phase 3: Versioned Migrations ===");
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Leaving schema untouched.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// True when `reviews` already references `books` with ON DELETE CASCADE
pub async fn reviews_cascade_in_place(pool: &SqlitePool) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM pragma_foreign_key_list('reviews')
        WHERE "table" = 'books' AND upper(on_delete) = 'CASCADE'
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Migration v1: rebuild reviews
///
/// **Background:** The reviews table started life without constraints: any
/// integer could land in `rating`, and deleting a book left its reviews
/// behind. SQLite cannot add CHECK or FOREIGN KEY clauses to an existing
/// table, so the table is recreated and every row copied across.
///
/// Rows are copied with their ids. Scores outside their range are clamped
/// into it; columns the old table never had are copied as NULL. Reviews
/// whose book no longer exists are kept and reported.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: Rebuild reviews with constraints");

    if !SchemaIntrospector::table_exists(pool, "reviews").await? {
        info!("  Reviews table doesn't exist yet - skipping migration");
        return Ok(());
    }

    if reviews_cascade_in_place(pool).await? {
        info!("  Reviews table already has constraints - skipping rebuild");
        return Ok(());
    }

    let existing = SchemaIntrospector::column_names(pool, "reviews").await?;
    let copy_sql = reviews_copy_sql(&existing);

    // Foreign key enforcement is per connection and cannot change inside a
    // transaction, so the whole rebuild runs on one pooled connection.
    let mut conn = pool.acquire().await?;
    sqlx::query("PRAGMA foreign_keys = OFF").execute(&mut *conn).await?;
    let rebuilt = rebuild_reviews(&mut conn, &copy_sql).await;
    sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
    let copied = rebuilt?;

    let orphans: Vec<(String, i64, String, i64)> = sqlx::query_as("PRAGMA foreign_key_check(reviews)")
        .fetch_all(&mut *conn)
        .await?;
    if !orphans.is_empty() {
        warn!(
            orphans = orphans.len(),
            "  ⚠ Reviews reference books that no longer exist; kept as-is"
        );
    }

    info!(copied, "  ✓ Rebuilt reviews table");
    Ok(())
}

/// SELECT used to move rows from the old reviews table into reviews_new
fn reviews_copy_sql(existing: &[String]) -> String {
    let has = |name: &str| existing.iter().any(|c| c.eq_ignore_ascii_case(name));
    let clamped = |name: &str, lo: i32, hi: i32| {
        if has(name) {
            format!("MIN(MAX(CAST({} AS INTEGER), {}), {})", name, lo, hi)
        } else {
            "NULL".to_string()
        }
    };
    let plain = |name: &str| if has(name) { name.to_string() } else { "NULL".to_string() };

    format!(
        "INSERT INTO reviews_new (id, book_id, rating, form, function, comment) \
         SELECT id, {}, {}, {}, {}, {} FROM reviews",
        plain("book_id"),
        clamped("rating", 1, 5),
        clamped("form", -10, 10),
        clamped("function", -10, 10),
        plain("comment"),
    )
}

/// Create-new / copy / drop / rename inside one transaction
async fn rebuild_reviews(conn: &mut SqliteConnection, copy_sql: &str) -> Result<u64> {
    let mut tx = sqlx::Connection::begin(&mut *conn).await?;

    sqlx::query("DROP TABLE IF EXISTS reviews_new")
        .execute(&mut *tx)
        .await?;
    sqlx::query(&reviews_table_ddl("reviews_new"))
        .execute(&mut *tx)
        .await?;

    let copied = sqlx::query(copy_sql).execute(&mut *tx).await?.rows_affected();

    sqlx::query("DROP TABLE reviews").execute(&mut *tx).await?;
    sqlx::query("ALTER TABLE reviews_new RENAME TO reviews")
        .execute(&mut *tx)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_book_id ON reviews(book_id)")
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(copied)
}

/// Migration v2: ISO dates
///
/// **Background:** CSV imports used to store dates exactly as the
/// spreadsheet exported them. Values that parse as `MM/DD/YYYY` are
/// rewritten as `YYYY-MM-DD`; anything else is left alone.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: Normalise book dates");

    if !SchemaIntrospector::table_exists(pool, "books").await? {
        info!("  Books table doesn't exist yet - skipping migration");
        return Ok(());
    }

    let rows: Vec<(i64, Option<String>, Option<String>)> = sqlx::query_as(
        r#"
        SELECT id, CAST(start_date AS TEXT), CAST(end_date AS TEXT)
        FROM books
        WHERE start_date LIKE '%/%' OR end_date LIKE '%/%'
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut rewritten = 0;
    for (id, start_date, end_date) in rows {
        for (column, value) in [("start_date", start_date), ("end_date", end_date)] {
            let Some(raw) = value.filter(|v| v.contains('/')) else {
                continue;
            };

            match normalize_date(&raw) {
                Some(date) => {
                    let sql = format!("UPDATE books SET {} = ? WHERE id = ?", column);
                    sqlx::query(&sql)
                        .bind(to_iso(date))
                        .bind(id)
                        .execute(pool)
                        .await?;
                    rewritten += 1;
                }
                None => {
                    warn!(book_id = id, column, value = %raw, "  ⚠ Unrecognised date left unchanged");
                }
            }
        }
    }

    info!(rewritten, "  ✓ Book dates normalised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn create_schema_version_table(pool: &SqlitePool) {
        sqlx::query(
            "CREATE TABLE schema_version (version INTEGER PRIMARY KEY, applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP)",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    async fn create_legacy_tables(pool: &SqlitePool) {
        sqlx::query(
            "CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT, author TEXT, format TEXT, start_date DATE, end_date DATE)",
        )
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TABLE reviews (id INTEGER PRIMARY KEY, book_id INTEGER, rating INTEGER, comment TEXT, FOREIGN KEY (book_id) REFERENCES books(id))",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_get_schema_version_no_table() {
        let pool = setup_test_db().await;
        assert_eq!(get_schema_version(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_and_get_schema_version() {
        let pool = setup_test_db().await;
        create_schema_version_table(&pool).await;

        assert_eq!(get_schema_version(&pool).await.unwrap(), 0);
        set_schema_version(&pool, 1).await.unwrap();
        set_schema_version(&pool, 1).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), 1);
    }

    #[test]
    fn test_reviews_copy_sql_for_rating_only_table() {
        let existing = vec![
            "id".to_string(),
            "book_id".to_string(),
            "rating".to_string(),
            "comment".to_string(),
        ];
        let sql = reviews_copy_sql(&existing);

        assert!(sql.contains("MIN(MAX(CAST(rating AS INTEGER), 1), 5)"));
        assert!(sql.contains("SELECT id, book_id, MIN(MAX(CAST(rating AS INTEGER), 1), 5), NULL, NULL, comment"));
    }

    #[tokio::test]
    async fn test_migrate_v1_no_table() {
        let pool = setup_test_db().await;
        migrate_v1(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_migrate_v1_rebuilds_and_keeps_rows() {
        let pool = setup_test_db().await;
        create_legacy_tables(&pool).await;

        sqlx::query("INSERT INTO books (id, title, author) VALUES (1, 'Dune', 'Frank Herbert')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO reviews (id, book_id, rating, comment) VALUES (1, 1, 4, 'great'), (2, 1, 9, 'too high'), (3, 42, 2, 'orphan')",
        )
        .execute(&pool)
        .await
        .unwrap();

        assert!(!reviews_cascade_in_place(&pool).await.unwrap());
        migrate_v1(&pool).await.unwrap();
        assert!(reviews_cascade_in_place(&pool).await.unwrap());

        let rows: Vec<(i64, Option<i64>, Option<i64>, Option<i64>, Option<String>)> =
            sqlx::query_as("SELECT id, book_id, rating, form, comment FROM reviews ORDER BY id")
                .fetch_all(&pool)
                .await
                .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], (1, Some(1), Some(4), None, Some("great".to_string())));
        assert_eq!(rows[1].2, Some(5), "out-of-range rating is clamped");
        assert_eq!(rows[2].1, Some(42), "orphan review survives");

        // Constraints are active on the rebuilt table
        let bad = sqlx::query("INSERT INTO reviews (book_id, form) VALUES (1, 11)")
            .execute(&pool)
            .await;
        assert!(bad.is_err());
    }

    #[tokio::test]
    async fn test_migrate_v1_idempotent() {
        let pool = setup_test_db().await;
        create_legacy_tables(&pool).await;
        sqlx::query("INSERT INTO books (id, title, author) VALUES (1, 'Dune', 'Frank Herbert')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO reviews (book_id, rating) VALUES (1, 3)")
            .execute(&pool)
            .await
            .unwrap();

        migrate_v1(&pool).await.unwrap();
        migrate_v1(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let leftover = SchemaIntrospector::table_exists(&pool, "reviews_new").await.unwrap();
        assert!(!leftover);
    }

    #[tokio::test]
    async fn test_migrate_v2_normalises_dates() {
        let pool = setup_test_db().await;
        create_legacy_tables(&pool).await;

        sqlx::query(
            r#"
            INSERT INTO books (id, title, author, start_date, end_date) VALUES
                (1, 'A', 'x', '03/15/2024', '2024-04-01'),
                (2, 'B', 'y', '2023-01-01', '12/31/2023'),
                (3, 'C', 'z', '31/12/2023', NULL)
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        migrate_v2(&pool).await.unwrap();

        let rows: Vec<(i64, Option<String>, Option<String>)> =
            sqlx::query_as("SELECT id, start_date, end_date FROM books ORDER BY id")
                .fetch_all(&pool)
                .await
                .unwrap();

        assert_eq!(rows[0].1.as_deref(), Some("2024-03-15"));
        assert_eq!(rows[0].2.as_deref(), Some("2024-04-01"));
        assert_eq!(rows[1].2.as_deref(), Some("2023-12-31"));
        assert_eq!(rows[2].1.as_deref(), Some("31/12/2023"), "unparseable value untouched");
    }

    #[tokio::test]
    async fn test_run_migrations_complete_flow() {
        let pool = setup_test_db().await;
        create_schema_version_table(&pool).await;
        create_legacy_tables(&pool).await;

        run_migrations(&pool).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
        assert!(reviews_cascade_in_place(&pool).await.unwrap());

        // Second run is a no-op
        run_migrations(&pool).await.unwrap();
        let stamps: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stamps, 2);
    }

    #[tokio::test]
    async fn test_run_migrations_newer_database_untouched() {
        let pool = setup_test_db().await;
        create_schema_version_table(&pool).await;
        create_legacy_tables(&pool).await;
        set_schema_version(&pool, CURRENT_SCHEMA_VERSION + 1).await.unwrap();

        run_migrations(&pool).await.unwrap();
        assert!(!reviews_cascade_in_place(&pool).await.unwrap());
    }
}
