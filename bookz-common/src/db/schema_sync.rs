//! Automatic Schema Synchronization
//!
//! Brings an existing table up to its expected column set by comparing the
//! declared schema against `PRAGMA table_info` and issuing one
//! `ALTER TABLE ... ADD COLUMN` per missing column.
//!
//! # Architecture
//!
//! Database initialization runs in phases (see [`crate::db::init`]):
//! 1. **CREATE TABLE IF NOT EXISTS** - Create missing tables
//! 2. **Auto-Sync** - Add missing columns via ALTER TABLE (THIS MODULE)
//! 3. **Versioned Migrations** - Rebuilds and data fixes ([`crate::db::migrations`])
//!
//! # Usage
//!
//! ```rust,ignore
//! pub struct BooksTableSchema;
//!
//! impl TableSchema for BooksTableSchema {
//!     fn table_name() -> &'static str { "books" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("id", "INTEGER").primary_key(),
//!             ColumnDefinition::new("isbn", "TEXT"),  // added on startup when absent
//!         ]
//!     }
//! }
//!
//! let added = SchemaSync::sync_table::<BooksTableSchema>(&pool).await?;
//! ```

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER", "DATE")
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique: bool,
    /// DEFAULT clause, verbatim SQL (e.g. `'NA'`)
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            unique: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Render the `ALTER TABLE ... ADD COLUMN` statement for this column
    ///
    /// SQLite cannot add PRIMARY KEY or UNIQUE columns, and NOT NULL only
    /// when a default is supplied; those constraints are dropped here and
    /// reported by [`SchemaSync::add_column`].
    pub fn add_column_sql(&self, table: &str) -> String {
        let mut sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, self.name, self.sql_type);

        match (&self.default_value, self.not_null) {
            (Some(default), true) => sql.push_str(&format!(" NOT NULL DEFAULT {}", default)),
            (Some(default), false) => sql.push_str(&format!(" DEFAULT {}", default)),
            (None, _) => {}
        }

        sql
    }
}

/// One row of `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    /// Column position in the table
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub pk: bool,
}

/// Schema drift detected between expected and actual schema
#[derive(Debug, Clone)]
pub enum SchemaDrift {
    /// Column missing from database
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    /// Column type mismatch (cannot auto-fix)
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    /// Constraint mismatch (cannot auto-fix, needs a table rebuild)
    ConstraintMismatch {
        table: String,
        column: String,
        constraint: String,
    },
}

/// Declared shape of one table
pub trait TableSchema {
    fn table_name() -> &'static str;

    /// Expected column definitions in creation order
    fn expected_columns() -> Vec<ColumnDefinition>;
}

/// Reads the live schema through SQLite pragmas
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Columns of `table_name` ordered by cid; empty if the table is absent
    pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
        let query = format!("PRAGMA table_info({})", table_name);
        let rows = sqlx::query(&query).fetch_all(pool).await?;

        let mut columns: Vec<ActualColumn> = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                default_value: row.get("dflt_value"),
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect();

        columns.sort_by_key(|c| c.cid);

        Ok(columns)
    }

    /// Just the column names, in table order
    pub async fn column_names(pool: &SqlitePool, table_name: &str) -> Result<Vec<String>> {
        Ok(Self::introspect_table(pool, table_name)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM sqlite_master
                WHERE type='table' AND name = ?
            )
            "#,
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}

/// Expected-versus-actual comparison
pub struct SchemaDiff;

impl SchemaDiff {
    /// Compare expected schema to actual database schema
    ///
    /// Columns present in the database but not declared are ignored; old
    /// columns are never dropped.
    pub fn compare(table_name: &str, expected: &[ColumnDefinition], actual: &[ActualColumn]) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for expected_col in expected {
            let Some(actual_col) = actual
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(&expected_col.name))
            else {
                drift.push(SchemaDrift::MissingColumn {
                    table: table_name.to_string(),
                    column: expected_col.clone(),
                });
                continue;
            };

            if !Self::types_compatible(&expected_col.sql_type, &actual_col.type_name) {
                drift.push(SchemaDrift::TypeMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    expected: expected_col.sql_type.clone(),
                    actual: actual_col.type_name.clone(),
                });
            }

            if expected_col.not_null && !actual_col.not_null && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "NOT NULL".to_string(),
                });
            }

            if expected_col.primary_key && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "PRIMARY KEY".to_string(),
                });
            }
        }

        drift
    }

    /// Only the columns that have to be added
    pub fn missing_columns(expected: &[ColumnDefinition], actual: &[ActualColumn]) -> Vec<ColumnDefinition> {
        expected
            .iter()
            .filter(|e| !actual.iter().any(|a| a.name.eq_ignore_ascii_case(&e.name)))
            .cloned()
            .collect()
    }

    /// Check if SQL types are compatible (SQLite type affinity rules)
    fn types_compatible(expected: &str, actual: &str) -> bool {
        let exp = expected.to_uppercase();
        let act = actual.to_uppercase();

        if exp == act {
            return true;
        }

        let integer = |t: &str| t.contains("INT");
        let text = |t: &str| t.contains("TEXT") || t.contains("CHAR") || t.contains("CLOB");
        let real = |t: &str| t.contains("REAL") || t.contains("FLOAT") || t.contains("DOUBLE");
        // Dates are stored as ISO text; older databases declared them as TEXT
        let date = |t: &str| t.contains("DATE") || t.contains("TIME");

        (integer(&exp) && integer(&act))
            || (text(&exp) && text(&act))
            || (real(&exp) && real(&act))
            || (date(&exp) && (date(&act) || text(&act)))
    }
}

/// Applies additive schema changes
pub struct SchemaSync;

impl SchemaSync {
    /// Synchronize table schema: detect drift and add missing columns
    ///
    /// **What this CAN fix:**
    /// - Missing columns (via ALTER TABLE ADD COLUMN)
    ///
    /// **What this CANNOT fix (left to versioned migrations):**
    /// - Type changes
    /// - Constraint changes
    /// - Column removal
    ///
    /// Returns the names of the columns that were added.
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<Vec<String>> {
        let table_name = T::table_name();
        let expected = T::expected_columns();

        if !SchemaIntrospector::table_exists(pool, table_name).await? {
            warn!(
                "  Table '{}' does not exist - should be created by CREATE TABLE IF NOT EXISTS first",
                table_name
            );
            return Ok(Vec::new());
        }

        let actual = SchemaIntrospector::introspect_table(pool, table_name).await?;
        let drift = SchemaDiff::compare(table_name, &expected, &actual);

        if drift.is_empty() {
            info!("  ✓ Schema up to date for '{}'", table_name);
            return Ok(Vec::new());
        }

        let mut added = Vec::new();
        for change in drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    if Self::add_column(pool, &table, &column).await? {
                        added.push(column.name);
                    }
                }
                SchemaDrift::TypeMismatch { table, column, expected, actual } => {
                    warn!(
                        "  ⚠ Type mismatch in {}.{}: expected '{}', found '{}'. Left unchanged.",
                        table, column, expected, actual
                    );
                }
                SchemaDrift::ConstraintMismatch { table, column, constraint } => {
                    warn!(
                        "  ⚠ Constraint mismatch in {}.{}: missing '{}'. Left unchanged.",
                        table, column, constraint
                    );
                }
            }
        }

        Ok(added)
    }

    /// Add one column; returns false when it already existed
    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<bool> {
        if column.primary_key || column.unique {
            warn!(
                "  ⚠ Cannot add PRIMARY KEY/UNIQUE column {}.{} via ALTER TABLE. \
                 Column will be created without that constraint.",
                table, column.name
            );
        }

        if column.not_null && column.default_value.is_none() {
            warn!(
                "  ⚠ Cannot add NOT NULL column {}.{} without DEFAULT value. \
                 Column will be nullable.",
                table, column.name
            );
        }

        let sql = column.add_column_sql(table);
        info!("  ✓ Adding column: {}.{} ({})", table, column.name, column.sql_type);

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                info!("  Column {}.{} already present", table, column.name);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
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

    struct ShelfSchema;

    impl TableSchema for ShelfSchema {
        fn table_name() -> &'static str {
            "shelf"
        }

        fn expected_columns() -> Vec<ColumnDefinition> {
            vec![
                ColumnDefinition::new("id", "INTEGER").primary_key(),
                ColumnDefinition::new("label", "TEXT"),
                ColumnDefinition::new("kind", "TEXT").not_null().default("'NA'"),
                ColumnDefinition::new("opened_on", "DATE"),
            ]
        }
    }

    #[test]
    fn test_column_definition_builder() {
        let col = ColumnDefinition::new("format", "TEXT")
            .not_null()
            .unique()
            .default("'NA'");

        assert_eq!(col.name, "format");
        assert_eq!(col.sql_type, "TEXT");
        assert!(col.not_null);
        assert!(col.unique);
        assert_eq!(col.default_value, Some("'NA'".to_string()));
    }

    #[test]
    fn test_add_column_sql() {
        let plain = ColumnDefinition::new("isbn", "TEXT");
        assert_eq!(plain.add_column_sql("books"), "ALTER TABLE books ADD COLUMN isbn TEXT");

        let with_default = ColumnDefinition::new("format", "TEXT").default("'NA'");
        assert_eq!(
            with_default.add_column_sql("books"),
            "ALTER TABLE books ADD COLUMN format TEXT DEFAULT 'NA'"
        );

        let not_null = ColumnDefinition::new("format", "TEXT").not_null().default("'NA'");
        assert_eq!(
            not_null.add_column_sql("books"),
            "ALTER TABLE books ADD COLUMN format TEXT NOT NULL DEFAULT 'NA'"
        );

        // NOT NULL without default is silently relaxed
        let relaxed = ColumnDefinition::new("owner", "TEXT").not_null();
        assert_eq!(relaxed.add_column_sql("books"), "ALTER TABLE books ADD COLUMN owner TEXT");
    }

    #[test]
    fn test_types_compatible() {
        assert!(SchemaDiff::types_compatible("TEXT", "TEXT"));
        assert!(SchemaDiff::types_compatible("integer", "INTEGER"));
        assert!(SchemaDiff::types_compatible("INTEGER", "INT"));
        assert!(SchemaDiff::types_compatible("TEXT", "VARCHAR"));
        assert!(SchemaDiff::types_compatible("REAL", "DOUBLE"));
        assert!(SchemaDiff::types_compatible("DATE", "DATE"));
        assert!(SchemaDiff::types_compatible("DATE", "TEXT"));
        assert!(SchemaDiff::types_compatible("DATE", "TIMESTAMP"));

        assert!(!SchemaDiff::types_compatible("TEXT", "INTEGER"));
        assert!(!SchemaDiff::types_compatible("DATE", "INTEGER"));
        assert!(!SchemaDiff::types_compatible("REAL", "TEXT"));
    }

    #[tokio::test]
    async fn test_introspect_table() {
        let pool = setup_test_db().await;

        sqlx::query("CREATE TABLE shelf (id INTEGER PRIMARY KEY, label TEXT NOT NULL, weight REAL)")
            .execute(&pool)
            .await
            .unwrap();

        let columns = SchemaIntrospector::introspect_table(&pool, "shelf").await.unwrap();

        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "id");
        assert!(columns[0].pk);
        assert_eq!(columns[1].name, "label");
        assert!(columns[1].not_null);
        assert_eq!(columns[2].type_name, "REAL");
        assert!(!columns[2].not_null);
    }

    #[tokio::test]
    async fn test_introspect_missing_table_is_empty() {
        let pool = setup_test_db().await;
        let columns = SchemaIntrospector::introspect_table(&pool, "nothing_here").await.unwrap();
        assert!(columns.is_empty());
    }

    #[tokio::test]
    async fn test_detect_missing_and_mismatched_columns() {
        let pool = setup_test_db().await;

        sqlx::query("CREATE TABLE shelf (id INTEGER PRIMARY KEY, label INTEGER)")
            .execute(&pool)
            .await
            .unwrap();

        let actual = SchemaIntrospector::introspect_table(&pool, "shelf").await.unwrap();
        let drift = SchemaDiff::compare("shelf", &ShelfSchema::expected_columns(), &actual);

        assert_eq!(drift.len(), 3);
        assert!(matches!(
            &drift[0],
            SchemaDrift::TypeMismatch { column, actual, .. } if column == "label" && actual == "INTEGER"
        ));
        assert!(matches!(
            &drift[1],
            SchemaDrift::MissingColumn { column, .. } if column.name == "kind"
        ));
        assert!(matches!(
            &drift[2],
            SchemaDrift::MissingColumn { column, .. } if column.name == "opened_on"
        ));

        let missing = SchemaDiff::missing_columns(&ShelfSchema::expected_columns(), &actual);
        let names: Vec<_> = missing.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["kind", "opened_on"]);
    }

    #[tokio::test]
    async fn test_sync_adds_columns_and_keeps_rows() {
        let pool = setup_test_db().await;

        sqlx::query("CREATE TABLE shelf (id INTEGER PRIMARY KEY, label TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO shelf (id, label) VALUES (1, 'kitchen'), (2, 'hall')")
            .execute(&pool)
            .await
            .unwrap();

        let added = SchemaSync::sync_table::<ShelfSchema>(&pool).await.unwrap();
        assert_eq!(added, vec!["kind".to_string(), "opened_on".to_string()]);

        let rows: Vec<(i64, String, String, Option<String>)> =
            sqlx::query_as("SELECT id, label, kind, opened_on FROM shelf ORDER BY id")
                .fetch_all(&pool)
                .await
                .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], (1, "kitchen".to_string(), "NA".to_string(), None));
        assert_eq!(rows[1].1, "hall");
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let pool = setup_test_db().await;

        sqlx::query("CREATE TABLE shelf (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();

        let first = SchemaSync::sync_table::<ShelfSchema>(&pool).await.unwrap();
        let second = SchemaSync::sync_table::<ShelfSchema>(&pool).await.unwrap();

        assert_eq!(first.len(), 3);
        assert!(second.is_empty());

        let column_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info('shelf')")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(column_count, 4);
    }

    #[tokio::test]
    async fn test_sync_skips_missing_table() {
        let pool = setup_test_db().await;
        let added = SchemaSync::sync_table::<ShelfSchema>(&pool).await.unwrap();
        assert!(added.is_empty());
        assert!(!SchemaIntrospector::table_exists(&pool, "shelf").await.unwrap());
    }
}
