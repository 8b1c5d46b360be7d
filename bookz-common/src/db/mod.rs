//! Database models and queries

pub mod books;
pub mod init;
pub mod migrations;
pub mod models;
pub mod reviews;
pub mod schema_sync;
pub mod settings;
pub mod table_schemas;
pub mod users;

pub use init::{init_database, prepare_database};
pub use migrations::{get_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};
pub use models::*;
pub use schema_sync::*;
pub use table_schemas::*;
