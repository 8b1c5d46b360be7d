//! bookz-web - personal reading log
//!
//! Startup: initialise tracing, resolve configuration, bring the database
//! schema up to date, then serve HTTP until interrupted.

use anyhow::{Context, Result};
use bookz_common::config::{BootstrapConfig, ConfigOverrides, DEFAULT_LOG_LEVEL};
use bookz_common::db::{init_database, users};
use bookz_web::logging;
use bookz_web::openlibrary::OpenLibraryClient;
use bookz_web::{build_router, AppState};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line arguments; each falls back to a BOOKZ_* variable
#[derive(Parser, Debug)]
#[command(name = "bookz-web", about = "Personal book tracking web app", version)]
struct Args {
    /// Path to config.toml
    #[arg(long, env = "BOOKZ_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the database file
    #[arg(long, env = "BOOKZ_DATA_FOLDER")]
    data_folder: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:5730
    #[arg(long, env = "BOOKZ_BIND")]
    bind: Option<String>,

    /// trace, debug, info, warn or error
    #[arg(long, env = "BOOKZ_LOG")]
    log_level: Option<String>,

    /// Open Library base URL
    #[arg(long, env = "BOOKZ_OPENLIBRARY_URL")]
    openlibrary_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_levels = logging::init_tracing(args.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL));

    // Log build identification immediately after tracing init
    info!(
        "Starting bookz-web v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = BootstrapConfig::resolve(ConfigOverrides {
        config_file: args.config,
        data_folder: args.data_folder,
        bind: args.bind,
        log_level: args.log_level,
        openlibrary_url: args.openlibrary_url,
    });
    log_levels.apply_configured(&config.log_level);

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e).context("database initialization");
        }
    };

    users::purge_expired_sessions(&pool).await?;

    let lookup = OpenLibraryClient::new(&config.openlibrary_url).context("creating HTTP client")?;
    info!("ISBN lookups via {}", lookup.base_url());

    let state = AppState::new(pool, lookup, config.covers_url.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!("bookz-web listening on http://{}", config.bind);
    info!("Health check: http://{}/health", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("bookz-web stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
