//! Vendhook point-of-sale ingestion service.
//!
//! Main entry point for the vendhook server. Initializes all subsystems
//! and coordinates graceful startup and shutdown.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use vendhook_api::{
    server::{start_server, AppState},
    store::PostgresSaleStore,
    Config,
};
use vendhook_core::{storage::Storage, RealClock};

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration loads before tracing so the configured filter can seed
    // the subscriber. A rejected config aborts here, before any socket is
    // bound, with the validation error on stderr.
    let config = Config::load()?;

    init_tracing(&config.rust_log);

    info!("Starting vendhook sale ingestion service");
    info!(
        database_url = %config.database_url_masked(),
        host = %config.host,
        port = config.port,
        max_connections = config.database_max_connections,
        "Configuration loaded"
    );

    // Create database connection pool
    let db_pool = create_database_pool(&config).await?;
    info!("Database connection pool established");

    // Run database migrations
    run_migrations(&db_pool).await?;
    info!("Database migrations completed");

    let storage = Arc::new(Storage::new(db_pool.clone()));
    let store = Arc::new(PostgresSaleStore::new(storage));
    let state = AppState::new(store, Arc::new(RealClock::new()), config.webhook_secret.clone());

    let addr = config.parse_server_addr()?;
    info!(addr = %addr, "Vendhook is ready to receive sales");

    // start_server owns the shutdown signal and returns once in-flight
    // requests have drained.
    start_server(state, addr, Duration::from_secs(config.request_timeout)).await?;

    // Close database connections
    db_pool.close().await;
    info!("Database connections closed");

    info!("Vendhook shutdown complete");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
///
/// `RUST_LOG` in the environment wins over the configured default filter.
fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .or_else(|_| EnvFilter::try_new("info,vendhook=debug,tower_http=debug"))
        .expect("static log filter must parse");

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Creates the database connection pool with retry logic.
async fn create_database_pool(config: &Config) -> Result<sqlx::PgPool> {
    let mut retries = 0;
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);

    loop {
        match PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connection_timeout))
            .idle_timeout(Duration::from_secs(config.database_idle_timeout))
            .max_lifetime(Duration::from_secs(config.database_max_lifetime))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => {
                // Verify connection works
                sqlx::query("SELECT 1")
                    .fetch_one(&pool)
                    .await
                    .context("Failed to verify database connection")?;

                return Ok(pool);
            },
            Err(_e) if retries < MAX_RETRIES => {
                retries += 1;
                info!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    "Database connection failed, retrying..."
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("Failed to create database connection pool after retries");
            },
        }
    }
}

/// Runs database migrations.
async fn run_migrations(pool: &sqlx::PgPool) -> Result<()> {
    // TODO: Use sqlx::migrate! macro once a migrations directory exists

    // The UNIQUE constraint on txn is what makes ingestion idempotent.
    // Concurrent posts racing past the dedupe lookup hit the constraint,
    // and the loser reports the sale as a duplicate instead of storing a
    // second row.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sales (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            device TEXT,
            vendo TEXT NOT NULL,
            amount DOUBLE PRECISION NOT NULL,
            txn TEXT NOT NULL UNIQUE,
            ts TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create sales table")?;

    Ok(())
}
