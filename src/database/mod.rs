use std::sync::OnceLock;

use anyhow::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};

pub mod models;
pub mod repositories;
pub mod transaction;
pub mod utils;

static POOL: OnceLock<PgPool> = OnceLock::new();

/// Connect to the database, run migrations, and install the global pool.
/// Must be called exactly once at startup before any repository is used.
pub async fn init_database(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    log::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("Migrations completed successfully");

    POOL.set(pool.clone())
        .map_err(|_| anyhow::anyhow!("Database pool already initialized"))?;

    Ok(pool)
}

/// Global pool accessor for the module-function repositories.
///
/// Panics if `init_database` has not run; that is a startup ordering bug,
/// not a runtime condition.
pub fn pool() -> &'static PgPool {
    POOL.get().expect("database pool not initialized")
}
