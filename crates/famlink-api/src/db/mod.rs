//! # Database Persistence Layer
//!
//! Optional PostgreSQL durability for family links via SQLx.
//!
//! When a database URL is configured, every committed link is written
//! through to the `family_links` table and the in-memory store is hydrated
//! from it at startup. Without one the service runs in-memory only and
//! state does not survive a restart.

pub mod links;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect and run the embedded migrations.
///
/// Returns `None` when `database_url` is absent (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        tracing::warn!("no database configured, running in-memory only; links will not survive restarts");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;
    tracing::info!("connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(Some(pool))
}
