use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

mod catalog;
mod files;
mod orders;
mod payments;

// ============================================================================
// PostgreSQL Store
// ============================================================================
//
// Runtime-checked queries over one shared pool. Rows are decoded into small
// `FromRow` structs and converted to domain types, so enum columns stored as
// text are validated on the way out.
//
// ============================================================================

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply embedded migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to apply database migrations")?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_i32(value: u32, field: &'static str) -> Result<i32> {
    i32::try_from(value).with_context(|| format!("{} out of range: {}", field, value))
}

fn to_u32(value: i32, field: &'static str) -> Result<u32> {
    u32::try_from(value).with_context(|| format!("{} is negative: {}", field, value))
}
