//! Database connection pool, migrations, and health check.
//!
//! All SQL lives under this module. Every statement that touches a
//! tenant-scoped table binds the caller's [`Scope`](crate::tenancy::Scope)
//! as a nullable uuid and filters with
//! `($n::uuid IS NULL OR tenant_id = $n)` — the single chokepoint for
//! tenant isolation.

pub mod cases;
pub mod lock;
pub mod transfers;
pub mod workers;

use crate::error::Result;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Database handle. Owns the connection pool shared across all modules.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Connect to Postgres and create a connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| crate::error::Error::Other(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Simple health check — run a SELECT 1.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Get a reference to the connection pool (for submodules and the
    /// engine's transactions).
    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}
