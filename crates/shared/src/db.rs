//! Database utilities and connection management

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::{str::FromStr, time::Duration};

use crate::error::SharedError;

/// Create a database connection pool
/// Note: Disables statement cache for PgBouncer compatibility
/// (Supabase's pooler runs in transaction mode and rejects prepared statements)
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, SharedError> {
    let options = PgConnectOptions::from_str(database_url)?.statement_cache_capacity(0);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(300))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), SharedError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_create_pool() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url, 2).await.expect("Failed to create pool");
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .expect("Pool should answer a trivial query");
    }

    #[tokio::test]
    async fn test_create_pool_rejects_malformed_url() {
        let result = create_pool("not a url", 1).await;
        assert!(matches!(result, Err(SharedError::Database(_))));
    }
}
