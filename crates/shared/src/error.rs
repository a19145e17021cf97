//! Error types shared across Launchkit crates

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SharedError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
