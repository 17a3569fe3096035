use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use super::PostgresConfig;
use crate::common::{DatabaseError, RetryConfig, retry_with_backoff};

/// Opens a pool using the given settings.
pub async fn connect(config: PostgresConfig) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(config.into_connect_options()).await?;
    info!("Connected to PostgreSQL");
    Ok(db)
}

/// Opens a pool, retrying with backoff while the server is unreachable.
pub async fn connect_with_retry(
    config: PostgresConfig,
    retry: RetryConfig,
) -> Result<DatabaseConnection, DatabaseError> {
    let attempts = retry.max_retries + 1;

    retry_with_backoff("postgres connect", &retry, || connect(config.clone()))
        .await
        .map_err(|e| DatabaseError::ConnectionFailed {
            attempts,
            message: e.to_string(),
        })
}

/// Applies every pending migration of `M`.
pub async fn run_migrations<M: MigratorTrait>(db: &DatabaseConnection) -> Result<(), DatabaseError> {
    info!("Running database migrations");
    M::up(db, None)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
    info!("Database migrations complete");
    Ok(())
}
