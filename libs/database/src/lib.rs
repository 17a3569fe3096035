//! PostgreSQL connectivity for the accounts service.
//!
//! # Features
//!
//! - `postgres` (default) - SeaORM connection pool, migrations and health probes
//! - `config` (default) - load [`postgres::PostgresConfig`] through `core_config::FromEnv`
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::{RetryConfig, postgres};
//! use migration::Migrator;
//!
//! let config = postgres::PostgresConfig::from_env()?;
//! let db = postgres::connect_with_retry(config, RetryConfig::new().with_max_retries(5)).await?;
//! postgres::run_migrations::<Migrator>(&db).await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult, RetryConfig, retry_with_backoff};
