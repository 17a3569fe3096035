//! Shared application state handed to the app-level routers.

use database::postgres::DatabaseConnection;
use domain_users::{PgTokenStore, PgUserRepository, UserService};

/// Postgres-backed user service used by every route
pub type AccountsService = UserService<PgUserRepository, PgTokenStore>;

/// Cloned per router; every field is a cheap `Arc` handle.
#[derive(Clone)]
pub struct AppState {
    /// Configuration loaded from environment variables
    pub config: crate::config::Config,
    /// PostgreSQL connection pool
    pub db: DatabaseConnection,
    pub users: AccountsService,
}

impl AppState {
    pub fn new(config: crate::config::Config, db: DatabaseConnection) -> Self {
        let users = UserService::new(
            PgUserRepository::new(db.clone()),
            PgTokenStore::new(db.clone()),
        );

        Self { config, db, users }
    }
}
